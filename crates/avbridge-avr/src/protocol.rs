//! Receiver wire protocol codec.
//!
//! Commands go out as short ASCII tokens terminated by a carriage
//! return. Inbound lines are classified rather than fully parsed: the
//! bridge only cares about master-volume reports and ignores the rest
//! of the device's chatter.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use avbridge_core::AvrCommand;

use crate::error::LinkError;

/// A classified line from the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvrEvent {
    /// Master volume report, 0-99.
    VolumeReport(u8),
    /// A volume-report line whose payload did not parse.
    MalformedVolumeReport(String),
    /// Anything else the device sent.
    Unrecognized(String),
}

/// Codec for the receiver's line protocol.
#[derive(Debug, Default)]
pub struct AvrCodec;

impl Encoder<AvrCommand> for AvrCodec {
    type Error = LinkError;

    fn encode(&mut self, cmd: AvrCommand, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let token = wire_token(&cmd);
        dst.reserve(token.len() + 1);
        dst.put_slice(token.as_bytes());
        dst.put_u8(b'\r');
        Ok(())
    }
}

impl Decoder for AvrCodec {
    type Item = AvrEvent;
    type Error = LinkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(pos) = src.iter().position(|b| *b == b'\r' || *b == b'\n') {
            let raw = src.split_to(pos);
            src.advance(1);
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            return Ok(Some(classify(line)));
        }
        Ok(None)
    }
}

/// Render a command as its wire token, without the terminator.
fn wire_token(cmd: &AvrCommand) -> String {
    match cmd {
        AvrCommand::PowerOn => "ZMON".to_string(),
        AvrCommand::PowerOff => "ZMOFF".to_string(),
        AvrCommand::SetVolume(vol) => format!("MV{vol:02}"),
        AvrCommand::SetInput(input) => format!("SI{input}"),
        AvrCommand::QueryVolume => "MV?".to_string(),
    }
}

/// Classify one trimmed inbound line.
///
/// Volume reports carry the level as exactly two ASCII digits after
/// the `MV` prefix; a third digit marks a half-step report and is
/// deliberately not read. `MVMAX` shares the prefix but is a ceiling
/// report, not a volume report.
fn classify(line: &str) -> AvrEvent {
    if let Some(rest) = line.strip_prefix("MV") {
        if line.starts_with("MVMAX") {
            return AvrEvent::Unrecognized(line.to_string());
        }
        let digits: String = rest.chars().take(2).collect();
        return match digits.parse::<u8>() {
            Ok(vol) => AvrEvent::VolumeReport(vol),
            Err(_) => AvrEvent::MalformedVolumeReport(line.to_string()),
        };
    }
    AvrEvent::Unrecognized(line.to_string())
}
