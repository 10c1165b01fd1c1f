//! Player bus client implementation.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, warn};

use crate::error::BusResult;
use crate::events::BusEvent;
use crate::messages::{BusRequest, ToastKind};

/// Client for the music-player service bus.
pub struct PlayerBus {
    writer: Arc<Mutex<tokio::net::tcp::OwnedWriteHalf>>,
}

impl PlayerBus {
    /// Connect to the player service at `host:port`.
    ///
    /// Returns the client and the stream of inbound events. When the
    /// event stream ends, the connection is gone and the client should
    /// be dropped and re-created.
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn connect(addr: &str) -> BusResult<(Self, mpsc::Receiver<BusEvent>)> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        let (event_tx, event_rx) = mpsc::channel(64);

        // Spawn reader task
        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!("Player bus connection closed");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<BusEvent>(trimmed) {
                            Ok(event) => {
                                if event_tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!(error = %e, "Unknown player bus message"),
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Player bus read error");
                        break;
                    }
                }
            }
        });

        Ok((Self { writer: Arc::new(Mutex::new(writer)) }, event_rx))
    }

    /// Push a volume into the player's UI.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn set_volume(&self, volume: u8) -> BusResult<()> {
        self.send(&BusRequest::SetVolume { volume }).await
    }

    /// Show a transient notice to the user.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn push_toast(&self, kind: ToastKind, message: &str) -> BusResult<()> {
        self.send(&BusRequest::PushToast { kind, message: message.to_string() }).await
    }

    async fn send(&self, request: &BusRequest) -> BusResult<()> {
        let json = serde_json::to_string(request)? + "\n";
        let mut writer = self.writer.lock().await;
        writer.write_all(json.as_bytes()).await?;
        Ok(())
    }
}
