//! Outbound receiver commands.
//!
//! The control vocabulary is fixed and small; the wire rendering lives
//! in the transport crate's codec.

/// A command for the receiver's main zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvrCommand {
    /// Switch the main zone on
    PowerOn,
    /// Put the main zone into standby
    PowerOff,
    /// Set the master volume (device-native scale)
    SetVolume(u8),
    /// Select an input source by its symbolic name (e.g. "CD")
    SetInput(String),
    /// Ask the device to report its current volume
    QueryVolume,
}
