//! avbridge AVR - receiver wire protocol and control connection.
//!
//! The receiver speaks a plaintext, carriage-return-terminated command
//! protocol over TCP. This crate provides the codec for that protocol
//! and [`AvrLink`], a handle to a connection task that reconnects on
//! its own and never blocks its callers.

pub mod error;
pub mod link;
pub mod protocol;

pub use error::{LinkError, LinkResult};
pub use link::{AvrLink, LinkEvent};
pub use protocol::{AvrCodec, AvrEvent};
