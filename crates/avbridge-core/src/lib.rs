//! avbridge Core - Receiver/playback state model and reconciliation.
//!
//! This crate contains the domain types and the decision logic shared
//! between the daemon and the transport crates. It performs no I/O:
//! the [`engine::Engine`] consumes inputs and returns effects for the
//! caller to carry out.

pub mod command;
pub mod config;
pub mod engine;
pub mod state;

pub use command::AvrCommand;
pub use config::{ActionConfig, ConnectionConfig};
pub use engine::{Effect, Engine, Input};
pub use state::{PlaybackStatus, Power, ReceiverState};
