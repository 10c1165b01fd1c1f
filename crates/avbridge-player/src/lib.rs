//! avbridge Player - music-player service bus client.
//!
//! The player service pushes playback-state notifications over a
//! JSON-lines socket and accepts volume updates and user notices in
//! the other direction. This crate is pure plumbing: it parses the
//! inbound stream into typed events and serializes outbound requests.

pub mod client;
pub mod error;
pub mod events;
pub mod messages;

pub use client::PlayerBus;
pub use error::{BusError, BusResult};
pub use events::{BusEvent, PlaybackNotice};
pub use messages::{BusRequest, ToastKind};
