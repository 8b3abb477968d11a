//! Shared protocol crate for the arena server.
//!
//! This crate contains:
//! - The `{type, data}` JSON envelope
//! - Inbound command decoding (with legacy type aliases)
//! - Outbound events and world snapshot DTOs

mod envelope;
mod error;
pub mod messages;

pub use envelope::Envelope;
pub use error::ProtocolError;
pub use messages::{ClientCommand, ServerEvent};

/// Identifier of a connection; also the id of the player it controls.
pub type PlayerId = u32;

/// Player body shape, fixed at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Circle,
    Square,
}
