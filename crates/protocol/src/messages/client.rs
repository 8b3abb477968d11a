//! Client -> Server command decoding.

use crate::{Envelope, ProtocolError};
use serde::Deserialize;

/// Payload of the `join` command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub name: String,
    #[serde(default)]
    pub screen_width: f32,
    #[serde(default)]
    pub screen_height: f32,
}

/// Payload of the `viewport-resize` command.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportPayload {
    pub screen_width: f32,
    pub screen_height: f32,
}

/// Payload of the `move-target` command, an offset from the player center.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TargetPayload {
    pub x: f32,
    pub y: f32,
}

/// Parsed client command.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// Handshake complete, enter the arena (`join`, legacy `gotit`).
    Join(JoinPayload),
    /// Heartbeat (`heartbeat-ping`, legacy `pingcheck`).
    HeartbeatPing,
    /// Screen size changed (`viewport-resize`, legacy `windowResized`).
    ViewportResize(ViewportPayload),
    /// Drop the current body and wait for a new join (`respawn`).
    Respawn,
    /// Leave the game (`disconnect`).
    Disconnect,
    /// Mouse target update (`move-target`, legacy `0`).
    MoveTarget(TargetPayload),
    /// Shoot (`fire`, legacy `2`).
    Fire,
    /// Trade mass for a speed burst (`sprint`).
    Sprint,
    /// Split the primary cell (`split`), only honored when merging is enabled.
    Split,
    /// Anything else. Ignored by the server.
    Unknown(String),
}

impl ClientCommand {
    /// Parse a command from a text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Self::from_envelope(&Envelope::decode(text)?)
    }

    /// Interpret an envelope, validating the payload of known commands.
    pub fn from_envelope(env: &Envelope) -> Result<Self, ProtocolError> {
        let command = match env.kind.as_str() {
            "join" | "gotit" => {
                let join: JoinPayload = env.payload()?;
                if !join.screen_width.is_finite() || !join.screen_height.is_finite() {
                    return Err(ProtocolError::InvalidPayload {
                        kind: "join",
                        reason: "screen size must be finite",
                    });
                }
                ClientCommand::Join(join)
            }
            "heartbeat-ping" | "pingcheck" => ClientCommand::HeartbeatPing,
            "viewport-resize" | "windowResized" => {
                let viewport: ViewportPayload = env.payload()?;
                if !(viewport.screen_width.is_finite()
                    && viewport.screen_height.is_finite()
                    && viewport.screen_width > 0.0
                    && viewport.screen_height > 0.0)
                {
                    return Err(ProtocolError::InvalidPayload {
                        kind: "viewport-resize",
                        reason: "screen size must be positive",
                    });
                }
                ClientCommand::ViewportResize(viewport)
            }
            "respawn" => ClientCommand::Respawn,
            "disconnect" => ClientCommand::Disconnect,
            "move-target" | "0" => {
                let target: TargetPayload = env.payload()?;
                if !target.x.is_finite() || !target.y.is_finite() {
                    return Err(ProtocolError::InvalidPayload {
                        kind: "move-target",
                        reason: "coordinates must be finite",
                    });
                }
                ClientCommand::MoveTarget(target)
            }
            "fire" | "2" => ClientCommand::Fire,
            "sprint" => ClientCommand::Sprint,
            "split" => ClientCommand::Split,
            other => ClientCommand::Unknown(other.to_string()),
        };
        Ok(command)
    }
}
