//! Server -> Client events and snapshot DTOs.

use crate::{PlayerId, ProtocolError, Shape};
use serde::{Deserialize, Serialize};

/// One cell of a visible player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellView {
    pub x: f32,
    pub y: f32,
    pub mass: f32,
    pub radius: f32,
}

/// A player as seen by another player.
///
/// `id` is `None` on the viewer's own copy so the client can tell itself
/// apart from everyone else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PlayerId>,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub cells: Vec<CellView>,
    pub mass_total: f32,
    pub mass_current: f32,
    pub hue: u16,
    pub shape: Shape,
    pub eye_angle: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PelletView {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub mass: f32,
    pub hue: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileView {
    pub id: u32,
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub speed: f32,
}

/// Everything a single player can currently see.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub players: Vec<PlayerView>,
    pub visible_pellets: Vec<PelletView>,
    pub visible_projectiles: Vec<ProjectileView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaDimensions {
    pub game_width: f32,
    pub game_height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Elimination {
    pub id: PlayerId,
    pub name: String,
    pub message: String,
}

/// Outbound events. Serialized as `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Per-player world snapshot.
    MoveUpdate(Snapshot),
    /// Someone entered the arena.
    JoinBroadcast { name: String },
    /// Reply to a successful join.
    ArenaSetup(ArenaDimensions),
    /// The server is closing this connection.
    ForcedDisconnect { reason: String },
    /// A player died.
    Eliminated(Elimination),
    HeartbeatPong {},
    RespawnAck {},
    /// Someone left the arena.
    PeerDisconnected { id: PlayerId, name: String },
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::MoveUpdate(_) => "move-update",
            ServerEvent::JoinBroadcast { .. } => "join-broadcast",
            ServerEvent::ArenaSetup(_) => "arena-setup",
            ServerEvent::ForcedDisconnect { .. } => "forced-disconnect",
            ServerEvent::Eliminated(_) => "eliminated",
            ServerEvent::HeartbeatPong {} => "heartbeat-pong",
            ServerEvent::RespawnAck {} => "respawn-ack",
            ServerEvent::PeerDisconnected { .. } => "peer-disconnected",
        }
    }

    /// Encode into a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|source| ProtocolError::Encode {
            kind: self.kind(),
            source,
        })
    }

    /// Decode a text frame produced by [`ServerEvent::encode`].
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}
