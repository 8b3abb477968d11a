//! Client command handling.

use crate::server::{ConnectionId, GameState, Transport};
use glam::Vec2;
use protocol::messages::{ArenaDimensions, JoinPayload};
use protocol::{ClientCommand, ServerEvent};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a nickname was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,
    #[error("name is longer than {max} characters")]
    TooLong { max: usize },
    #[error("name contains {0:?}")]
    InvalidChar(char),
}

/// Check a nickname and return it trimmed.
pub fn validate_name(raw: &str, max_len: usize) -> Result<String, NameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.chars().count() > max_len {
        return Err(NameError::TooLong { max: max_len });
    }
    if let Some(c) = name
        .chars()
        .find(|&c| !(c.is_alphanumeric() || c == '_' || c == '-' || c == ' '))
    {
        return Err(NameError::InvalidChar(c));
    }
    Ok(name.to_string())
}

impl<T: Transport> GameState<T> {
    /// Apply one client command.
    pub fn dispatch(&mut self, id: ConnectionId, command: ClientCommand, now: Instant) {
        match command {
            ClientCommand::Join(join) => self.join(id, join, now),
            ClientCommand::HeartbeatPing => {
                if let Some(player) = self.world.player_mut(id) {
                    player.last_heartbeat = now;
                }
                self.transport.push(id, &ServerEvent::HeartbeatPong {});
            }
            ClientCommand::ViewportResize(viewport) => {
                if let Some(player) = self.world.player_mut(id) {
                    player.resize(viewport.screen_width, viewport.screen_height);
                }
            }
            ClientCommand::Respawn => {
                self.world.remove_player(id);
                self.transport.push(id, &ServerEvent::RespawnAck {});
            }
            ClientCommand::Disconnect => self.disconnect(id),
            ClientCommand::MoveTarget(target) => {
                if let Some(player) = self.world.player_mut(id) {
                    player.last_heartbeat = now;
                    player.target = Vec2::new(target.x, target.y);
                }
            }
            ClientCommand::Fire => {
                self.world.fire(id, now);
            }
            ClientCommand::Sprint => {
                self.world.sprint(id, now);
            }
            ClientCommand::Split => {
                self.world.split(id, now);
            }
            ClientCommand::Unknown(kind) => {
                debug!("Ignoring unknown command {:?} from client {}", kind, id);
            }
        }
    }

    fn join(&mut self, id: ConnectionId, join: JoinPayload, now: Instant) {
        if self.world.player(id).is_some() {
            warn!("Client {} sent join while already playing", id);
            return;
        }

        let name = match validate_name(&join.name, self.world.config().player.max_nick_length) {
            Ok(name) => name,
            Err(e) => {
                warn!("Rejecting client {}: {}", id, e);
                self.transport.push(
                    id,
                    &ServerEvent::ForcedDisconnect {
                        reason: "Invalid name".to_string(),
                    },
                );
                self.disconnect(id);
                return;
            }
        };

        if self.world.spawn_player(id, name.clone(), now).is_none() {
            return;
        }
        if join.screen_width > 0.0 && join.screen_height > 0.0 {
            if let Some(player) = self.world.player_mut(id) {
                player.resize(join.screen_width, join.screen_height);
            }
        }

        self.register(id);
        info!("Client {} joined as {}", id, name);
        self.broadcast(&ServerEvent::JoinBroadcast { name });

        let arena = self.world.config().arena;
        self.transport.push(
            id,
            &ServerEvent::ArenaSetup(ArenaDimensions {
                game_width: arena.width,
                game_height: arena.height,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::game::recording::Recorder;
    use protocol::messages::{TargetPayload, ViewportPayload};

    fn state() -> GameState<Recorder> {
        let mut config = Config::default();
        config.food.mass = 1e9;
        GameState::new(config, Recorder::default())
    }

    fn join_cmd(name: &str) -> ClientCommand {
        ClientCommand::Join(JoinPayload {
            name: name.into(),
            screen_width: 1280.0,
            screen_height: 720.0,
        })
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  bob_1 ", 25), Ok("bob_1".to_string()));
        assert_eq!(validate_name("the - one", 25), Ok("the - one".to_string()));
        assert_eq!(validate_name("   ", 25), Err(NameError::Empty));
        assert_eq!(validate_name("abcdef", 5), Err(NameError::TooLong { max: 5 }));
        assert_eq!(validate_name("<script>", 25), Err(NameError::InvalidChar('<')));
    }

    #[test]
    fn test_join_broadcasts_and_replies() {
        let mut state = state();
        let now = Instant::now();
        state.dispatch(1, join_cmd("alice"), now);
        state.dispatch(2, join_cmd("bob"), now);

        assert_eq!(
            state.transport.kinds(1),
            vec!["join-broadcast", "arena-setup", "join-broadcast"]
        );
        assert_eq!(state.transport.kinds(2), vec!["join-broadcast", "arena-setup"]);
        let player = state.world.player(2).unwrap();
        assert_eq!(player.screen_width, 1280.0);
        assert_eq!(state.registered(), &[1, 2]);
    }

    #[test]
    fn test_invalid_name_is_kicked() {
        let mut state = state();
        state.dispatch(1, join_cmd(""), Instant::now());

        assert_eq!(
            state.transport.to(1),
            vec![&ServerEvent::ForcedDisconnect {
                reason: "Invalid name".into()
            }]
        );
        assert_eq!(state.transport.closed, vec![1]);
        assert!(state.world.player(1).is_none());
        assert!(!state.is_registered(1));
    }

    #[test]
    fn test_double_join_is_ignored() {
        let mut state = state();
        let now = Instant::now();
        state.dispatch(1, join_cmd("alice"), now);
        state.transport.clear();
        state.dispatch(1, join_cmd("alice"), now);
        assert!(state.transport.sent.is_empty());
        assert_eq!(state.world.counts().players, 1);
    }

    #[test]
    fn test_heartbeat_and_target() {
        let mut state = state();
        let start = Instant::now();
        state.dispatch(1, join_cmd("alice"), start);
        state.transport.clear();

        let later = start + std::time::Duration::from_millis(300);
        state.dispatch(1, ClientCommand::HeartbeatPing, later);
        assert_eq!(state.transport.kinds(1), vec!["heartbeat-pong"]);
        assert_eq!(state.world.player(1).unwrap().last_heartbeat, later);

        let latest = later + std::time::Duration::from_millis(300);
        state.dispatch(1, ClientCommand::MoveTarget(TargetPayload { x: 30.0, y: -4.0 }), latest);
        let player = state.world.player(1).unwrap();
        assert_eq!(player.target, Vec2::new(30.0, -4.0));
        assert_eq!(player.last_heartbeat, latest);

        let last = latest + std::time::Duration::from_millis(300);
        state.dispatch(1, ClientCommand::MoveTarget(TargetPayload { x: 30.0, y: -4.0 }), last);
        let player = state.world.player(1).unwrap();
        assert_eq!(player.target, Vec2::new(30.0, -4.0));
        assert_eq!(player.last_heartbeat, last);
    }

    #[test]
    fn test_resize_respawn_and_rejoin() {
        let mut state = state();
        let now = Instant::now();
        state.dispatch(1, join_cmd("alice"), now);
        state.dispatch(
            1,
            ClientCommand::ViewportResize(ViewportPayload {
                screen_width: 640.0,
                screen_height: 480.0,
            }),
            now,
        );
        assert_eq!(state.world.player(1).unwrap().screen_height, 480.0);

        state.transport.clear();
        state.dispatch(1, ClientCommand::Respawn, now);
        assert_eq!(state.transport.kinds(1), vec!["respawn-ack"]);
        assert!(state.world.player(1).is_none());
        assert!(state.is_registered(1));

        state.dispatch(1, join_cmd("alice"), now);
        assert!(state.world.player(1).is_some());
    }

    #[test]
    fn test_disconnect_notifies_peers() {
        let mut state = state();
        let now = Instant::now();
        state.dispatch(1, join_cmd("alice"), now);
        state.dispatch(2, join_cmd("bob"), now);
        state.transport.clear();

        state.dispatch(2, ClientCommand::Disconnect, now);
        assert_eq!(
            state.transport.to(1),
            vec![&ServerEvent::PeerDisconnected { id: 2, name: "bob".into() }]
        );
        assert_eq!(state.transport.closed, vec![2]);
        assert!(state.world.player(2).is_none());
    }

    #[test]
    fn test_commands_before_join_are_harmless() {
        let mut state = state();
        let now = Instant::now();
        state.dispatch(5, ClientCommand::Fire, now);
        state.dispatch(5, ClientCommand::Sprint, now);
        state.dispatch(5, ClientCommand::Split, now);
        state.dispatch(5, ClientCommand::MoveTarget(TargetPayload { x: 1.0, y: 1.0 }), now);
        state.dispatch(5, ClientCommand::Unknown("dance".into()), now);
        assert!(state.transport.sent.is_empty());
        assert_eq!(state.world.counts().projectiles, 0);
    }

    #[test]
    fn test_fire_launches_projectile() {
        let mut state = state();
        let now = Instant::now();
        state.dispatch(1, join_cmd("alice"), now);
        state.dispatch(1, ClientCommand::Fire, now);
        assert!(state.world.counts().projectiles > 0);
    }
}
