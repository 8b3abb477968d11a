//! Game state and main loop.

use crate::config::Config;
use crate::visibility;
use crate::world::{TickReport, World};
use protocol::{ClientCommand, ServerEvent};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Utf8Bytes;
use tracing::{debug, info, warn};

use super::client::{ConnectionId, Mailboxes, Transport};

/// Messages from connection tasks to the game loop.
#[derive(Debug)]
pub enum Inbound {
    /// A socket finished its handshake. Frames for it go to `mailbox`.
    Connected {
        id: ConnectionId,
        mailbox: mpsc::Sender<Utf8Bytes>,
    },
    /// A decoded command.
    Command { id: ConnectionId, command: ClientCommand },
    /// The socket is gone. May arrive after the game already closed it.
    Closed { id: ConnectionId },
}

/// Everything the game loop owns.
pub struct GameState<T: Transport> {
    pub world: World,
    pub transport: T,
    /// Connections that joined, in join order. Broadcasts go here.
    pub(crate) registered: Vec<ConnectionId>,
}

impl<T: Transport> GameState<T> {
    pub fn new(config: Config, transport: T) -> Self {
        Self {
            world: World::new(config),
            transport,
            registered: Vec::new(),
        }
    }

    pub fn registered(&self) -> &[ConnectionId] {
        &self.registered
    }

    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.registered.contains(&id)
    }

    pub(crate) fn register(&mut self, id: ConnectionId) {
        if !self.is_registered(id) {
            self.registered.push(id);
        }
    }

    fn unregister(&mut self, id: ConnectionId) -> bool {
        let before = self.registered.len();
        self.registered.retain(|&other| other != id);
        self.registered.len() != before
    }

    /// Send an event to every joined connection.
    pub fn broadcast(&mut self, event: &ServerEvent) {
        self.transport.push_many(&self.registered, event);
    }

    /// Drop a connection and its player. Safe to call more than once.
    pub fn disconnect(&mut self, id: ConnectionId) {
        let player = self.world.remove_player(id);
        let was_registered = self.unregister(id);
        self.transport.close(id);
        if was_registered {
            let name = player.map(|p| p.name).unwrap_or_default();
            info!("Client {} ({}) left", id, name);
            self.broadcast(&ServerEvent::PeerDisconnected { id, name });
        }
    }

    /// Run one simulation step and announce who left the arena.
    pub fn tick(&mut self, now: std::time::Instant) {
        let report = self.world.tick(now);
        self.apply_report(report);
    }

    pub fn apply_report(&mut self, report: TickReport) {
        for elimination in report.eliminated {
            info!("Player {} ({}) eliminated: {}", elimination.id, elimination.name, elimination.message);
            self.broadcast(&ServerEvent::Eliminated(elimination));
        }

        for kicked in report.timed_out {
            self.transport.push(
                kicked.id,
                &ServerEvent::ForcedDisconnect {
                    reason: kicked.message,
                },
            );
            self.unregister(kicked.id);
            self.transport.close(kicked.id);
            self.broadcast(&ServerEvent::PeerDisconnected {
                id: kicked.id,
                name: kicked.name,
            });
        }
    }

    /// Send every joined player the part of the world it can see.
    pub fn push_updates(&mut self) {
        for player in self.world.players() {
            if !self.registered.contains(&player.id) {
                continue;
            }
            let snapshot = visibility::snapshot(&self.world, player);
            self.transport.push(player.id, &ServerEvent::MoveUpdate(snapshot));
        }
    }
}

impl GameState<Mailboxes> {
    pub fn handle_inbound(&mut self, inbound: Inbound, now: std::time::Instant) {
        match inbound {
            Inbound::Connected { id, mailbox } => {
                debug!("Client {} connected", id);
                self.transport.register(id, mailbox);
            }
            Inbound::Command { id, command } => self.dispatch(id, command, now),
            Inbound::Closed { id } => self.disconnect(id),
        }
    }

    /// Apply everything queued since the last tick. Returns `false` once
    /// every sender is gone.
    fn drain_inbound(&mut self, inbound: &mut mpsc::Receiver<Inbound>) -> bool {
        let now = std::time::Instant::now();
        loop {
            match inbound.try_recv() {
                Ok(message) => self.handle_inbound(message, now),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }
}

/// Drive the simulation until the inbound channel closes.
pub async fn run_game_loop(mut state: GameState<Mailboxes>, mut inbound: mpsc::Receiver<Inbound>) {
    let server = state.world.config().server.clone();
    let tick_interval = server.tick_interval();
    let update_interval = server.update_interval();

    let mut ticker = interval_at(Instant::now() + tick_interval, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut updates = interval_at(Instant::now() + update_interval, update_interval);
    updates.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Initial world spawn...");
    state.world.balance_mass();
    let counts = state.world.counts();
    info!(
        "World initialized: {} pellets, total mass {:.0}",
        counts.pellets,
        state.world.total_mass()
    );

    let budget = tick_interval.mul_f64(0.9);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !state.drain_inbound(&mut inbound) {
                    info!("Inbound channel closed, stopping game loop");
                    break;
                }
                let tick_start = std::time::Instant::now();
                state.tick(tick_start);
                let elapsed = tick_start.elapsed();
                if elapsed > budget {
                    let counts = state.world.counts();
                    warn!(
                        "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} pellets, {} projectiles",
                        state.world.tick_count(),
                        elapsed.as_secs_f64() * 1000.0,
                        budget.as_secs_f64() * 1000.0,
                        counts.players,
                        counts.pellets,
                        counts.projectiles
                    );
                }
            }
            _ = updates.tick() => {
                state.push_updates();
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    /// Transport that keeps every event for inspection.
    #[derive(Debug, Default)]
    pub struct Recorder {
        pub sent: Vec<(ConnectionId, ServerEvent)>,
        pub closed: Vec<ConnectionId>,
    }

    impl Recorder {
        pub fn to(&self, id: ConnectionId) -> Vec<&ServerEvent> {
            self.sent.iter().filter(|(to, _)| *to == id).map(|(_, e)| e).collect()
        }

        pub fn kinds(&self, id: ConnectionId) -> Vec<&'static str> {
            self.to(id).into_iter().map(|e| e.kind()).collect()
        }

        pub fn clear(&mut self) {
            self.sent.clear();
            self.closed.clear();
        }
    }

    impl Transport for Recorder {
        fn push(&mut self, id: ConnectionId, event: &ServerEvent) {
            self.sent.push((id, event.clone()));
        }

        fn close(&mut self, id: ConnectionId) {
            self.closed.push(id);
        }
    }
}
