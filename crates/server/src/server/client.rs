//! Outbound delivery to connected clients.
//!
//! Every connection owns a bounded mailbox drained by its writer task. The
//! game loop never waits on a socket: a full mailbox drops the new frame.

use protocol::{PlayerId, ServerEvent};
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_tungstenite::tungstenite::Utf8Bytes;
use tracing::{debug, warn};

/// Connection identifier. A joined connection controls the player with the same id.
pub type ConnectionId = PlayerId;

/// Push side of the transport as seen by the game loop.
pub trait Transport {
    /// Queue an event for one connection.
    fn push(&mut self, id: ConnectionId, event: &ServerEvent);

    /// Queue the same event for several connections.
    fn push_many(&mut self, ids: &[ConnectionId], event: &ServerEvent) {
        for &id in ids {
            self.push(id, event);
        }
    }

    /// Stop delivering to a connection. Frames already queued are still flushed.
    fn close(&mut self, id: ConnectionId);
}

/// Bounded per-connection mailboxes backed by tokio mpsc channels.
#[derive(Debug, Default)]
pub struct Mailboxes {
    senders: HashMap<ConnectionId, mpsc::Sender<Utf8Bytes>>,
    dropped: u64,
}

impl Mailboxes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ConnectionId, sender: mpsc::Sender<Utf8Bytes>) {
        self.senders.insert(id, sender);
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.senders.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Frames dropped because a mailbox was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn deliver(&mut self, id: ConnectionId, frame: Utf8Bytes) {
        let Some(sender) = self.senders.get(&id) else {
            return;
        };
        match sender.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                debug!("Mailbox of client {} is full, dropping frame", id);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Mailbox of client {} is closed", id);
                self.senders.remove(&id);
            }
        }
    }

    fn encode(event: &ServerEvent) -> Option<Utf8Bytes> {
        match event.encode() {
            Ok(text) => Some(Utf8Bytes::from(text)),
            Err(e) => {
                warn!("Failed to encode {}: {}", event.kind(), e);
                None
            }
        }
    }
}

impl Transport for Mailboxes {
    fn push(&mut self, id: ConnectionId, event: &ServerEvent) {
        if !self.contains(id) {
            return;
        }
        if let Some(frame) = Self::encode(event) {
            self.deliver(id, frame);
        }
    }

    fn push_many(&mut self, ids: &[ConnectionId], event: &ServerEvent) {
        if ids.is_empty() {
            return;
        }
        let Some(frame) = Self::encode(event) else {
            return;
        };
        for &id in ids {
            self.deliver(id, frame.clone());
        }
    }

    fn close(&mut self, id: ConnectionId) {
        self.senders.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_mailbox_drops_new_frames() {
        let (tx, mut rx) = mpsc::channel(2);
        let mut mailboxes = Mailboxes::new();
        mailboxes.register(1, tx);

        for name in ["a", "b", "c"] {
            mailboxes.push(1, &ServerEvent::JoinBroadcast { name: name.into() });
        }
        assert_eq!(mailboxes.dropped(), 1);

        let first = ServerEvent::decode(rx.try_recv().unwrap().as_str()).unwrap();
        let second = ServerEvent::decode(rx.try_recv().unwrap().as_str()).unwrap();
        assert_eq!(first, ServerEvent::JoinBroadcast { name: "a".into() });
        assert_eq!(second, ServerEvent::JoinBroadcast { name: "b".into() });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_push_many_and_close() {
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        let mut mailboxes = Mailboxes::new();
        mailboxes.register(1, tx1);
        mailboxes.register(2, tx2);

        mailboxes.push_many(&[1, 2, 3], &ServerEvent::HeartbeatPong {});
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());

        mailboxes.close(1);
        assert!(!mailboxes.contains(1));
        // The writer sees the channel end once the sender is gone.
        assert!(matches!(rx1.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));
    }

    #[test]
    fn test_gone_receiver_unregisters() {
        let (tx, rx) = mpsc::channel(4);
        let mut mailboxes = Mailboxes::new();
        mailboxes.register(7, tx);
        drop(rx);
        mailboxes.push(7, &ServerEvent::RespawnAck {});
        assert!(mailboxes.is_empty());
    }
}
