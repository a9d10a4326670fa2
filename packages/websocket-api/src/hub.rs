use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use shared::models::events::DuelEvent;
use shared::services::notifier::DuelNotifier;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Live sockets and the duel channels they are subscribed to.
///
/// Each socket task owns the receiving half of its channel and writes events
/// to the wire; everything else only ever pushes into the sender.
#[derive(Default)]
pub struct ConnectionHub {
    next_id: AtomicU64,
    connections: RwLock<HashMap<String, UnboundedSender<DuelEvent>>>,
    channels: RwLock<HashMap<String, HashSet<String>>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an id for a new socket and returns the receiver its task drains.
    pub fn register(&self) -> (String, UnboundedReceiver<DuelEvent>) {
        let sequence = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let connection_id = format!("conn-{}", sequence);
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection_id.clone(), tx);
        (connection_id, rx)
    }

    pub fn unregister(&self, connection_id: &str) {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(connection_id);

        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        for members in channels.values_mut() {
            members.remove(connection_id);
        }
        channels.retain(|_, members| !members.is_empty());
    }

    pub fn connection_count(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn channel_members(&self, channel: &str) -> Vec<String> {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        let mut members: Vec<String> = channels
            .get(channel)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }
}

impl DuelNotifier for ConnectionHub {
    fn send(&self, connection_id: &str, event: &DuelEvent) {
        let connections = self
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match connections.get(connection_id) {
            Some(tx) => {
                if tx.send(event.clone()).is_err() {
                    debug!(
                        "Connection {} closed before {} was delivered",
                        connection_id,
                        event.name()
                    );
                }
            }
            None => debug!(
                "Dropping {} for unknown connection {}",
                event.name(),
                connection_id
            ),
        }
    }

    fn join_channel(&self, channel: &str, connection_id: &str) {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(channel.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    fn broadcast(&self, channel: &str, event: &DuelEvent) {
        for connection_id in self.channel_members(channel) {
            self.send(&connection_id, event);
        }
    }

    fn close_channel(&self, channel: &str) {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(channel);
    }
}
