//! Fan-out of device push notifications to registered listeners

use dashmap::DashMap;
use moebot_core::DeviceUpdate;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// A unique identifier for an update listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A registered listener's end of the bus
///
/// `recv` returns `None` once the listener has been unsubscribed or the bus
/// dropped.
#[derive(Debug)]
pub struct Subscription {
    id: ListenerId,
    rx: mpsc::UnboundedReceiver<DeviceUpdate>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Wait for the next update
    pub async fn recv(&mut self) -> Option<DeviceUpdate> {
        self.rx.recv().await
    }

    /// Take an update if one is already queued
    pub fn try_recv(&mut self) -> Option<DeviceUpdate> {
        self.rx.try_recv().ok()
    }
}

/// Delivers every published update to every subscribed listener, in order
///
/// Each listener has its own unbounded queue so a slow listener never causes
/// another to miss updates.
pub struct UpdateBus {
    listeners: DashMap<ListenerId, mpsc::UnboundedSender<DeviceUpdate>>,
    next_listener_id: AtomicU64,
}

impl UpdateBus {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Register a listener
    pub fn subscribe(&self) -> Subscription {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.insert(id, tx);
        trace!(listener = id.0, "Listener subscribed");
        Subscription { id, rx }
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let removed = self.listeners.remove(&id).is_some();
        trace!(listener = id.0, removed, "Listener unsubscribed");
        removed
    }

    /// Deliver an update to all listeners
    ///
    /// Listeners whose receiving end has been dropped are pruned.
    pub fn publish(&self, update: DeviceUpdate) {
        debug!(
            device_id = %update.device_id,
            state = %update.status.state,
            listeners = self.listeners.len(),
            "Publishing device update"
        );
        self.listeners
            .retain(|_, tx| tx.send(update.clone()).is_ok());
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for UpdateBus {
    fn default() -> Self {
        Self::new()
    }
}
