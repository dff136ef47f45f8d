//! Shared state
//!
//! Event fan-out shared by the channel manager, the voice scheduler and
//! whatever is listening (the CLI prints events as JSON lines).

use tokio::sync::broadcast;
use voxmix_common::events::VoxEvent;

/// Buffered events per subscriber before the slowest one starts lagging
pub const EVENT_CAPACITY: usize = 100;

/// Shared state accessible by all components
pub struct SharedState {
    /// Event broadcaster
    pub event_tx: broadcast::Sender<VoxEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { event_tx }
    }

    /// Broadcast an event to all listeners
    pub fn broadcast_event(&self, event: VoxEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<VoxEvent> {
        self.event_tx.subscribe()
    }

    /// Sender handle for components that emit events themselves
    pub fn event_sender(&self) -> broadcast::Sender<VoxEvent> {
        self.event_tx.clone()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
