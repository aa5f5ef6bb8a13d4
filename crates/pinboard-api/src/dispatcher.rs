use tokio::sync::broadcast;

use pinboard_types::events::StoreEvent;

/// Fans store change events out to every subscribed view.
#[derive(Clone)]
pub struct Dispatcher {
    tx: broadcast::Sender<StoreEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Subscribe to store events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    /// Broadcast an event. Having no subscribers is fine.
    pub fn broadcast(&self, event: StoreEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
