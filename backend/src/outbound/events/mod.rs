//! Tokio broadcast channel implementing `EngagementEventBus`.

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::ports::{EngagementEvent, EngagementEventBus};

/// Default number of buffered events per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// In-process fan-out of engagement events.
#[derive(Debug, Clone)]
pub struct BroadcastEngagementEvents {
    sender: broadcast::Sender<EngagementEvent>,
}

impl BroadcastEngagementEvents {
    /// Create a bus buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }
}

impl Default for BroadcastEngagementEvents {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EngagementEventBus for BroadcastEngagementEvents {
    fn publish(&self, event: EngagementEvent) {
        if let Ok(receivers) = self.sender.send(event) {
            debug!(user_id = %event.user_id(), receivers, "published engagement event");
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<EngagementEvent> {
        self.sender.subscribe()
    }
}
