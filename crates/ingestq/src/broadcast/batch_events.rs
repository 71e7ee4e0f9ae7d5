//! Batch status events for push-style consumers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::ingestion::batch::{Batch, BatchStatus};

/// A batch changed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEvent {
    /// Ingestion the batch belongs to
    pub ingestion_id: String,
    /// Batch that changed
    pub batch_id: String,
    /// Status the batch moved to
    pub status: BatchStatus,
    /// When the change was published
    pub timestamp: DateTime<Utc>,
}

impl BatchEvent {
    pub fn new(batch: &Batch, status: BatchStatus) -> Self {
        Self {
            ingestion_id: batch.ingestion_id().to_string(),
            batch_id: batch.id().to_string(),
            status,
            timestamp: Utc::now(),
        }
    }
}

/// Fans batch events out to any number of subscribers.
#[derive(Clone)]
pub struct BatchEventBroadcaster {
    sender: Arc<broadcast::Sender<BatchEvent>>,
}

impl BatchEventBroadcaster {
    /// Creates a broadcaster with the specified channel capacity.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: BatchEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Publishes `status` for `batch`.
    pub fn batch_changed(&self, batch: &Batch, status: BatchStatus) {
        self.send(BatchEvent::new(batch, status));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BatchEventBroadcaster {
    fn default() -> Self {
        Self::new(1024)
    }
}
