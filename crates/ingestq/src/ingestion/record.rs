//! Ingestion records and the store that keeps them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::Serialize;

use crate::ingestion::batch::{Batch, BatchStatus, Priority};

/// Derives a record-level status from its batch statuses.
///
/// COMPLETED if every batch is completed, else TRIGGERED if any batch is
/// triggered, else PENDING.
pub fn aggregate_status<I>(statuses: I) -> BatchStatus
where
    I: IntoIterator<Item = BatchStatus>,
{
    let mut all_completed = true;
    let mut any_triggered = false;

    for status in statuses {
        match status {
            BatchStatus::Completed => {}
            BatchStatus::Triggered => {
                all_completed = false;
                any_triggered = true;
            }
            BatchStatus::Pending => all_completed = false,
        }
    }

    if all_completed {
        BatchStatus::Completed
    } else if any_triggered {
        BatchStatus::Triggered
    } else {
        BatchStatus::Pending
    }
}

/// The batches produced from one client submission.
///
/// The batch list is fixed at creation. The record has no status field of its
/// own; [`IngestionRecord::status`] is recomputed from the batches on every
/// call.
#[derive(Debug)]
pub struct IngestionRecord {
    id: String,
    priority: Priority,
    created_at: DateTime<Utc>,
    batches: Vec<Arc<Batch>>,
}

impl IngestionRecord {
    pub(crate) fn new(id: String, priority: Priority, batches: Vec<Arc<Batch>>) -> Self {
        Self {
            id,
            priority,
            created_at: Utc::now(),
            batches,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn batches(&self) -> &[Arc<Batch>] {
        &self.batches
    }

    /// Live aggregate status.
    pub fn status(&self) -> BatchStatus {
        aggregate_status(self.batches.iter().map(|b| b.status()))
    }

    /// Point-in-time view of the record.
    ///
    /// Each batch status is loaded exactly once and the aggregate is derived
    /// from those same loads, so the aggregate always agrees with the listed
    /// batches even while the scheduler is advancing them.
    pub fn snapshot(&self) -> IngestionStatus {
        let batches: Vec<BatchView> = self
            .batches
            .iter()
            .map(|batch| BatchView {
                batch_id: batch.id().to_string(),
                ids: batch.ids().to_vec(),
                status: batch.status(),
            })
            .collect();

        IngestionStatus {
            ingestion_id: self.id.clone(),
            status: aggregate_status(batches.iter().map(|b| b.status)),
            batches,
        }
    }
}

/// Status of one batch as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchView {
    /// Unique batch identifier
    pub batch_id: String,
    /// Identifiers carried by the batch, in submission order
    pub ids: Vec<i64>,
    /// Current batch status
    pub status: BatchStatus,
}

/// Status of one ingestion as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionStatus {
    /// Identifier returned at submission
    pub ingestion_id: String,
    /// Aggregate status derived from the batches below
    pub status: BatchStatus,
    /// Every batch of the ingestion, in submission order
    pub batches: Vec<BatchView>,
}

/// Records keyed by ingestion id.
///
/// Without a retention period records are kept for the lifetime of the
/// process. With one, a record is dropped once it is older than the period,
/// whether or not its batches have finished.
pub struct RecordStore {
    records: Cache<String, Arc<IngestionRecord>>,
    retention: Option<Duration>,
}

impl RecordStore {
    pub fn new(retention: Option<Duration>) -> Self {
        let mut builder = Cache::builder();
        if let Some(ttl) = retention {
            builder = builder.time_to_live(ttl);
        }

        Self {
            records: builder.build(),
            retention,
        }
    }

    pub fn retention(&self) -> Option<Duration> {
        self.retention
    }

    pub fn insert(&self, record: Arc<IngestionRecord>) {
        self.records.insert(record.id().to_string(), record);
    }

    pub fn get(&self, ingestion_id: &str) -> Option<Arc<IngestionRecord>> {
        self.records.get(ingestion_id)
    }

    pub fn contains(&self, ingestion_id: &str) -> bool {
        self.records.contains_key(ingestion_id)
    }

    pub fn remove(&self, ingestion_id: &str) {
        self.records.invalidate(ingestion_id);
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(None)
    }
}
