//! Units of work and their lifecycle.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Maximum number of identifiers carried by one batch.
pub const BATCH_SIZE: usize = 3;

/// Scheduling priority of a submission.
///
/// Variants are declared in service order, so the derived `Ord` ranks
/// `High < Medium < Low` and the smallest value is served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Numeric queue rank (HIGH=0, MEDIUM=1, LOW=2).
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            "LOW" => Ok(Priority::Low),
            other => Err(IngestError::InvalidPriority(other.to_string())),
        }
    }
}

/// Lifecycle of a batch. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BatchStatus {
    #[serde(rename = "yet_to_start")]
    Pending = 0,
    #[serde(rename = "triggered")]
    Triggered = 1,
    #[serde(rename = "completed")]
    Completed = 2,
}

impl BatchStatus {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => BatchStatus::Pending,
            1 => BatchStatus::Triggered,
            _ => BatchStatus::Completed,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Pending => write!(f, "Pending"),
            BatchStatus::Triggered => write!(f, "Triggered"),
            BatchStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// A chunk of at most [`BATCH_SIZE`] identifiers processed as one unit.
///
/// The status lives in an atomic so the scheduler can advance it while
/// request handlers read it, without a per-batch lock.
#[derive(Debug)]
pub struct Batch {
    id: String,
    ingestion_id: String,
    ids: Vec<i64>,
    status: AtomicU8,
}

impl Batch {
    pub(crate) fn new(ingestion_id: &str, ids: Vec<i64>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ingestion_id: ingestion_id.to_string(),
            ids,
            status: AtomicU8::new(BatchStatus::Pending as u8),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id of the ingestion record this batch belongs to.
    pub fn ingestion_id(&self) -> &str {
        &self.ingestion_id
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn status(&self) -> BatchStatus {
        BatchStatus::from_raw(self.status.load(Ordering::Acquire))
    }

    /// Moves the status forward to `to`.
    ///
    /// Returns `true` only if the stored status actually changed; a request
    /// to move backwards or sideways is a no-op.
    pub(crate) fn advance(&self, to: BatchStatus) -> bool {
        let previous = self.status.fetch_max(to as u8, Ordering::AcqRel);
        previous < to as u8
    }

    pub(crate) fn mark_triggered(&self) -> bool {
        self.advance(BatchStatus::Triggered)
    }

    pub(crate) fn mark_completed(&self) -> bool {
        self.advance(BatchStatus::Completed)
    }
}

/// Splits `ids` into consecutive batches of at most [`BATCH_SIZE`], keeping
/// the original order.
pub(crate) fn split_into_batches(ingestion_id: &str, ids: &[i64]) -> Vec<Arc<Batch>> {
    ids.chunks(BATCH_SIZE)
        .map(|chunk| Arc::new(Batch::new(ingestion_id, chunk.to_vec())))
        .collect()
}
