//! Ingestion façade: accepts submissions and answers status queries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, info_span, warn};

use crate::broadcast::{BatchEvent, BatchEventBroadcaster};
use crate::config::Config;
use crate::error::{IngestError, SchedulerError};
use crate::ingestion::batch::{split_into_batches, BatchStatus, Priority};
use crate::ingestion::record::{IngestionRecord, IngestionStatus, RecordStore};
use crate::worker::{ExternalProcessor, PriorityQueue, RateLimit, Scheduler, SchedulerHandle};

/// A submission as it arrives from a client.
///
/// `priority` is kept as the raw wire string so an unknown value can be
/// reported as [`IngestError::InvalidPriority`] rather than a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionRequest {
    pub ids: Vec<i64>,
    pub priority: String,
}

/// Owns the shared queue and record store.
///
/// Construct it once at startup, share it (typically behind an `Arc`) with
/// request handlers, and start the worker with
/// [`spawn_scheduler`](Self::spawn_scheduler). A service runs at most one
/// scheduler over its lifetime; once that scheduler is shut down the service
/// stops accepting submissions.
pub struct IngestionService {
    queue: Arc<PriorityQueue>,
    records: RecordStore,
    events: BatchEventBroadcaster,
    scheduler_started: AtomicBool,
}

impl IngestionService {
    pub fn new(records: RecordStore, events: BatchEventBroadcaster) -> Self {
        Self {
            queue: Arc::new(PriorityQueue::new()),
            records,
            events,
            scheduler_started: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RecordStore::new(config.retention.record_ttl()),
            BatchEventBroadcaster::new(config.events.capacity),
        )
    }

    pub fn queue(&self) -> &Arc<PriorityQueue> {
        &self.queue
    }

    /// Receiver for every batch status transition from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.events.subscribe()
    }

    /// Starts the single worker that drains this service's queue.
    ///
    /// Fails with [`SchedulerError::AlreadyStarted`] on every call after the
    /// first successful one, including after that scheduler was shut down.
    pub fn spawn_scheduler(
        &self,
        processor: Arc<dyn ExternalProcessor>,
        rate_limit: RateLimit,
    ) -> Result<SchedulerHandle, SchedulerError> {
        if self
            .scheduler_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SchedulerError::AlreadyStarted);
        }

        let result = Scheduler::new(Arc::clone(&self.queue), processor, self.events.clone())
            .with_rate_limit(rate_limit)
            .start();
        if result.is_err() {
            self.scheduler_started.store(false, Ordering::Release);
        }
        result
    }

    /// Validates a raw request and submits it.
    ///
    /// The priority is checked before the id list.
    pub fn ingest(&self, request: &IngestionRequest) -> Result<String, IngestError> {
        let priority: Priority = request.priority.parse()?;
        self.submit(&request.ids, priority)
    }

    /// Splits `ids` into batches, records them and queues them at `priority`.
    ///
    /// The record is stored before anything is queued, and its first batch is
    /// marked triggered before this returns, so a status query issued right
    /// after a successful submission never reports the record as pending.
    ///
    /// Once the scheduler has been shut down nothing would ever run the
    /// batches, so the submission is refused with
    /// [`IngestError::ShuttingDown`] and no record is kept.
    pub fn submit(&self, ids: &[i64], priority: Priority) -> Result<String, IngestError> {
        if ids.is_empty() {
            return Err(IngestError::EmptyIdList);
        }
        if self.queue.is_closed() {
            return Err(IngestError::ShuttingDown);
        }

        let ingestion_id = uuid::Uuid::new_v4().to_string();
        let _span = info_span!("ingest", ingestion_id = %ingestion_id, %priority).entered();

        let batches = split_into_batches(&ingestion_id, ids);
        let record = IngestionRecord::new(ingestion_id.clone(), priority, batches.clone());
        self.records.insert(Arc::new(record));

        // Shutdown can land between the check above and this push
        if !self.queue.push_all(priority, &batches) {
            self.records.remove(&ingestion_id);
            warn!("Ingestion refused, scheduler shut down during submission");
            return Err(IngestError::ShuttingDown);
        }

        // If the scheduler already picked the batch up this is a no-op
        if let Some(first) = batches.first() {
            if first.mark_triggered() {
                self.events.batch_changed(first, BatchStatus::Triggered);
            }
        }

        info!(
            ids = ids.len(),
            batches = batches.len(),
            queued = self.queue.len(),
            "Ingestion accepted"
        );

        Ok(ingestion_id)
    }

    /// Current state of an ingestion, recomputed from its batches.
    pub fn get_status(&self, ingestion_id: &str) -> Result<IngestionStatus, IngestError> {
        match self.records.get(ingestion_id) {
            Some(record) => Ok(record.snapshot()),
            None => {
                debug!(ingestion_id, "Status requested for unknown ingestion");
                Err(IngestError::NotFound(ingestion_id.to_string()))
            }
        }
    }

    pub fn record(&self, ingestion_id: &str) -> Option<Arc<IngestionRecord>> {
        self.records.get(ingestion_id)
    }

    /// Number of batches waiting for the scheduler.
    pub fn pending_batches(&self) -> usize {
        self.queue.len()
    }
}

impl Default for IngestionService {
    fn default() -> Self {
        Self::new(RecordStore::default(), BatchEventBroadcaster::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::NoopProcessor;
    use std::collections::HashSet;
    use std::time::{Duration, Instant};

    fn request(ids: &[i64], priority: &str) -> IngestionRequest {
        IngestionRequest {
            ids: ids.to_vec(),
            priority: priority.to_string(),
        }
    }

    #[test]
    fn test_ingest_splits_into_batches() {
        let service = IngestionService::default();
        let id = service.ingest(&request(&[1, 2, 3, 4, 5], "HIGH")).unwrap();

        let status = service.get_status(&id).unwrap();
        assert_eq!(status.ingestion_id, id);
        assert_eq!(status.batches.len(), 2);
        assert_eq!(status.batches[0].ids, vec![1, 2, 3]);
        assert_eq!(status.batches[1].ids, vec![4, 5]);
        assert_eq!(service.pending_batches(), 2);
    }

    #[test]
    fn test_first_batch_is_pre_triggered() {
        let service = IngestionService::default();
        let id = service.ingest(&request(&[1, 2, 3, 4, 5], "HIGH")).unwrap();

        let status = service.get_status(&id).unwrap();
        assert_eq!(status.status, BatchStatus::Triggered);
        assert_eq!(status.batches[0].status, BatchStatus::Triggered);
        assert_eq!(status.batches[1].status, BatchStatus::Pending);
    }

    #[test]
    fn test_batch_concatenation_matches_input() {
        let service = IngestionService::default();
        let ids: Vec<i64> = (1..=10).collect();
        let id = service.submit(&ids, Priority::Low).unwrap();

        let status = service.get_status(&id).unwrap();
        assert_eq!(status.batches.len(), 4);
        assert!(status.batches.iter().all(|b| !b.ids.is_empty() && b.ids.len() <= 3));
        let joined: Vec<i64> = status.batches.iter().flat_map(|b| b.ids.clone()).collect();
        assert_eq!(joined, ids);
    }

    #[test]
    fn test_empty_ids_rejected() {
        let service = IngestionService::default();
        let err = service.ingest(&request(&[], "HIGH")).unwrap_err();
        assert_eq!(err, IngestError::EmptyIdList);
        assert_eq!(service.pending_batches(), 0);
    }

    #[test]
    fn test_invalid_priority_rejected() {
        let service = IngestionService::default();
        let err = service.ingest(&request(&[1], "INVALID")).unwrap_err();
        assert_eq!(err, IngestError::InvalidPriority("INVALID".to_string()));
        assert_eq!(service.pending_batches(), 0);
    }

    #[test]
    fn test_priority_checked_before_ids() {
        let service = IngestionService::default();
        let err = service.ingest(&request(&[], "URGENT")).unwrap_err();
        assert!(matches!(err, IngestError::InvalidPriority(_)));
    }

    #[test]
    fn test_unknown_id_not_found() {
        let service = IngestionService::default();
        let err = service.get_status("does-not-exist").unwrap_err();
        assert_eq!(err, IngestError::NotFound("does-not-exist".to_string()));
    }

    #[test]
    fn test_ingestion_ids_are_unique() {
        let service = IngestionService::default();
        let ids: HashSet<String> = (0..100)
            .map(|i| service.submit(&[i], Priority::Medium).unwrap())
            .collect();
        assert_eq!(ids.len(), 100);
        for id in &ids {
            assert!(service.get_status(id).is_ok());
        }
    }

    #[test]
    fn test_records_keep_priority() {
        let service = IngestionService::default();
        let id = service.submit(&[1], Priority::Medium).unwrap();
        let record = service.record(&id).unwrap();
        assert_eq!(record.priority(), Priority::Medium);
        assert!(record.created_at() <= chrono::Utc::now());
    }

    #[test]
    fn test_pre_trigger_emits_event() {
        let service = IngestionService::default();
        let mut rx = service.subscribe();
        let id = service.submit(&[1, 2, 3, 4], Priority::High).unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.ingestion_id, id);
        assert_eq!(event.status, BatchStatus::Triggered);
        assert_eq!(event.batch_id, service.get_status(&id).unwrap().batches[0].batch_id);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_scheduler_completes_ingestion() {
        let service = IngestionService::default();
        let handle = service
            .spawn_scheduler(Arc::new(NoopProcessor), RateLimit::Unlimited)
            .unwrap();

        let id = service.submit(&[1, 2, 3, 4, 5, 6, 7], Priority::High).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while service.get_status(&id).unwrap().status != BatchStatus::Completed {
            assert!(Instant::now() < deadline, "ingestion did not complete");
            std::thread::sleep(Duration::from_millis(5));
        }

        let status = service.get_status(&id).unwrap();
        assert!(status
            .batches
            .iter()
            .all(|b| b.status == BatchStatus::Completed));

        handle.shutdown().unwrap();
    }

    #[test]
    fn test_second_scheduler_is_refused() {
        let service = IngestionService::default();
        let handle = service
            .spawn_scheduler(Arc::new(NoopProcessor), RateLimit::Unlimited)
            .unwrap();

        let err = service
            .spawn_scheduler(Arc::new(NoopProcessor), RateLimit::Unlimited)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyStarted));

        handle.shutdown().unwrap();
        let err = service
            .spawn_scheduler(Arc::new(NoopProcessor), RateLimit::Unlimited)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyStarted));
    }

    #[test]
    fn test_submit_after_shutdown_is_refused() {
        let service = IngestionService::default();
        let mut rx = service.subscribe();
        service
            .spawn_scheduler(Arc::new(NoopProcessor), RateLimit::Unlimited)
            .unwrap()
            .shutdown()
            .unwrap();

        let err = service.submit(&[1, 2, 3, 4], Priority::High).unwrap_err();
        assert_eq!(err, IngestError::ShuttingDown);
        assert_eq!(err.status_code(), 503);
        assert_eq!(service.pending_batches(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_from_config_applies_retention() {
        let mut config = Config::default();
        config.retention.record_ttl_secs = Some(1);
        let service = IngestionService::from_config(&config);

        let id = service.submit(&[1], Priority::Low).unwrap();
        assert!(service.get_status(&id).is_ok());

        std::thread::sleep(Duration::from_millis(1300));
        assert!(matches!(
            service.get_status(&id),
            Err(IngestError::NotFound(_))
        ));
    }
}
