use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::broadcast::BatchEventBroadcaster;
use crate::error::SchedulerError;
use crate::ingestion::batch::BatchStatus;
use crate::worker::processor::ExternalProcessor;
use crate::worker::queue::{PriorityQueue, ScheduledBatch};

/// Optional global pacing between batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimit {
    /// Pop the next batch as soon as the previous one completes.
    #[default]
    Unlimited,
    /// Pause for the given duration after every completed batch.
    AfterEachBatch(Duration),
}

impl RateLimit {
    pub fn from_delay(delay: Option<Duration>) -> Self {
        match delay {
            Some(pause) if !pause.is_zero() => RateLimit::AfterEachBatch(pause),
            _ => RateLimit::Unlimited,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    /// Waiting on an empty queue (or pacing between batches).
    Idle = 0,
    /// Processing exactly one batch.
    Running = 1,
    Stopped = 2,
}

impl SchedulerState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => SchedulerState::Idle,
            1 => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }
}

#[derive(Debug)]
struct SchedulerStats {
    state: AtomicU8,
    processed: AtomicU64,
}

impl SchedulerStats {
    fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// The single worker that drains the priority queue.
///
/// Batches are executed one at a time, so side effects happen in the exact
/// order the queue hands batches out. A batch that is already running is
/// never preempted; a newly submitted higher-priority batch only affects
/// the next pop.
pub struct Scheduler {
    queue: Arc<PriorityQueue>,
    processor: Arc<dyn ExternalProcessor>,
    events: BatchEventBroadcaster,
    rate_limit: RateLimit,
}

impl Scheduler {
    pub fn new(
        queue: Arc<PriorityQueue>,
        processor: Arc<dyn ExternalProcessor>,
        events: BatchEventBroadcaster,
    ) -> Self {
        Self {
            queue,
            processor,
            events,
            rate_limit: RateLimit::Unlimited,
        }
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Starts the worker loop on a dedicated thread.
    pub fn start(self) -> Result<SchedulerHandle, SchedulerError> {
        let stats = Arc::new(SchedulerStats {
            state: AtomicU8::new(SchedulerState::Idle as u8),
            processed: AtomicU64::new(0),
        });
        let queue = Arc::clone(&self.queue);
        let worker_stats = Arc::clone(&stats);
        let rate_limit = self.rate_limit;

        let handle = thread::Builder::new()
            .name("ingestq-scheduler".into())
            .spawn(move || self.run(&worker_stats))
            .map_err(SchedulerError::SpawnFailed)?;

        info!("Scheduler started ({:?})", rate_limit);

        Ok(SchedulerHandle {
            queue,
            stats,
            handle: Some(handle),
        })
    }

    fn run(self, stats: &SchedulerStats) {
        debug!("Scheduler loop started");

        loop {
            stats.set_state(SchedulerState::Idle);
            let Some(entry) = self.queue.pop_blocking() else {
                debug!("Scheduler queue closed");
                break;
            };

            stats.set_state(SchedulerState::Running);
            self.execute(&entry);
            stats.processed.fetch_add(1, Ordering::Relaxed);

            if let RateLimit::AfterEachBatch(pause) = self.rate_limit {
                stats.set_state(SchedulerState::Idle);
                if self.queue.wait_closed(pause) {
                    debug!("Scheduler queue closed while pacing");
                    break;
                }
            }
        }

        stats.set_state(SchedulerState::Stopped);

        let remaining = self.queue.len();
        if remaining > 0 {
            warn!(
                "Scheduler stopped with {} batches still queued; they will not run",
                remaining
            );
        }
        debug!("Scheduler loop stopped");
    }

    fn execute(&self, entry: &ScheduledBatch) {
        let batch = &entry.batch;

        if batch.mark_triggered() {
            self.events.batch_changed(batch, BatchStatus::Triggered);
        }

        debug!(
            "Processing batch {} of ingestion {} ({} ids, priority {}, seq {})",
            batch.id(),
            batch.ingestion_id(),
            batch.ids().len(),
            entry.priority,
            entry.sequence
        );

        for &id in batch.ids() {
            self.processor.process(id);
        }

        if batch.mark_completed() {
            self.events.batch_changed(batch, BatchStatus::Completed);
        }

        debug!("Batch {} completed", batch.id());
    }
}

/// Join point for a running [`Scheduler`].
///
/// Shutting down (explicitly or by dropping the handle) closes the queue,
/// lets the in-flight batch finish and joins the worker thread.
#[derive(Debug)]
pub struct SchedulerHandle {
    queue: Arc<PriorityQueue>,
    stats: Arc<SchedulerStats>,
    handle: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_raw(self.stats.state.load(Ordering::Acquire))
    }

    /// Number of batches this worker has run to completion.
    pub fn processed_batches(&self) -> u64 {
        self.stats.processed.load(Ordering::Relaxed)
    }

    pub fn shutdown(mut self) -> Result<(), SchedulerError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), SchedulerError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        info!("Shutting down scheduler...");
        self.queue.close();

        if let Err(e) = handle.join() {
            error!("Scheduler thread panicked: {:?}", e);
            return Err(SchedulerError::WorkerPanicked);
        }

        info!("Scheduler stopped");
        Ok(())
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Scheduler shutdown failed: {}", e);
        }
    }
}
