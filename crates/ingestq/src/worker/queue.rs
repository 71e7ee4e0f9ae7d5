//! Priority queue of pending batches.
//!
//! Entries are ranked by `(priority, arrival sequence)`: lower priority rank
//! first, and FIFO among equal priorities. The heap and the sequence counter
//! sit behind one mutex; a condition variable wakes the consumer when an
//! entry arrives or the queue is closed, so an empty queue costs no polling.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::ingestion::batch::{Batch, Priority};

/// A batch waiting in (or just taken from) the queue.
#[derive(Debug, Clone)]
pub struct ScheduledBatch {
    pub priority: Priority,
    /// Per-queue arrival counter, used only to break priority ties.
    pub sequence: u64,
    pub batch: Arc<Batch>,
}

impl PartialEq for ScheduledBatch {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for ScheduledBatch {}

impl PartialOrd for ScheduledBatch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledBatch {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: the smallest (priority, sequence) must
        // compare as the greatest.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug)]
struct QueueState {
    heap: BinaryHeap<ScheduledBatch>,
    next_sequence: u64,
    closed: bool,
}

#[derive(Debug)]
pub struct PriorityQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_sequence: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            log::warn!("Priority queue lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Enqueues one batch and returns its arrival sequence number.
    ///
    /// Returns `None` without enqueuing if the queue has been closed.
    pub fn push(&self, priority: Priority, batch: Arc<Batch>) -> Option<u64> {
        let sequence = {
            let mut state = self.lock();
            if state.closed {
                return None;
            }
            Self::insert(&mut state, priority, batch)
        };
        self.available.notify_all();
        Some(sequence)
    }

    /// Enqueues several batches under a single lock acquisition.
    ///
    /// The batches receive consecutive sequence numbers in slice order, so
    /// no concurrent push can interleave with them. Returns `false` and
    /// enqueues nothing if the queue has been closed.
    pub fn push_all(&self, priority: Priority, batches: &[Arc<Batch>]) -> bool {
        {
            let mut state = self.lock();
            if state.closed {
                return false;
            }
            for batch in batches {
                Self::insert(&mut state, priority, Arc::clone(batch));
            }
        }
        if !batches.is_empty() {
            self.available.notify_all();
        }
        true
    }

    fn insert(state: &mut QueueState, priority: Priority, batch: Arc<Batch>) -> u64 {
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.heap.push(ScheduledBatch {
            priority,
            sequence,
            batch,
        });
        sequence
    }

    /// Removes the highest-ranked entry, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue has been closed. Entries still queued at
    /// that point are not handed out.
    pub fn pop_blocking(&self) -> Option<ScheduledBatch> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(entry) = state.heap.pop() {
                return Some(entry);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks for up to `timeout` or until the queue is closed.
    ///
    /// Returns `true` if the queue was closed.
    pub fn wait_closed(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while !state.closed {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (next, _) = self
                .available
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = next;
        }
        true
    }

    /// Closes the queue and wakes every waiter.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of entries waiting to be popped.
    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}
