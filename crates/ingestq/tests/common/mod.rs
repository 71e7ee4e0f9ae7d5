//! Shared test utilities for ingestq integration tests.
//!
//! This module provides:
//! - `GatedProcessor`, which records every identifier it sees and can park
//!   the scheduler on a chosen identifier until the test releases it
//! - polling helpers with bounded timeouts

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};

use ingestq::{BatchStatus, ExternalProcessor, IngestionService};

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Processor that blocks on `gate_id` until [`Gate::release`] is called.
pub struct GatedProcessor {
    gate_id: i64,
    seen: Mutex<Vec<i64>>,
    started_tx: Sender<()>,
    release_rx: Receiver<()>,
}

/// Test-side controls for a [`GatedProcessor`].
pub struct Gate {
    started_rx: Receiver<()>,
    release_tx: Sender<()>,
}

impl GatedProcessor {
    pub fn new(gate_id: i64) -> (Arc<Self>, Gate) {
        let (started_tx, started_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(1);
        let processor = Arc::new(Self {
            gate_id,
            seen: Mutex::new(Vec::new()),
            started_tx,
            release_rx,
        });
        (
            processor,
            Gate {
                started_rx,
                release_tx,
            },
        )
    }

    pub fn seen(&self) -> Vec<i64> {
        self.seen.lock().unwrap().clone()
    }
}

impl ExternalProcessor for GatedProcessor {
    fn process(&self, id: i64) {
        self.seen.lock().unwrap().push(id);
        if id == self.gate_id {
            let _ = self.started_tx.send(());
            let _ = self.release_rx.recv_timeout(TIMEOUT);
        }
    }
}

impl Gate {
    /// Blocks until the scheduler is parked on the gate identifier.
    pub fn wait_started(&self) {
        self.started_rx
            .recv_timeout(TIMEOUT)
            .expect("scheduler never reached the gate");
    }

    pub fn release(&self) {
        self.release_tx.send(()).expect("gated processor is gone");
    }
}

/// Processor that tracks how many `process` calls overlap in time.
#[derive(Default)]
pub struct OverlapCounter {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl OverlapCounter {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExternalProcessor for OverlapCounter {
    fn process(&self, _id: i64) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(1));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Polls until the ingestion reports COMPLETED or the timeout elapses.
pub fn wait_for_completion(service: &IngestionService, ingestion_id: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        match service.get_status(ingestion_id) {
            Ok(status) if status.status == BatchStatus::Completed => return true,
            Ok(_) => thread::sleep(Duration::from_millis(5)),
            Err(_) => return false,
        }
    }
    false
}
