use std::time::Duration;

/// Downstream service that handles one identifier at a time.
///
/// The scheduler calls it once per identifier, in batch order, and treats
/// every call as successful. Implementations backed by a real service own
/// their retry and backoff policy.
pub trait ExternalProcessor: Send + Sync {
    fn process(&self, id: i64);
}

/// Stand-in for a remote API: acknowledges each identifier after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    delay: Duration,
}

impl SimulatedProcessor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SimulatedProcessor {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl ExternalProcessor for SimulatedProcessor {
    fn process(&self, id: i64) {
        log::trace!("Simulated processing of id {}", id);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}

/// Processor that returns immediately, for tests.
pub struct NoopProcessor;

impl ExternalProcessor for NoopProcessor {
    fn process(&self, _id: i64) {}
}
