pub mod processor;
pub mod queue;
pub mod scheduler;

pub use processor::{ExternalProcessor, NoopProcessor, SimulatedProcessor};
pub use queue::{PriorityQueue, ScheduledBatch};
pub use scheduler::{RateLimit, Scheduler, SchedulerHandle, SchedulerState};
