//! Priority-aware batch ingestion.
//!
//! Clients submit a list of integer identifiers with a priority. The list is
//! split into batches of at most three, each batch is queued by
//! `(priority, arrival order)`, and a single background scheduler runs them
//! one at a time against an [`worker::ExternalProcessor`]. Clients poll
//! [`IngestionService::get_status`] until every batch reports completion.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use ingestq::{IngestionService, Priority, RateLimit, SimulatedProcessor};
//!
//! let service = IngestionService::default();
//! let scheduler = service
//!     .spawn_scheduler(
//!         Arc::new(SimulatedProcessor::new(Duration::from_millis(1))),
//!         RateLimit::Unlimited,
//!     )
//!     .unwrap();
//!
//! let id = service.submit(&[1, 2, 3, 4, 5], Priority::High).unwrap();
//! let status = service.get_status(&id).unwrap();
//! println!("{:?}", status.status);
//!
//! scheduler.shutdown().unwrap();
//! ```

pub mod api;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod logging;
pub mod worker;

pub use broadcast::{BatchEvent, BatchEventBroadcaster};
pub use config::{load_config, load_config_from_str, Config};
pub use error::{ConfigError, IngestError, IngestqError, Result, SchedulerError};
pub use ingestion::{
    BatchStatus, IngestionRecord, IngestionRequest, IngestionService, IngestionStatus, Priority,
};
pub use logging::init_logging;
pub use worker::{
    ExternalProcessor, PriorityQueue, RateLimit, Scheduler, SchedulerHandle, SimulatedProcessor,
};
