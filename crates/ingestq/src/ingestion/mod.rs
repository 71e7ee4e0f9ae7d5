pub mod batch;
pub mod record;
pub mod service;

pub use batch::{Batch, BatchStatus, Priority, BATCH_SIZE};
pub use record::{BatchView, IngestionRecord, IngestionStatus, RecordStore};
pub use service::{IngestionRequest, IngestionService};
