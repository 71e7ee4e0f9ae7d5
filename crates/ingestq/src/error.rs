use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestqError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Client-visible failures of the ingestion façade.
///
/// Validation failures are detected before the queue or the record store is
/// touched. `ShuttingDown` leaves no record behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("ids list cannot be empty")]
    EmptyIdList,

    #[error("ingestion_id not found: {0}")]
    NotFound(String),

    #[error("scheduler is shut down, not accepting new ingestions")]
    ShuttingDown,
}

impl IngestError {
    /// Status code the boundary layer reports for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            IngestError::InvalidPriority(_) | IngestError::EmptyIdList => 400,
            IngestError::NotFound(_) => 404,
            IngestError::ShuttingDown => 503,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Failed to spawn scheduler thread: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Scheduler already started for this service")]
    AlreadyStarted,

    #[error("Scheduler thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, IngestqError>;
