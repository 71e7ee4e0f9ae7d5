//! Process-wide log setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::IngestqError;

/// Installs the global tracing subscriber and routes `log` records into it.
///
/// `RUST_LOG` takes precedence over `config.level`. Output goes to stderr so
/// stdout stays free for protocol replies.
pub fn init_logging(config: &LoggingConfig) -> Result<(), IngestqError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| IngestqError::Logging(format!("invalid filter: {}", e)))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        tracing::subscriber::set_global_default(registry.with(fmt_layer.json()))
    } else {
        tracing::subscriber::set_global_default(registry.with(fmt_layer))
    };
    installed.map_err(|e| IngestqError::Logging(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| IngestqError::Logging(e.to_string()))?;

    Ok(())
}
