//! Line-oriented front end for the ingestion engine.
//!
//! Reads one JSON command per line from stdin and writes one JSON reply per
//! line to stdout:
//!
//! ```text
//! {"op":"ingest","ids":[1,2,3,4,5],"priority":"HIGH"}
//! {"status":200,"body":{"ingestion_id":"..."}}
//! {"op":"status","ingestion_id":"..."}
//! {"status":200,"body":{"ingestion_id":"...","status":"triggered","batches":[...]}}
//! ```
//!
//! The config path comes from the first argument or `INGESTQ_CONFIG`.
//! Exits on end of input or Ctrl-C.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, select, unbounded};
use log::{debug, error, info, warn};

use ingestq::{api, init_logging, load_config, Config, IngestionService, SimulatedProcessor};

fn resolve_config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("INGESTQ_CONFIG").map(PathBuf::from))
}

fn main() {
    if let Err(e) = run() {
        eprintln!("ingestq: {}", e);
        std::process::exit(1);
    }
}

fn run() -> ingestq::Result<()> {
    let config = match resolve_config_path() {
        Some(path) => load_config(&path)?,
        None => Config::default(),
    };

    init_logging(&config.logging)?;
    info!("Starting ingestq v{}", env!("CARGO_PKG_VERSION"));

    let service = IngestionService::from_config(&config);
    let processor = Arc::new(SimulatedProcessor::new(config.processor.per_id_delay()));
    let scheduler = service.spawn_scheduler(processor, config.scheduler.rate_limit())?;

    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    }) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    // The reader blocks on stdin, so it lives on its own thread and is left
    // behind at exit.
    let (line_tx, line_rx) = unbounded::<String>();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    let stdout = std::io::stdout();
    loop {
        select! {
            recv(line_rx) -> msg => match msg {
                Ok(line) => {
                    if line.trim().is_empty() {
                        debug!("Skipping blank input line");
                    } else {
                        let reply = api::dispatch(&service, &line);
                        let encoded = serde_json::to_string(&reply)
                            .unwrap_or_else(|_| r#"{"status":500,"body":{"detail":"Failed to encode reply"}}"#.to_string());
                        let mut out = stdout.lock();
                        if let Err(e) = writeln!(out, "{}", encoded).and_then(|_| out.flush()) {
                            error!("Failed to write reply: {}", e);
                            break;
                        }
                    }
                }
                Err(_) => {
                    info!("Input closed");
                    break;
                }
            },
            recv(shutdown_rx) -> _ => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    if service.pending_batches() > 0 {
        info!(
            "Stopping with {} batches still queued",
            service.pending_batches()
        );
    }
    scheduler.shutdown()?;

    info!("ingestq stopped");
    Ok(())
}
