//! Shared plumbing for the market-monitor binaries: argument parsing, logging
//! setup and exit-code mapping. Each binary under `src/bin` runs one ingestor.

pub mod cli;
pub mod error;

use std::fmt::Display;
use std::sync::Arc;

use mm_core::{HttpClient, ReqwestHttpClient};
use tracing_subscriber::EnvFilter;

pub use crate::cli::{BackfillCli, IngestCli, WarehouseArgs};
pub use crate::error::CliError;

/// Install the `fmt` subscriber on stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn http_client() -> Result<Arc<dyn HttpClient>, CliError> {
    Ok(Arc::new(ReqwestHttpClient::new()?))
}

/// Print the run summary on success; on failure log it, echo
/// `[<tag>] failed: <message>` and exit non-zero.
pub fn finish<T: Display>(tag: &str, result: Result<T, CliError>) {
    match result {
        Ok(summary) => println!("{summary}"),
        Err(error) => {
            tracing::error!(ingestor = tag, %error, "ingest failed");
            println!("[{tag}] failed: {error}");
            std::process::exit(error.exit_code());
        }
    }
}
