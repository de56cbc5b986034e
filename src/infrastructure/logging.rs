//! Logging setup.
//!
//! Structured logging via tracing: a stderr layer in the configured format
//! plus an optional JSON file layer written into the run directory, so every
//! run carries its own audit log next to its cycle artifacts.

use std::io;
use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::models::LoggingConfig;

/// Initialize the global subscriber.
///
/// Returns the appender guard when a file layer was installed; the caller
/// must hold it for the process lifetime or buffered log lines are lost.
pub fn init(config: &LoggingConfig, run_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = parse_log_level(&config.level)?;
    let env_filter = || {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy()
    };

    let file_parts = match run_dir {
        Some(dir) if config.log_to_run_dir => {
            let (writer, guard) = tracing_appender::non_blocking(rolling::never(dir, "burnish.log"));
            Some((writer, guard))
        }
        _ => None,
    };

    match file_parts {
        Some((writer, guard)) => {
            // File layer is always JSON for machine-readable audit logs.
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(env_filter());

            if config.format == "json" {
                tracing_subscriber::registry()
                    .with(file_layer)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(io::stderr)
                            .with_filter(env_filter()),
                    )
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(file_layer)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(io::stderr)
                            .with_filter(env_filter()),
                    )
                    .init();
            }
            Ok(Some(guard))
        }
        None => {
            if config.format == "json" {
                tracing_subscriber::registry()
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(io::stderr)
                            .with_filter(env_filter()),
                    )
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(io::stderr)
                            .with_filter(env_filter()),
                    )
                    .init();
            }
            Ok(None)
        }
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(anyhow!("unknown log level '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_log_level_accepts_known_levels() {
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("WARN").unwrap(), Level::WARN);
        assert!(parse_log_level("verbose").is_err());
    }
}
