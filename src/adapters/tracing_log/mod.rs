// Tracing log adapter - Structured logging using tracing crate

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{StudioError, StudioResult};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
    /// JSON format for structured logging
    Json,
}

/// Tracing log adapter
pub struct TracingLogAdapter;

impl TracingLogAdapter {
    /// Filter from `RUST_LOG`, falling back to `level`
    pub fn filter(level: &str) -> StudioResult<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(level)
                .map_err(|e| StudioError::config(format!("invalid log level '{}': {}", level, e))),
        }
    }

    /// Install the global subscriber writing to stderr.
    ///
    /// Returns `false` when a subscriber was already installed, which is
    /// not an error (tests and embedders may set their own).
    pub fn init(level: &str, format: LogFormat) -> StudioResult<bool> {
        let filter = Self::filter(level)?;
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false);

        let installed = match format {
            LogFormat::Pretty => builder.pretty().try_init(),
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder.json().with_current_span(false).try_init(),
        };
        Ok(installed.is_ok())
    }
}
