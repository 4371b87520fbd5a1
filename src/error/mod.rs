//! Error handling module for Shorts Studio

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for run-level operations.
///
/// Every variant except `Io` is fatal to a split run: the pipeline stops
/// before (or instead of) launching any transcode job. Per-segment
/// failures are never expressed here, see [`crate::domain::errors::JobFailure`].
#[derive(Error, Debug)]
pub enum StudioError {
    /// The source video could not be acquired
    #[error("Failed to fetch video from {locator}: {message}")]
    Fetch { locator: String, message: String },

    /// The media duration could not be determined
    #[error("Failed to probe media file {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    /// Invalid duration or segment length handed to the planner
    #[error("Invalid segmentation parameters: {message}")]
    PlanningPrecondition { message: String },

    /// The output directory could not be created or cleared
    #[error("Output directory {} is unusable: {message}", path.display())]
    OutputDir { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// A required external executable is missing
    #[error("Required tool not found on PATH: {tool}")]
    ToolNotFound { tool: String },

    /// The run was cancelled before any segment was started
    #[error("Cancelled before transcoding started")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudioError {
    pub(crate) fn fetch(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            locator: locator.into(),
            message: message.into(),
        }
    }

    pub(crate) fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for Shorts Studio operations
pub type StudioResult<T> = std::result::Result<T, StudioError>;
