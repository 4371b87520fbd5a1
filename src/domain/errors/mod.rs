// Domain errors - Per-segment failure reasons

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Why a single transcode job failed.
///
/// A job failure is local to its segment: it is recorded in the batch
/// result and never aborts sibling jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobFailure {
    /// The engine reported an error (codec failure, disk full, bad seek...)
    Engine { reason: String },
    /// The engine process could not be started
    Spawn { reason: String },
    /// No progress and no outcome within the watchdog interval
    Timeout {
        #[serde(with = "duration_secs")]
        idle: Duration,
    },
    /// The run was cancelled while this job was pending or running
    Cancelled,
    /// The engine reported success but no output file exists
    MissingOutput { path: String },
    /// The engine stream ended without a terminal outcome, or the job panicked
    Crashed { reason: String },
    /// Local filesystem error while finalizing the job
    Io { reason: String },
}

impl JobFailure {
    /// Whether re-running the same segment could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, JobFailure::Cancelled | JobFailure::Spawn { .. })
    }

    pub fn engine(reason: impl Into<String>) -> Self {
        JobFailure::Engine {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobFailure::Engine { reason } => write!(f, "engine error: {}", reason),
            JobFailure::Spawn { reason } => write!(f, "could not start engine: {}", reason),
            JobFailure::Timeout { idle } => {
                write!(f, "timeout: no progress for {:.1}s", idle.as_secs_f64())
            }
            JobFailure::Cancelled => write!(f, "cancelled"),
            JobFailure::MissingOutput { path } => {
                write!(f, "engine finished but {} was not written", path)
            }
            JobFailure::Crashed { reason } => write!(f, "job crashed: {}", reason),
            JobFailure::Io { reason } => write!(f, "I/O error: {}", reason),
        }
    }
}

impl std::error::Error for JobFailure {}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
