// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::domain::model::*;
use crate::error::StudioResult;

/// Port for acquiring the source video
#[async_trait]
pub trait VideoSourcePort: Send + Sync {
    /// Produce a fully written, seekable local file for `locator`.
    ///
    /// Remote sources are written inside `work_dir`; local sources may be
    /// returned in place.
    async fn fetch(&self, locator: &str, work_dir: &Path) -> StudioResult<PathBuf>;
}

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Total duration of the media container, in seconds (always > 0)
    async fn probe_duration(&self, file_path: &Path) -> StudioResult<f64>;
}

/// One engine invocation: extract, crop and encode a window of the source
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    pub input_path: PathBuf,
    pub start_seconds: f64,
    pub length_seconds: f64,
    pub crop_filter: String,
    pub output_path: PathBuf,
}

/// Event reported by a running engine invocation
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Seconds of output encoded so far
    Progress { processed_seconds: f64 },
    /// The output file was written completely
    Completed,
    /// The invocation failed
    Failed { reason: String },
    /// The engine could not be started at all
    Unavailable { reason: String },
}

/// Lazy event sequence of one invocation
pub type EngineEvents = Pin<Box<dyn Stream<Item = EngineEvent> + Send>>;

/// Port for the transcoding engine
pub trait TranscodePort: Send + Sync {
    /// Start an invocation and return its events.
    ///
    /// The stream yields at most one terminal event and ends once the
    /// underlying work has stopped. When `cancel` fires the engine stops
    /// as soon as it can and ends the stream; it may or may not emit
    /// `Failed` first.
    fn invoke(&self, request: TranscodeRequest, cancel: CancellationToken) -> EngineEvents;
}

/// Port for file system operations
#[async_trait]
pub trait FsPort: Send + Sync {
    /// Create `dir_path` if missing, or clear the clips of an earlier run
    /// from it. Refuses directories holding anything else.
    async fn prepare_output_dir(&self, dir_path: &Path) -> StudioResult<()>;

    /// Check if file exists
    async fn file_exists(&self, file_path: &Path) -> StudioResult<bool>;
}

/// Observer of batch execution.
///
/// Called from a dedicated relay thread, never from a job, so a slow
/// implementation delays rendering but not transcoding. Progress events
/// may be dropped under backlog; `on_job_done` is always delivered and is
/// the last call for its segment.
pub trait ProgressSink: Send + Sync {
    /// A job acquired a worker slot and invoked the engine.
    ///
    /// `attempt` starts at 1; a retried segment starts again from zero
    /// progress.
    fn on_job_started(&self, _segment: &SegmentDescriptor, _attempt: u32) {}

    fn on_progress(&self, event: &ProgressEvent);

    fn on_job_done(&self, segment_index: usize, outcome: &JobOutcome);
}

/// Sink that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&self, _event: &ProgressEvent) {}

    fn on_job_done(&self, _segment_index: usize, _outcome: &JobOutcome) {}
}
