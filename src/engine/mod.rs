//! Transcode execution: single jobs, the batch supervisor and progress relay

pub mod job;
pub mod progress;
pub mod supervisor;

pub use job::{JobSettings, TranscodeJob, DEFAULT_CANCEL_GRACE, DEFAULT_IDLE_TIMEOUT};
pub use progress::{JsonLinesSink, ProgressRelay};
pub use supervisor::{BatchSupervisor, SupervisorConfig, DEFAULT_PROGRESS_BACKLOG};
