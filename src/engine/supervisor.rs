//! Batch supervisor
//!
//! Fans one [`TranscodeJob`] out per planned segment and joins them all
//! back into a frozen [`BatchResult`]. Jobs share nothing but the
//! read-only asset; one job's failure never cancels its siblings.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::errors::JobFailure;
use crate::domain::model::*;
use crate::domain::rules::CropRule;
use crate::engine::job::{remove_partial, JobSettings, TranscodeJob};
use crate::engine::progress::ProgressRelay;
use crate::ports::{ProgressSink, TranscodePort};

/// Default number of undelivered progress events before new ones are dropped
pub const DEFAULT_PROGRESS_BACKLOG: usize = 256;

/// Scheduling policy of a batch
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Upper bound on simultaneous engine invocations; `None` runs every job at once
    pub max_concurrent_jobs: Option<usize>,
    /// Attempts per segment, including the first one
    pub max_attempts: u32,
    pub crop_aspect: CropAspect,
    pub job: JobSettings,
    pub progress_backlog: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: None,
            max_attempts: 1,
            crop_aspect: CropAspect::default(),
            job: JobSettings::default(),
            progress_backlog: DEFAULT_PROGRESS_BACKLOG,
        }
    }
}

impl SupervisorConfig {
    pub fn with_max_concurrent_jobs(mut self, limit: usize) -> Self {
        self.max_concurrent_jobs = Some(limit.max(1));
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.job.idle_timeout = idle;
        self
    }
}

/// Result of one spawned attempt
struct Finished {
    segment: SegmentDescriptor,
    attempt: u32,
    outcome: JobOutcome,
}

/// Runs every segment of a plan concurrently and collects their outcomes
pub struct BatchSupervisor {
    engine: Arc<dyn TranscodePort>,
    config: SupervisorConfig,
    board: Arc<DashMap<usize, JobState>>,
}

impl BatchSupervisor {
    pub fn new(engine: Arc<dyn TranscodePort>, config: SupervisorConfig) -> Self {
        Self {
            engine,
            config,
            board: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// State of `index` in the batch currently (or last) run
    pub fn job_state(&self, index: usize) -> Option<JobState> {
        self.board.get(&index).map(|state| *state)
    }

    /// Snapshot of every job state, in index order
    pub fn job_states(&self) -> BTreeMap<usize, JobState> {
        self.board
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    /// Run the batch to completion.
    ///
    /// Resolves only once every planned segment has a terminal outcome.
    /// Cancelling `cancel` makes pending and running jobs fail with
    /// [`JobFailure::Cancelled`]; finished jobs keep their outcome.
    pub async fn run_batch(
        &self,
        asset: &MediaAsset,
        plan: &SegmentPlan,
        output_dir: &Path,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> BatchResult {
        self.board.clear();
        if plan.is_empty() {
            info!("Empty segment plan, nothing to transcode");
            return BatchResult::empty();
        }

        info!(
            segments = plan.len(),
            max_concurrent = ?self.config.max_concurrent_jobs,
            output_dir = %output_dir.display(),
            "Starting batch"
        );

        let (relay, relay_handle) = ProgressRelay::spawn(sink, self.config.progress_backlog);
        let semaphore = self
            .config
            .max_concurrent_jobs
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        let crop_filter = CropRule::filter(self.config.crop_aspect);
        let mut builder = BatchResultBuilder::new(plan.len());
        let mut join_set = JoinSet::new();

        let launch = |join_set: &mut JoinSet<Finished>, segment: SegmentDescriptor, attempt: u32| {
            self.board.insert(segment.index, JobState::Pending);
            let job = TranscodeJob::new(
                asset,
                segment,
                output_dir,
                crop_filter.clone(),
                self.config.job,
            );
            let attempt_run = AttemptRun {
                engine: Arc::clone(&self.engine),
                board: Arc::clone(&self.board),
                relay: relay.clone(),
                semaphore: semaphore.clone(),
                cancel: cancel.clone(),
            };
            join_set.spawn(attempt_run.run(job, attempt));
        };

        for segment in plan {
            launch(&mut join_set, *segment, 1);
        }

        while let Some(joined) = join_set.join_next().await {
            let finished = match joined {
                Ok(finished) => finished,
                Err(e) => {
                    error!(error = %e, "Transcode task was lost");
                    continue;
                }
            };
            let Finished {
                segment,
                attempt,
                outcome,
            } = finished;

            if let Some(failure) = outcome.failure() {
                if failure.is_retryable()
                    && attempt < self.config.max_attempts
                    && !cancel.is_cancelled()
                {
                    debug!(
                        segment = segment.index,
                        attempt,
                        reason = %failure,
                        "Retrying segment"
                    );
                    launch(&mut join_set, segment, attempt + 1);
                    continue;
                }
            }

            self.settle(&mut builder, &relay, segment.index, outcome);
        }

        // Safety net: a lost task still has to count against the plan.
        for segment in plan {
            if builder.is_complete() {
                break;
            }
            if self.job_state(segment.index).map_or(true, |s| !s.is_terminal()) {
                let outcome = JobOutcome::Failed {
                    reason: JobFailure::Crashed {
                        reason: "job task was lost".to_string(),
                    },
                };
                remove_partial(&segment.output_path(output_dir)).await;
                self.settle(&mut builder, &relay, segment.index, outcome);
            }
        }

        let dropped = relay.dropped();
        drop(relay);
        if let Err(e) = relay_handle.await {
            warn!(error = %e, "Progress sink stopped unexpectedly");
        }
        if dropped > 0 {
            debug!(dropped, "Progress events dropped under backlog");
        }

        let result = builder.finish();
        info!(
            succeeded = result.succeeded_count(),
            failed = result.failed_count(),
            planned = result.planned(),
            "Batch finished"
        );
        result
    }

    fn settle(
        &self,
        builder: &mut BatchResultBuilder,
        relay: &ProgressRelay,
        index: usize,
        outcome: JobOutcome,
    ) {
        let next = JobState::from(&outcome);
        if let Some(mut state) = self.board.get_mut(&index) {
            match state.advance(next) {
                Ok(advanced) => *state = advanced,
                Err(e) => warn!(segment = index, error = %e, "Unexpected job transition"),
            }
        } else {
            self.board.insert(index, next);
        }

        relay.job_done(index, outcome.clone());
        if let Err(e) = builder.record(index, outcome) {
            error!(error = %e, "Dropping duplicate job outcome");
        }
    }
}

/// Everything one spawned attempt needs, owned so the task is `'static`
struct AttemptRun {
    engine: Arc<dyn TranscodePort>,
    board: Arc<DashMap<usize, JobState>>,
    relay: ProgressRelay,
    semaphore: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
}

impl AttemptRun {
    async fn run(self, job: TranscodeJob, attempt: u32) -> Finished {
        let segment = *job.segment();
        let output_path = job.output_path().to_path_buf();

        let outcome = std::panic::AssertUnwindSafe(self.execute(job, attempt))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "job panicked".to_string());
                error!(segment = segment.index, %reason, "Transcode job panicked");
                Err(JobFailure::Crashed { reason })
            });

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(reason) => {
                remove_partial(&output_path).await;
                JobOutcome::Failed { reason }
            }
        };

        Finished {
            segment,
            attempt,
            outcome,
        }
    }

    async fn execute(&self, job: TranscodeJob, attempt: u32) -> Result<JobOutcome, JobFailure> {
        let index = job.segment().index;

        // Pending: wait for a worker slot unless the run is cancelled first.
        let _permit = match &self.semaphore {
            Some(semaphore) => {
                let acquired = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(JobFailure::Cancelled),
                    permit = Arc::clone(semaphore).acquire_owned() => permit,
                };
                Some(acquired.map_err(|e| JobFailure::Crashed {
                    reason: format!("worker pool closed: {}", e),
                })?)
            }
            None => None,
        };
        if self.cancel.is_cancelled() {
            return Err(JobFailure::Cancelled);
        }

        if let Some(mut state) = self.board.get_mut(&index) {
            if let Ok(running) = state.advance(JobState::Running) {
                *state = running;
            }
        }
        self.relay.job_started(*job.segment(), attempt);

        let relay = self.relay.clone();
        let outcome = job
            .run(
                self.engine.as_ref(),
                move |event| relay.progress(event),
                &self.cancel,
            )
            .await;
        Ok(outcome)
    }
}
