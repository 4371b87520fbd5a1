//! Single-segment transcode job
//!
//! Drives one engine invocation to exactly one [`JobOutcome`], translating
//! engine progress into monotone [`ProgressEvent`]s and guaranteeing that a
//! failed, cancelled or timed-out job leaves no clip behind.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::errors::JobFailure;
use crate::domain::model::{JobOutcome, MediaAsset, ProgressEvent, SegmentDescriptor};
use crate::domain::rules::ProgressRule;
use crate::ports::{EngineEvent, EngineEvents, TranscodePort, TranscodeRequest};

/// Default idle watchdog: no engine event for this long fails the job
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// How long a stopped engine gets to wind down before the job gives up on it
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(10);

/// Timing knobs for a job
#[derive(Debug, Clone, Copy)]
pub struct JobSettings {
    pub idle_timeout: Duration,
    pub cancel_grace: Duration,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            cancel_grace: DEFAULT_CANCEL_GRACE,
        }
    }
}

/// How the event loop ended
enum Verdict {
    Completed,
    EngineFailed(String),
    Unavailable(String),
    StreamEnded,
    Interrupted(JobFailure),
}

/// Transcode job for one segment of a source
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    segment: SegmentDescriptor,
    request: TranscodeRequest,
    settings: JobSettings,
}

impl TranscodeJob {
    /// Prepare the job for `segment`, writing into `output_dir`
    pub fn new(
        asset: &MediaAsset,
        segment: SegmentDescriptor,
        output_dir: &Path,
        crop_filter: impl Into<String>,
        settings: JobSettings,
    ) -> Self {
        debug_assert!(segment.length_seconds > 0.0, "segment without length");
        let request = TranscodeRequest {
            input_path: asset.path.clone(),
            start_seconds: segment.start_seconds,
            length_seconds: segment.length_seconds,
            crop_filter: crop_filter.into(),
            output_path: segment.output_path(output_dir),
        };
        Self {
            segment,
            request,
            settings,
        }
    }

    pub fn segment(&self) -> &SegmentDescriptor {
        &self.segment
    }

    pub fn output_path(&self) -> &Path {
        &self.request.output_path
    }

    /// Run the job to its terminal outcome.
    ///
    /// `on_progress` is called for every increase of the processed
    /// position, never after this future resolves.
    pub async fn run<F>(
        self,
        engine: &dyn TranscodePort,
        on_progress: F,
        cancel: &CancellationToken,
    ) -> JobOutcome
    where
        F: Fn(ProgressEvent) + Send + Sync,
    {
        let index = self.segment.index;
        if cancel.is_cancelled() {
            return JobOutcome::Failed {
                reason: JobFailure::Cancelled,
            };
        }

        debug!(
            segment = index,
            start = self.segment.start_seconds,
            length = self.segment.length_seconds,
            output = %self.request.output_path.display(),
            "Starting transcode job"
        );

        let engine_cancel = cancel.child_token();
        let mut events = engine.invoke(self.request.clone(), engine_cancel.clone());
        let verdict = self.pump(&mut events, &on_progress, cancel).await;

        match verdict {
            Verdict::Completed => self.finish_completed().await,
            Verdict::EngineFailed(reason) => {
                self.wind_down(&mut events).await;
                self.fail(JobFailure::Engine { reason }).await
            }
            Verdict::Unavailable(reason) => self.fail(JobFailure::Spawn { reason }).await,
            Verdict::StreamEnded => {
                self.fail(JobFailure::Crashed {
                    reason: "engine stopped without reporting an outcome".to_string(),
                })
                .await
            }
            Verdict::Interrupted(failure) => {
                engine_cancel.cancel();
                self.wind_down(&mut events).await;
                self.fail(failure).await
            }
        }
    }

    async fn pump<F>(
        &self,
        events: &mut EngineEvents,
        on_progress: &F,
        cancel: &CancellationToken,
    ) -> Verdict
    where
        F: Fn(ProgressEvent) + Send + Sync,
    {
        let idle = self.settings.idle_timeout;
        let length = self.segment.length_seconds;
        let mut processed = 0.0_f64;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Verdict::Interrupted(JobFailure::Cancelled);
                }
                next = tokio::time::timeout(idle, events.next()) => next,
            };

            match next {
                Err(_elapsed) => {
                    debug!(segment = self.segment.index, idle = ?idle, "Transcode job stalled");
                    return Verdict::Interrupted(JobFailure::Timeout { idle });
                }
                Ok(None) => return Verdict::StreamEnded,
                Ok(Some(EngineEvent::Progress { processed_seconds })) => {
                    let clamped = ProgressRule::clamp(processed, processed_seconds, length);
                    if clamped > processed {
                        processed = clamped;
                        on_progress(ProgressEvent {
                            segment_index: self.segment.index,
                            processed_seconds: processed,
                        });
                    }
                }
                Ok(Some(EngineEvent::Completed)) => return Verdict::Completed,
                Ok(Some(EngineEvent::Failed { reason })) => return Verdict::EngineFailed(reason),
                Ok(Some(EngineEvent::Unavailable { reason })) => {
                    return Verdict::Unavailable(reason);
                }
            }
        }
    }

    /// Let a stopped engine finish tearing down so nothing writes the
    /// output path after we clean it up.
    async fn wind_down(&self, events: &mut EngineEvents) {
        let drained = tokio::time::timeout(self.settings.cancel_grace, async {
            while events.next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                segment = self.segment.index,
                grace = ?self.settings.cancel_grace,
                "Engine did not stop within the grace period"
            );
        }
    }

    async fn finish_completed(&self) -> JobOutcome {
        let output_path = self.request.output_path.clone();
        match tokio::fs::metadata(&output_path).await {
            Ok(meta) if meta.is_file() => {
                debug!(
                    segment = self.segment.index,
                    output = %output_path.display(),
                    bytes = meta.len(),
                    "Sub-clip generated"
                );
                JobOutcome::Succeeded { output_path }
            }
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                self.fail(JobFailure::Io {
                    reason: format!("cannot read {}: {}", output_path.display(), e),
                })
                .await
            }
            _ => JobOutcome::Failed {
                reason: JobFailure::MissingOutput {
                    path: output_path.display().to_string(),
                },
            },
        }
    }

    async fn fail(&self, reason: JobFailure) -> JobOutcome {
        debug!(segment = self.segment.index, %reason, "Transcode job failed");
        remove_partial(&self.request.output_path).await;
        JobOutcome::Failed { reason }
    }
}

/// Delete whatever a failed job left at `path`
pub(crate) async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Could not remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures::stream;

    use super::*;

    /// Engine replaying a fixed script, optionally writing the output first
    struct ScriptEngine {
        events: Vec<EngineEvent>,
        write_output: bool,
        hang: bool,
    }

    impl TranscodePort for ScriptEngine {
        fn invoke(&self, request: TranscodeRequest, cancel: CancellationToken) -> EngineEvents {
            if self.write_output {
                std::fs::write(&request.output_path, b"clip").unwrap();
            }
            let scripted = stream::iter(self.events.clone());
            if self.hang {
                let tail = stream::once(async move {
                    cancel.cancelled().await;
                    EngineEvent::Failed {
                        reason: "killed".to_string(),
                    }
                });
                Box::pin(scripted.chain(tail))
            } else {
                Box::pin(scripted)
            }
        }
    }

    fn segment() -> SegmentDescriptor {
        SegmentDescriptor {
            index: 1,
            start_seconds: 50.0,
            length_seconds: 50.0,
        }
    }

    fn job(dir: &Path, settings: JobSettings) -> TranscodeJob {
        let asset = MediaAsset::new(dir.join("source.mp4"), 125.0);
        TranscodeJob::new(&asset, segment(), dir, "crop=ih*9/16:ih", settings)
    }

    fn collect() -> (Arc<Mutex<Vec<f64>>>, impl Fn(ProgressEvent) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |e: ProgressEvent| sink.lock().unwrap().push(e.processed_seconds))
    }

    #[tokio::test]
    async fn test_success_with_monotone_progress() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptEngine {
            events: vec![
                EngineEvent::Progress { processed_seconds: 10.0 },
                EngineEvent::Progress { processed_seconds: 8.0 },
                EngineEvent::Progress { processed_seconds: 30.0 },
                EngineEvent::Progress { processed_seconds: 50.2 },
                EngineEvent::Completed,
            ],
            write_output: true,
            hang: false,
        };
        let (seen, on_progress) = collect();
        let outcome = job(dir.path(), JobSettings::default())
            .run(&engine, on_progress, &CancellationToken::new())
            .await;

        assert_eq!(
            outcome,
            JobOutcome::Succeeded {
                output_path: dir.path().join("subclip_2.mp4")
            }
        );
        assert_eq!(*seen.lock().unwrap(), vec![10.0, 30.0, 50.0]);
    }

    #[tokio::test]
    async fn test_engine_error_fails_and_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptEngine {
            events: vec![
                EngineEvent::Progress { processed_seconds: 5.0 },
                EngineEvent::Failed {
                    reason: "No space left on device".to_string(),
                },
            ],
            write_output: true,
            hang: false,
        };
        let (_, on_progress) = collect();
        let outcome = job(dir.path(), JobSettings::default())
            .run(&engine, on_progress, &CancellationToken::new())
            .await;

        assert_eq!(
            outcome.failure(),
            Some(&JobFailure::engine("No space left on device"))
        );
        assert!(!dir.path().join("subclip_2.mp4").exists());
    }

    #[tokio::test]
    async fn test_unavailable_engine_is_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptEngine {
            events: vec![EngineEvent::Unavailable {
                reason: "ffmpeg: permission denied".to_string(),
            }],
            write_output: false,
            hang: false,
        };
        let (_, on_progress) = collect();
        let outcome = job(dir.path(), JobSettings::default())
            .run(&engine, on_progress, &CancellationToken::new())
            .await;
        let failure = outcome.failure().unwrap();
        assert!(matches!(failure, JobFailure::Spawn { .. }));
        assert!(!failure.is_retryable());
    }

    #[tokio::test]
    async fn test_completed_without_file_is_not_success() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptEngine {
            events: vec![EngineEvent::Completed],
            write_output: false,
            hang: false,
        };
        let (_, on_progress) = collect();
        let outcome = job(dir.path(), JobSettings::default())
            .run(&engine, on_progress, &CancellationToken::new())
            .await;
        assert!(matches!(
            outcome.failure(),
            Some(JobFailure::MissingOutput { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreadable_output_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("clips");
        std::fs::write(&not_a_dir, b"plain file").unwrap();
        let engine = ScriptEngine {
            events: vec![EngineEvent::Completed],
            write_output: false,
            hang: false,
        };
        let (_, on_progress) = collect();
        let outcome = job(&not_a_dir, JobSettings::default())
            .run(&engine, on_progress, &CancellationToken::new())
            .await;
        let failure = outcome.failure().unwrap();
        assert!(matches!(failure, JobFailure::Io { .. }), "{:?}", failure);
        assert!(failure.is_retryable());
    }

    #[tokio::test]
    async fn test_job_lifecycle_stays_below_info() {
        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = tempfile::tempdir().unwrap();
        for (events, write_output) in [
            (vec![EngineEvent::Completed], true),
            (
                vec![EngineEvent::Failed {
                    reason: "bad frame".to_string(),
                }],
                false,
            ),
        ] {
            let engine = ScriptEngine {
                events,
                write_output,
                hang: false,
            };
            let (_, on_progress) = collect();
            job(dir.path(), JobSettings::default())
                .run(&engine, on_progress, &CancellationToken::new())
                .await;
        }

        let logged = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logged.is_empty(), "unexpected log output: {}", logged);
    }

    #[tokio::test]
    async fn test_stream_end_without_outcome_is_crash() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptEngine {
            events: vec![EngineEvent::Progress { processed_seconds: 1.0 }],
            write_output: true,
            hang: false,
        };
        let (_, on_progress) = collect();
        let outcome = job(dir.path(), JobSettings::default())
            .run(&engine, on_progress, &CancellationToken::new())
            .await;
        assert!(matches!(outcome.failure(), Some(JobFailure::Crashed { .. })));
        assert!(!dir.path().join("subclip_2.mp4").exists());
    }

    #[tokio::test]
    async fn test_watchdog_times_out_stalled_engine() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptEngine {
            events: vec![EngineEvent::Progress { processed_seconds: 2.0 }],
            write_output: true,
            hang: true,
        };
        let settings = JobSettings {
            idle_timeout: Duration::from_millis(50),
            cancel_grace: Duration::from_secs(1),
        };
        let (_, on_progress) = collect();
        let outcome = job(dir.path(), settings)
            .run(&engine, on_progress, &CancellationToken::new())
            .await;
        assert_eq!(
            outcome.failure(),
            Some(&JobFailure::Timeout {
                idle: Duration::from_millis(50)
            })
        );
        assert!(!dir.path().join("subclip_2.mp4").exists());
    }

    #[tokio::test]
    async fn test_cancellation_reports_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptEngine {
            events: vec![],
            write_output: true,
            hang: true,
        };
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let (_, on_progress) = collect();
        let outcome = job(dir.path(), JobSettings::default())
            .run(&engine, on_progress, &cancel)
            .await;
        assert_eq!(outcome.failure(), Some(&JobFailure::Cancelled));
        assert!(!dir.path().join("subclip_2.mp4").exists());
    }

    #[tokio::test]
    async fn test_already_cancelled_never_invokes_engine() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptEngine {
            events: vec![EngineEvent::Completed],
            write_output: true,
            hang: false,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (_, on_progress) = collect();
        let outcome = job(dir.path(), JobSettings::default())
            .run(&engine, on_progress, &cancel)
            .await;
        assert_eq!(outcome.failure(), Some(&JobFailure::Cancelled));
        assert!(!dir.path().join("subclip_2.mp4").exists());
    }
}
