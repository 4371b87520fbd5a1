//! Fakes shared by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use shorts_studio::error::{StudioError, StudioResult};
use shorts_studio::ports::{
    EngineEvent, EngineEvents, ProbePort, ProgressSink, TranscodePort, TranscodeRequest,
    VideoSourcePort,
};
use shorts_studio::{JobOutcome, ProgressEvent, SegmentDescriptor};

/// What the fake engine does for one segment
#[derive(Debug, Clone)]
pub enum Script {
    /// Report progress in `steps`, write the clip, then complete
    Succeed { steps: u32, step_delay: Duration },
    /// Report some progress, then fail with `reason`
    Fail { reason: String },
    /// Fail the first `failures` attempts, then succeed
    Flaky { failures: usize },
    /// Emit nothing until cancelled
    Hang,
    /// Panic inside `invoke`
    Panic,
    /// Report completion without writing anything
    CompleteWithoutOutput,
}

impl Script {
    pub fn quick() -> Self {
        Script::Succeed {
            steps: 4,
            step_delay: Duration::from_millis(5),
        }
    }
}

/// Scriptable [`TranscodePort`] that records concurrency and invocations
pub struct FakeEngine {
    scripts: HashMap<usize, Script>,
    fallback: Script,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    invocations: Mutex<Vec<usize>>,
}

impl FakeEngine {
    pub fn new(fallback: Script) -> Self {
        Self {
            scripts: HashMap::new(),
            fallback,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_script(mut self, index: usize, script: Script) -> Self {
        self.scripts.insert(index, script);
        self
    }

    /// Highest number of invocations seen running at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Segment indices in invocation order, retries included
    pub fn invocations(&self) -> Vec<usize> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, index: usize) -> usize {
        self.invocations().iter().filter(|&&i| i == index).count()
    }
}

/// `subclip_3.mp4` -> 2
pub fn segment_index(path: &Path) -> usize {
    let name = path.file_stem().unwrap().to_string_lossy();
    let number: usize = name.trim_start_matches("subclip_").parse().unwrap();
    number - 1
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TranscodePort for FakeEngine {
    fn invoke(&self, request: TranscodeRequest, cancel: CancellationToken) -> EngineEvents {
        let index = segment_index(&request.output_path);
        let attempt = {
            let mut invocations = self.invocations.lock().unwrap();
            invocations.push(index);
            invocations.iter().filter(|&&i| i == index).count()
        };
        let mut script = self.scripts.get(&index).unwrap_or(&self.fallback).clone();
        if let Script::Flaky { failures } = script {
            script = if attempt <= failures {
                Script::Fail {
                    reason: format!("flaky attempt {}", attempt),
                }
            } else {
                Script::quick()
            };
        }
        if let Script::Panic = script {
            panic!("engine exploded on segment {}", index);
        }

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let guard = ActiveGuard(Arc::clone(&self.active));

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let _guard = guard;
            let length = request.length_seconds;
            match script {
                Script::Succeed { steps, step_delay } => {
                    for step in 1..=steps {
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            _ = tokio::time::sleep(step_delay) => {}
                        }
                        let processed_seconds = length * step as f64 / steps as f64;
                        let _ = tx.send(EngineEvent::Progress { processed_seconds }).await;
                    }
                    std::fs::write(&request.output_path, b"fake mp4").unwrap();
                    let _ = tx.send(EngineEvent::Completed).await;
                }
                Script::Fail { reason } => {
                    std::fs::write(&request.output_path, b"partial").unwrap();
                    let _ = tx
                        .send(EngineEvent::Progress {
                            processed_seconds: length / 2.0,
                        })
                        .await;
                    let _ = tx.send(EngineEvent::Failed { reason }).await;
                }
                Script::Hang => {
                    std::fs::write(&request.output_path, b"partial").unwrap();
                    cancel.cancelled().await;
                }
                Script::CompleteWithoutOutput => {
                    let _ = tx.send(EngineEvent::Completed).await;
                }
                Script::Flaky { .. } | Script::Panic => unreachable!(),
            }
        });
        Box::pin(ReceiverStream::new(rx))
    }
}

/// One call observed by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Started { index: usize, attempt: u32 },
    Progress(ProgressEvent),
    Done { index: usize, outcome: JobOutcome },
}

/// Sink keeping every call in arrival order
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<Call>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, index: usize) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| match call {
                Call::Started { index: i, .. } | Call::Done { index: i, .. } => *i == index,
                Call::Progress(event) => event.segment_index == index,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn on_job_started(&self, segment: &SegmentDescriptor, attempt: u32) {
        self.calls.lock().unwrap().push(Call::Started {
            index: segment.index,
            attempt,
        });
    }

    fn on_progress(&self, event: &ProgressEvent) {
        self.calls.lock().unwrap().push(Call::Progress(*event));
    }

    fn on_job_done(&self, segment_index: usize, outcome: &JobOutcome) {
        self.calls.lock().unwrap().push(Call::Done {
            index: segment_index,
            outcome: outcome.clone(),
        });
    }
}

/// Probe answering a fixed duration
pub struct FixedProbe(pub f64);

#[async_trait]
impl ProbePort for FixedProbe {
    async fn probe_duration(&self, file_path: &Path) -> StudioResult<f64> {
        if file_path.exists() {
            Ok(self.0)
        } else {
            Err(StudioError::Probe {
                path: file_path.to_path_buf(),
                message: "missing".to_string(),
            })
        }
    }
}

/// Source that "downloads" by writing a stub file into the work dir
#[derive(Default)]
pub struct StubDownloadSource {
    pub fetched_into: Mutex<Option<PathBuf>>,
}

#[async_trait]
impl VideoSourcePort for StubDownloadSource {
    async fn fetch(&self, locator: &str, work_dir: &Path) -> StudioResult<PathBuf> {
        if !locator.starts_with("https://") {
            return Err(StudioError::Fetch {
                locator: locator.to_string(),
                message: "unsupported locator".to_string(),
            });
        }
        let path = work_dir.join("video.mp4");
        tokio::fs::write(&path, b"downloaded").await?;
        *self.fetched_into.lock().unwrap() = Some(work_dir.to_path_buf());
        Ok(path)
    }
}

/// Source that never finishes
pub struct StalledSource;

#[async_trait]
impl VideoSourcePort for StalledSource {
    async fn fetch(&self, _locator: &str, _work_dir: &Path) -> StudioResult<PathBuf> {
        std::future::pending().await
    }
}
