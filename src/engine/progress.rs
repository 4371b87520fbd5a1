//! Progress delivery from running jobs to a [`ProgressSink`]
//!
//! Jobs never call the sink directly. They post messages to a relay that a
//! single blocking thread drains, so a slow sink only delays rendering.

use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::domain::model::{JobOutcome, ProgressEvent, SegmentDescriptor};
use crate::ports::ProgressSink;

enum RelayMessage {
    Started {
        segment: SegmentDescriptor,
        attempt: u32,
    },
    Progress(ProgressEvent),
    Done {
        segment_index: usize,
        outcome: JobOutcome,
    },
}

/// Sending half of the relay, cheap to clone into every job
#[derive(Clone)]
pub struct ProgressRelay {
    tx: mpsc::UnboundedSender<RelayMessage>,
    queued_progress: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
    backlog: usize,
}

impl ProgressRelay {
    /// Start the delivery thread for `sink`.
    ///
    /// At most `backlog` progress events wait undelivered; further ones
    /// are dropped until the sink catches up. Lifecycle messages are
    /// never dropped. The returned handle resolves once every clone of
    /// the relay is gone and the queue is drained.
    pub fn spawn(sink: Arc<dyn ProgressSink>, backlog: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let queued_progress = Arc::new(AtomicUsize::new(0));
        let queued = Arc::clone(&queued_progress);

        let handle = tokio::task::spawn_blocking(move || {
            while let Some(message) = rx.blocking_recv() {
                let is_progress = matches!(message, RelayMessage::Progress(_));
                deliver(sink.as_ref(), &message);
                if is_progress {
                    queued.fetch_sub(1, Ordering::AcqRel);
                }
            }
        });

        let relay = Self {
            tx,
            queued_progress,
            dropped: Arc::new(AtomicUsize::new(0)),
            backlog: backlog.max(1),
        };
        (relay, handle)
    }

    pub fn job_started(&self, segment: SegmentDescriptor, attempt: u32) {
        let _ = self.tx.send(RelayMessage::Started { segment, attempt });
    }

    pub fn progress(&self, event: ProgressEvent) {
        let queued = self.queued_progress.fetch_add(1, Ordering::AcqRel);
        if queued >= self.backlog {
            self.queued_progress.fetch_sub(1, Ordering::AcqRel);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if self.tx.send(RelayMessage::Progress(event)).is_err() {
            self.queued_progress.fetch_sub(1, Ordering::AcqRel);
        }
    }

    pub fn job_done(&self, segment_index: usize, outcome: JobOutcome) {
        let _ = self.tx.send(RelayMessage::Done {
            segment_index,
            outcome,
        });
    }

    /// Progress events discarded so far because the sink lagged
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn deliver(sink: &dyn ProgressSink, message: &RelayMessage) {
    let delivered = std::panic::catch_unwind(AssertUnwindSafe(|| match message {
        RelayMessage::Started { segment, attempt } => sink.on_job_started(segment, *attempt),
        RelayMessage::Progress(event) => sink.on_progress(event),
        RelayMessage::Done {
            segment_index,
            outcome,
        } => sink.on_job_done(*segment_index, outcome),
    }));
    if delivered.is_err() {
        warn!("Progress sink panicked, event skipped");
    }
}

/// Sink writing one JSON object per line, for machine consumers
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
    include_progress: bool,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonEvent<'a> {
    Started {
        segment: usize,
        start_seconds: f64,
        length_seconds: f64,
        attempt: u32,
    },
    Progress {
        segment: usize,
        processed_seconds: f64,
    },
    Done {
        segment: usize,
        #[serde(flatten)]
        outcome: &'a JobOutcome,
    },
}

impl JsonLinesSink<std::io::Stderr> {
    /// Events on stderr, leaving stdout to the final report
    pub fn stderr(include_progress: bool) -> Self {
        Self::new(std::io::stderr(), include_progress)
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W, include_progress: bool) -> Self {
        Self {
            out: Mutex::new(out),
            include_progress,
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn emit(&self, event: &JsonEvent<'_>) {
        let mut record = match serde_json::to_value(event) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Could not serialize progress event");
                return;
            }
        };
        if let Some(object) = record.as_object_mut() {
            object.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", record);
            let _ = out.flush();
        }
    }
}

impl<W: Write + Send> ProgressSink for JsonLinesSink<W> {
    fn on_job_started(&self, segment: &SegmentDescriptor, attempt: u32) {
        self.emit(&JsonEvent::Started {
            segment: segment.index,
            start_seconds: segment.start_seconds,
            length_seconds: segment.length_seconds,
            attempt,
        });
    }

    fn on_progress(&self, event: &ProgressEvent) {
        if self.include_progress {
            self.emit(&JsonEvent::Progress {
                segment: event.segment_index,
                processed_seconds: event.processed_seconds,
            });
        }
    }

    fn on_job_done(&self, segment_index: usize, outcome: &JobOutcome) {
        self.emit(&JsonEvent::Done {
            segment: segment_index,
            outcome,
        });
    }
}
