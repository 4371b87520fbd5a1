//! Terminal progress bars, one per running segment

use std::collections::HashMap;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::domain::model::{JobOutcome, ProgressEvent, SegmentDescriptor};
use crate::ports::ProgressSink;

const BAR_TEMPLATE: &str =
    "{prefix:>14} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {wide_msg}";

/// [`ProgressSink`] drawing an `indicatif` bar per segment.
///
/// Bars count milliseconds of the segment encoded.
pub struct ProgressBars {
    multi: MultiProgress,
    bars: Mutex<HashMap<usize, ProgressBar>>,
    style: ProgressStyle,
}

impl Default for ProgressBars {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBars {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    pub fn with_multi(multi: MultiProgress) -> Self {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
            style,
        }
    }

    fn with_bar(&self, index: usize, f: impl FnOnce(&ProgressBar)) {
        if let Ok(bars) = self.bars.lock() {
            if let Some(bar) = bars.get(&index) {
                f(bar);
            }
        }
    }

    /// Print a line above the bars without tearing them
    pub fn println(&self, line: impl AsRef<str>) {
        let _ = self.multi.println(line);
    }
}

impl ProgressSink for ProgressBars {
    fn on_job_started(&self, segment: &SegmentDescriptor, attempt: u32) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        let length_ms = (segment.length_seconds * 1000.0).round().max(1.0) as u64;
        let bar = bars.entry(segment.index).or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new(length_ms));
            bar.set_style(self.style.clone());
            bar.set_prefix(segment.output_file_name());
            bar
        });
        bar.reset();
        bar.set_length(length_ms);
        if attempt > 1 {
            bar.set_message(format!("attempt {}", attempt));
        } else {
            bar.set_message("encoding");
        }
    }

    fn on_progress(&self, event: &ProgressEvent) {
        let position = (event.processed_seconds * 1000.0).round() as u64;
        self.with_bar(event.segment_index, |bar| bar.set_position(position));
    }

    fn on_job_done(&self, segment_index: usize, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Succeeded { .. } => self.with_bar(segment_index, |bar| {
                bar.set_position(bar.length().unwrap_or(0));
                bar.finish_with_message("done");
            }),
            JobOutcome::Failed { reason } => {
                let mut drawn = false;
                self.with_bar(segment_index, |bar| {
                    bar.abandon_with_message(format!("failed: {}", reason));
                    drawn = true;
                });
                // Jobs cancelled while pending never got a bar.
                if !drawn {
                    self.println(format!(
                        "subclip_{}.mp4 failed: {}",
                        segment_index + 1,
                        reason
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    use crate::domain::errors::JobFailure;

    fn hidden() -> ProgressBars {
        ProgressBars::with_multi(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()))
    }

    fn segment(index: usize) -> SegmentDescriptor {
        SegmentDescriptor {
            index,
            start_seconds: index as f64 * 50.0,
            length_seconds: 50.0,
        }
    }

    #[test]
    fn test_bar_follows_job_lifecycle() {
        let bars = hidden();
        bars.on_job_started(&segment(0), 1);
        bars.on_progress(&ProgressEvent {
            segment_index: 0,
            processed_seconds: 12.5,
        });
        bars.with_bar(0, |bar| assert_eq!(bar.position(), 12_500));

        bars.on_job_done(
            0,
            &JobOutcome::Succeeded {
                output_path: "subclip_1.mp4".into(),
            },
        );
        bars.with_bar(0, |bar| {
            assert!(bar.is_finished());
            assert_eq!(bar.position(), 50_000);
        });
    }

    #[test]
    fn test_retry_resets_bar() {
        let bars = hidden();
        bars.on_job_started(&segment(2), 1);
        bars.on_progress(&ProgressEvent {
            segment_index: 2,
            processed_seconds: 30.0,
        });
        bars.on_job_started(&segment(2), 2);
        bars.with_bar(2, |bar| assert_eq!(bar.position(), 0));
        assert_eq!(bars.bars.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failure_without_bar_does_not_panic() {
        let bars = hidden();
        bars.on_progress(&ProgressEvent {
            segment_index: 7,
            processed_seconds: 1.0,
        });
        bars.on_job_done(
            7,
            &JobOutcome::Failed {
                reason: JobFailure::Cancelled,
            },
        );
    }
}
