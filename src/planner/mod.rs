//! Segmentation planning
//!
//! Partitions a source duration into equal, contiguous windows. The final
//! partial remainder is dropped rather than emitted as a short clip.

use tracing::{debug, info};

use crate::domain::model::{SegmentDescriptor, SegmentPlan};
use crate::error::{StudioError, StudioResult};

/// Default segment length used by short-form platforms
pub const DEFAULT_SEGMENT_LENGTH: f64 = 50.0;

/// Shortest segment length a run configuration accepts
pub const MIN_SEGMENT_LENGTH: f64 = 1.0;

/// Upper bound on the number of segments a single plan may hold
pub const MAX_SEGMENTS: usize = 100_000;

/// Planner for a fixed segment length
#[derive(Debug, Clone, Copy)]
pub struct SegmentPlanner {
    segment_length: f64,
}

impl SegmentPlanner {
    /// Create a planner, rejecting zero, negative or non-finite lengths
    pub fn new(segment_length: f64) -> StudioResult<Self> {
        check_positive("segment length", segment_length)?;
        Ok(Self { segment_length })
    }

    pub fn segment_length(&self) -> f64 {
        self.segment_length
    }

    /// Plan the segments of a source lasting `duration_seconds`
    pub fn plan(&self, duration_seconds: f64) -> StudioResult<SegmentPlan> {
        check_positive("duration", duration_seconds)?;

        let count = (duration_seconds / self.segment_length).floor();
        if !count.is_finite() || count > MAX_SEGMENTS as f64 {
            return Err(StudioError::PlanningPrecondition {
                message: format!(
                    "{}s split into {}s segments exceeds the limit of {} segments",
                    duration_seconds, self.segment_length, MAX_SEGMENTS
                ),
            });
        }
        let count = count as usize;
        let segments: Vec<SegmentDescriptor> = (0..count)
            .map(|index| SegmentDescriptor {
                index,
                start_seconds: index as f64 * self.segment_length,
                length_seconds: self.segment_length,
            })
            .collect();

        let plan = SegmentPlan::from_parts(self.segment_length, segments);
        info!(
            duration = duration_seconds,
            segment_length = self.segment_length,
            segments = plan.len(),
            "Planned segmentation"
        );
        if plan.dropped_seconds(duration_seconds) > 0.0 {
            debug!(
                dropped = plan.dropped_seconds(duration_seconds),
                "Trailing partial segment dropped"
            );
        }
        Ok(plan)
    }
}

/// Plan `duration_seconds` into `segment_length` windows
pub fn plan(duration_seconds: f64, segment_length: f64) -> StudioResult<SegmentPlan> {
    SegmentPlanner::new(segment_length)?.plan(duration_seconds)
}

fn check_positive(name: &str, value: f64) -> StudioResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(StudioError::PlanningPrecondition {
            message: format!("{} must be a positive number of seconds, got {}", name, value),
        })
    }
}
