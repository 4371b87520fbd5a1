// Domain models - Core types and data structures

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::JobFailure;

/// A probed local media file.
///
/// Created once per run after acquisition and never mutated; every
/// transcode job reads it concurrently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub duration_seconds: f64,
}

impl MediaAsset {
    pub fn new(path: impl Into<PathBuf>, duration_seconds: f64) -> Self {
        Self {
            path: path.into(),
            duration_seconds,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One fixed-length window of the source, extracted as its own clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    pub index: usize,
    pub start_seconds: f64,
    pub length_seconds: f64,
}

impl SegmentDescriptor {
    /// End of the window in source time
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.length_seconds
    }

    /// File name of the clip, numbered from 1
    pub fn output_file_name(&self) -> String {
        format!("subclip_{}.mp4", self.index + 1)
    }

    /// Full output path for this segment inside `output_dir`
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.output_file_name())
    }
}

/// Ordered, contiguous partition of a source into equal segments.
///
/// Only the planner builds plans, so `segments[i].index == i` and
/// `segments[i].start_seconds == i * segment_length` always hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPlan {
    segment_length: f64,
    segments: Vec<SegmentDescriptor>,
}

impl SegmentPlan {
    pub(crate) fn from_parts(segment_length: f64, segments: Vec<SegmentDescriptor>) -> Self {
        Self {
            segment_length,
            segments,
        }
    }

    pub fn segment_length(&self) -> f64 {
        self.segment_length
    }

    pub fn segments(&self) -> &[SegmentDescriptor] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SegmentDescriptor> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SegmentDescriptor> {
        self.segments.get(index)
    }

    /// Seconds of source covered by the plan
    pub fn covered_seconds(&self) -> f64 {
        self.segments.len() as f64 * self.segment_length
    }

    /// Trailing seconds of `duration` that no segment covers
    pub fn dropped_seconds(&self, duration: f64) -> f64 {
        (duration - self.covered_seconds()).max(0.0)
    }
}

impl<'a> IntoIterator for &'a SegmentPlan {
    type Item = &'a SegmentDescriptor;
    type IntoIter = std::slice::Iter<'a, SegmentDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

/// Incremental progress of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub segment_index: usize,
    /// Seconds of the segment already encoded, never above the segment length
    pub processed_seconds: f64,
}

/// Terminal result of one transcode job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded { output_path: PathBuf },
    Failed { reason: JobFailure },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. })
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match self {
            JobOutcome::Failed { reason } => Some(reason),
            JobOutcome::Succeeded { .. } => None,
        }
    }
}

/// Lifecycle of a job: `Pending -> Running -> {Succeeded | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Move to `next`, refusing any backward or skipping transition.
    ///
    /// `Pending -> Failed` is allowed: a job cancelled before it got a
    /// worker slot never runs.
    pub fn advance(self, next: JobState) -> Result<JobState, InvalidTransition> {
        let allowed = matches!(
            (self, next),
            (JobState::Pending, JobState::Running)
                | (JobState::Pending, JobState::Failed)
                | (JobState::Running, JobState::Succeeded)
                | (JobState::Running, JobState::Failed)
        );
        if allowed {
            Ok(next)
        } else {
            Err(InvalidTransition { from: self, to: next })
        }
    }
}

impl From<&JobOutcome> for JobState {
    fn from(outcome: &JobOutcome) -> Self {
        if outcome.is_success() {
            JobState::Succeeded
        } else {
            JobState::Failed
        }
    }
}

/// Rejected job state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: JobState,
    pub to: JobState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid job transition {:?} -> {:?}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// Aggregate verdict over a finished batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every planned segment succeeded (vacuously true for an empty plan)
    Succeeded,
    /// At least one segment succeeded and at least one failed
    PartiallySucceeded,
    /// Segments were planned and none succeeded
    Failed,
}

/// Mutable accumulator the supervisor fills while jobs finish.
#[derive(Debug)]
pub struct BatchResultBuilder {
    planned: usize,
    outcomes: BTreeMap<usize, JobOutcome>,
}

impl BatchResultBuilder {
    pub fn new(planned: usize) -> Self {
        Self {
            planned,
            outcomes: BTreeMap::new(),
        }
    }

    /// Record the terminal outcome of `index`. Each index is written once.
    pub fn record(&mut self, index: usize, outcome: JobOutcome) -> Result<(), DuplicateOutcome> {
        if self.outcomes.contains_key(&index) {
            return Err(DuplicateOutcome { index });
        }
        self.outcomes.insert(index, outcome);
        Ok(())
    }

    pub fn recorded(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.len() == self.planned
    }

    /// Freeze the result.
    pub fn finish(self) -> BatchResult {
        let succeeded = self.outcomes.values().filter(|o| o.is_success()).count();
        let failed = self.outcomes.len() - succeeded;
        BatchResult {
            planned: self.planned,
            succeeded,
            failed,
            outcomes: self.outcomes,
        }
    }
}

/// Second outcome reported for the same segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateOutcome {
    pub index: usize,
}

impl fmt::Display for DuplicateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment {} already has an outcome", self.index)
    }
}

impl std::error::Error for DuplicateOutcome {}

/// Frozen per-segment outcomes of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    planned: usize,
    succeeded: usize,
    failed: usize,
    outcomes: BTreeMap<usize, JobOutcome>,
}

impl BatchResult {
    /// Result of a batch with nothing to do
    pub fn empty() -> Self {
        BatchResultBuilder::new(0).finish()
    }

    pub fn planned(&self) -> usize {
        self.planned
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded
    }

    pub fn failed_count(&self) -> usize {
        self.failed
    }

    pub fn outcome(&self, index: usize) -> Option<&JobOutcome> {
        self.outcomes.get(&index)
    }

    pub fn outcomes(&self) -> &BTreeMap<usize, JobOutcome> {
        &self.outcomes
    }

    /// Failed segments with their reasons, in index order
    pub fn failures(&self) -> impl Iterator<Item = (usize, &JobFailure)> {
        self.outcomes
            .iter()
            .filter_map(|(index, outcome)| outcome.failure().map(|f| (*index, f)))
    }

    /// Paths of the clips that were written, in index order
    pub fn output_paths(&self) -> impl Iterator<Item = &Path> {
        self.outcomes.values().filter_map(|outcome| match outcome {
            JobOutcome::Succeeded { output_path } => Some(output_path.as_path()),
            JobOutcome::Failed { .. } => None,
        })
    }

    pub fn status(&self) -> BatchStatus {
        if self.failed == 0 {
            BatchStatus::Succeeded
        } else if self.succeeded == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::PartiallySucceeded
        }
    }
}

/// Target frame aspect ratio, e.g. 9:16 for portrait shorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CropAspect {
    pub width: u32,
    pub height: u32,
}

impl CropAspect {
    pub const PORTRAIT_9_16: CropAspect = CropAspect {
        width: 9,
        height: 16,
    };

    pub fn new(width: u32, height: u32) -> Result<Self, String> {
        if width == 0 || height == 0 {
            return Err(format!("aspect ratio terms must be positive: {}:{}", width, height));
        }
        Ok(Self { width, height })
    }
}

impl Default for CropAspect {
    fn default() -> Self {
        Self::PORTRAIT_9_16
    }
}

impl fmt::Display for CropAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for CropAspect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected W:H aspect ratio, got '{}'", s))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid aspect width '{}'", w))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid aspect height '{}'", h))?;
        Self::new(width, height)
    }
}

impl TryFrom<String> for CropAspect {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CropAspect> for String {
    fn from(aspect: CropAspect) -> Self {
        aspect.to_string()
    }
}

#[cfg(test)]
mod tests;
