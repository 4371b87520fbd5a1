// Domain rules - Framing and reporting policies

use crate::domain::model::*;

/// Framing rule for portrait (or any other fixed aspect) output
pub struct CropRule;

impl CropRule {
    /// Build the engine crop filter for `aspect`.
    ///
    /// The crop is centered (the engine's default offset). Sources wider
    /// than the target keep their full height; narrower sources keep their
    /// full width. Both dimensions are rounded down to even values because
    /// 4:2:0 encoders reject odd frame sizes.
    pub fn filter(aspect: CropAspect) -> String {
        let (w, h) = (aspect.width, aspect.height);
        format!(
            "crop='trunc(min(iw,ih*{w}/{h})/2)*2':'trunc(min(ih,iw*{h}/{w})/2)*2'",
            w = w,
            h = h
        )
    }
}

/// Progress normalization rule
pub struct ProgressRule;

impl ProgressRule {
    /// Clamp a reported position into `[previous, length]`.
    ///
    /// Engines occasionally report a slightly earlier timestamp after a
    /// seek, or overshoot the requested duration by a frame; observers must
    /// see a non-decreasing value that never exceeds the segment length.
    pub fn clamp(previous: f64, reported: f64, length: f64) -> f64 {
        if !reported.is_finite() {
            return previous;
        }
        reported.min(length).max(previous)
    }
}

/// Which entries of an output directory belong to this tool
pub struct OutputDirRule;

impl OutputDirRule {
    /// Name prefix of the per-run download directory
    pub const WORK_DIR_PREFIX: &'static str = ".fetch-";

    /// Clips (`subclip_N.mp4`) and leftover work directories may be
    /// cleared; anything else makes the directory off limits.
    pub fn is_owned_entry(name: &str) -> bool {
        if name.starts_with(Self::WORK_DIR_PREFIX) {
            return true;
        }
        name.strip_prefix("subclip_")
            .and_then(|rest| rest.strip_suffix(".mp4"))
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }
}

/// Process exit status policy for a finished run
pub struct ExitStatusRule;

impl ExitStatusRule {
    /// Nothing could be produced (fatal error or every segment failed)
    pub const FAILURE: u8 = 1;
    /// Some segments succeeded, some failed
    pub const PARTIAL: u8 = 2;

    pub fn for_status(status: BatchStatus) -> u8 {
        match status {
            BatchStatus::Succeeded => 0,
            BatchStatus::PartiallySucceeded => Self::PARTIAL,
            BatchStatus::Failed => Self::FAILURE,
        }
    }
}
