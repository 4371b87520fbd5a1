// Inspect interactor - Probes and plans a local file without transcoding

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::domain::model::*;
use crate::error::{StudioError, StudioResult};
use crate::planner::SegmentPlanner;
use crate::ports::*;
use crate::utils::format_file_size;
use crate::utils::time::TimeParser;

/// What a split of the file would produce
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub path: PathBuf,
    pub file_size: u64,
    pub duration_seconds: f64,
    pub segment_length: f64,
    pub plan: SegmentPlan,
    pub dropped_seconds: f64,
}

impl InspectReport {
    /// Format as human-readable text
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str("Media File Information:\n");
        output.push_str(&format!("  File: {}\n", self.path.display()));
        output.push_str(&format!("  File Size: {}\n", format_file_size(self.file_size)));
        output.push_str(&format!(
            "  Duration: {} ({:.3}s)\n",
            TimeParser::format_seconds(self.duration_seconds),
            self.duration_seconds
        ));
        output.push_str(&format!(
            "\nSegments of {}s ({}):\n",
            self.segment_length,
            self.plan.len()
        ));
        for segment in &self.plan {
            output.push_str(&format!(
                "  {}: {} - {}\n",
                segment.output_file_name(),
                TimeParser::format_seconds(segment.start_seconds),
                TimeParser::format_seconds(segment.end_seconds())
            ));
        }
        if self.dropped_seconds > 0.0 {
            output.push_str(&format!(
                "  Trailing {:.3}s are shorter than one segment and skipped\n",
                self.dropped_seconds
            ));
        }
        output
    }

    /// Format as pretty JSON
    pub fn to_json(&self) -> StudioResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StudioError::config(format!("JSON serialization failed: {}", e)))
    }

    /// Format as YAML
    pub fn to_yaml(&self) -> StudioResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| StudioError::config(format!("YAML serialization failed: {}", e)))
    }
}

/// Interactor for the inspect use case
pub struct InspectInteractor {
    probe_port: Arc<dyn ProbePort>,
    fs_port: Arc<dyn FsPort>,
}

impl InspectInteractor {
    /// Create new inspect interactor with injected ports
    pub fn new(probe_port: Arc<dyn ProbePort>, fs_port: Arc<dyn FsPort>) -> Self {
        Self {
            probe_port,
            fs_port,
        }
    }

    pub async fn execute(&self, path: &Path, segment_length: f64) -> StudioResult<InspectReport> {
        let planner = SegmentPlanner::new(segment_length)?;
        if !self.fs_port.file_exists(path).await? {
            return Err(StudioError::probe(path, "file does not exist"));
        }

        let file_size = tokio::fs::metadata(path).await?.len();
        let duration = self.probe_port.probe_duration(path).await?;
        let plan = planner.plan(duration)?;
        info!(path = %path.display(), segments = plan.len(), "Inspection completed");

        Ok(InspectReport {
            path: path.to_path_buf(),
            file_size,
            duration_seconds: duration,
            segment_length,
            dropped_seconds: plan.dropped_seconds(duration),
            plan,
        })
    }
}
