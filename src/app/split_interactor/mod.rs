// Split interactor - Orchestrates the fetch, probe, plan, transcode use case

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::model::*;
use crate::domain::rules::OutputDirRule;
use crate::engine::BatchSupervisor;
use crate::error::{StudioError, StudioResult};
use crate::planner::SegmentPlanner;
use crate::ports::*;

/// Everything needed to turn one video into shorts
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRequest {
    /// Local file path or URL of the source video
    pub locator: String,
    pub output_dir: PathBuf,
    pub segment_length: f64,
}

/// Outcome of a run that got as far as transcoding
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub source: String,
    pub asset: MediaAsset,
    pub output_dir: PathBuf,
    pub plan: SegmentPlan,
    pub batch: BatchResult,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SplitReport {
    pub fn status(&self) -> BatchStatus {
        self.batch.status()
    }
}

/// Interactor for the split use case
pub struct SplitInteractor {
    source_port: Arc<dyn VideoSourcePort>,
    probe_port: Arc<dyn ProbePort>,
    fs_port: Arc<dyn FsPort>,
    supervisor: Arc<BatchSupervisor>,
}

impl SplitInteractor {
    /// Create new split interactor with injected ports
    pub fn new(
        source_port: Arc<dyn VideoSourcePort>,
        probe_port: Arc<dyn ProbePort>,
        fs_port: Arc<dyn FsPort>,
        supervisor: Arc<BatchSupervisor>,
    ) -> Self {
        Self {
            source_port,
            probe_port,
            fs_port,
            supervisor,
        }
    }

    /// Run the whole pipeline.
    ///
    /// Errors mean no segment was attempted. Once transcoding starts the
    /// run always produces a report, even if every segment failed.
    pub async fn execute(
        &self,
        request: SplitRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> StudioResult<SplitReport> {
        let started_at = Utc::now();
        let planner = SegmentPlanner::new(request.segment_length)?;
        info!(source = %request.locator, output = %request.output_dir.display(), "Starting split");
        reject_source_inside_output(&request)?;

        self.fs_port.prepare_output_dir(&request.output_dir).await?;

        // Downloads land next to the clips and vanish with the work dir.
        let work_dir = tempfile::Builder::new()
            .prefix(OutputDirRule::WORK_DIR_PREFIX)
            .tempdir_in(&request.output_dir)
            .map_err(|e| StudioError::OutputDir {
                path: request.output_dir.clone(),
                message: format!("cannot create work directory: {}", e),
            })?;

        let source_path = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StudioError::Cancelled),
            fetched = self.source_port.fetch(&request.locator, work_dir.path()) => fetched?,
        };

        let duration = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StudioError::Cancelled),
            probed = self.probe_port.probe_duration(&source_path) => probed?,
        };
        let asset = MediaAsset::new(source_path, duration);
        let plan = planner.plan(asset.duration_seconds)?;

        if plan.is_empty() {
            warn!(
                duration,
                segment_length = request.segment_length,
                "Video is shorter than one segment, nothing to produce"
            );
        }

        let batch = self
            .supervisor
            .run_batch(&asset, &plan, &request.output_dir, sink, &cancel)
            .await;

        if let Err(e) = work_dir.close() {
            warn!(error = %e, "Could not remove work directory");
        }

        Ok(SplitReport {
            source: request.locator,
            asset,
            output_dir: request.output_dir,
            plan,
            batch,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Emptying the output directory must never delete the source itself
fn reject_source_inside_output(request: &SplitRequest) -> StudioResult<()> {
    let source = Path::new(&request.locator);
    let (Ok(source), Ok(output_dir)) = (source.canonicalize(), request.output_dir.canonicalize())
    else {
        return Ok(());
    };
    if source.starts_with(&output_dir) {
        return Err(StudioError::OutputDir {
            path: request.output_dir.clone(),
            message: format!("contains the source video {}", source.display()),
        });
    }
    Ok(())
}
