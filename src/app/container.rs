use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::adapters::{AppConfig, AutoSource, FFmpegAdapter, FsLocalAdapter, YtDlpSource};
use crate::app::{inspect_interactor::InspectInteractor, split_interactor::SplitInteractor};
use crate::engine::{BatchSupervisor, SupervisorConfig};
use crate::error::StudioResult;
use crate::ports::{FsPort, ProbePort, TranscodePort, VideoSourcePort};

pub trait AppContainer: Send + Sync {
    fn split_interactor(&self) -> StudioResult<SplitInteractor>;
    fn inspect_interactor(&self) -> StudioResult<InspectInteractor>;
}

/// Wires the production adapters from an [`AppConfig`].
///
/// Adapters are built per use case so `inspect` works without ffmpeg or
/// yt-dlp installed.
pub struct DefaultAppContainer {
    config: AppConfig,
    fs_port: Arc<dyn FsPort>,
}

impl DefaultAppContainer {
    pub fn new(config: AppConfig) -> StudioResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fs_port: Arc::new(FsLocalAdapter::new()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn probe_port(&self) -> StudioResult<Arc<dyn ProbePort>> {
        #[cfg(feature = "libav")]
        let probe: Arc<dyn ProbePort> = Arc::new(crate::adapters::ProbeLibavAdapter::new()?);
        #[cfg(not(feature = "libav"))]
        let probe: Arc<dyn ProbePort> = Arc::new(crate::adapters::FFprobeAdapter::new(Some(
            self.config.ffprobe_path.as_path(),
        ))?);
        Ok(probe)
    }

    fn source_port(&self) -> Arc<dyn VideoSourcePort> {
        let remote = match YtDlpSource::new(
            Some(self.config.ytdlp_path.as_path()),
            Some(self.config.ytdlp_format.as_str()),
        ) {
            Ok(source) => Some(Arc::new(source) as Arc<dyn VideoSourcePort>),
            Err(e) => {
                debug!(error = %e, "Remote downloads unavailable");
                None
            }
        };
        Arc::new(AutoSource::new(remote))
    }

    fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            crop_aspect: self.config.crop_aspect,
            ..SupervisorConfig::default()
        }
        .with_max_concurrent_jobs(self.config.max_concurrent_jobs)
        .with_max_attempts(self.config.max_attempts)
        .with_idle_timeout(Duration::from_secs(self.config.job_timeout_seconds))
    }
}

impl AppContainer for DefaultAppContainer {
    fn split_interactor(&self) -> StudioResult<SplitInteractor> {
        let engine: Arc<dyn TranscodePort> =
            Arc::new(FFmpegAdapter::new(Some(self.config.ffmpeg_path.as_path()))?);
        let supervisor = Arc::new(BatchSupervisor::new(engine, self.supervisor_config()));
        Ok(SplitInteractor::new(
            self.source_port(),
            self.probe_port()?,
            Arc::clone(&self.fs_port),
            supervisor,
        ))
    }

    fn inspect_interactor(&self) -> StudioResult<InspectInteractor> {
        Ok(InspectInteractor::new(
            self.probe_port()?,
            Arc::clone(&self.fs_port),
        ))
    }
}
