// Probe LibAV adapter - Media duration using linked libav

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ffmpeg_next as ffmpeg;
use tracing::info;

use crate::error::{StudioError, StudioResult};
use crate::ports::ProbePort;

/// LibAV-based media probing adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeLibavAdapter;

impl ProbeLibavAdapter {
    /// Initialize libav once for this process
    pub fn new() -> StudioResult<Self> {
        ffmpeg::init().map_err(|e| StudioError::config(format!("libav init failed: {}", e)))?;
        Ok(Self)
    }

    fn read_duration(path: &Path) -> StudioResult<f64> {
        let ictx = ffmpeg::format::input(&path)
            .map_err(|e| StudioError::probe(path, format!("cannot open container: {}", e)))?;

        let raw = ictx.duration();
        if raw == ffmpeg::ffi::AV_NOPTS_VALUE || raw <= 0 {
            return Err(StudioError::probe(path, "container reports no duration"));
        }
        Ok(raw as f64 / ffmpeg::ffi::AV_TIME_BASE as f64)
    }
}

#[async_trait]
impl ProbePort for ProbeLibavAdapter {
    async fn probe_duration(&self, file_path: &Path) -> StudioResult<f64> {
        if !file_path.is_file() {
            return Err(StudioError::probe(file_path, "file does not exist"));
        }

        let path: PathBuf = file_path.to_path_buf();
        let duration = tokio::task::spawn_blocking(move || Self::read_duration(&path))
            .await
            .map_err(|e| StudioError::probe(file_path, format!("probe task failed: {}", e)))??;

        info!(path = %file_path.display(), duration, "Probed media duration with libav");
        Ok(duration)
    }
}
