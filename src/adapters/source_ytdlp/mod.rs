//! Remote source adapter backed by `yt-dlp`
//!
//! Downloads a single video into the run's work directory and reports the
//! final path that yt-dlp wrote after merging.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{StudioError, StudioResult};
use crate::ports::VideoSourcePort;
use crate::utils::process::{last_line, resolve_tool, run_tool};

/// Best video plus best audio, or the best single file
pub const DEFAULT_FORMAT: &str = "bv*+ba/b";

const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// `yt-dlp` based downloader
#[derive(Debug, Clone)]
pub struct YtDlpSource {
    ytdlp_path: PathBuf,
    format: String,
    timeout: Duration,
}

impl YtDlpSource {
    /// Use the given yt-dlp binary, or find one on `PATH`
    pub fn new(configured: Option<&Path>, format: Option<&str>) -> StudioResult<Self> {
        let ytdlp_path = resolve_tool(configured, "yt-dlp")?;
        debug!(path = %ytdlp_path.display(), "Using yt-dlp");
        Ok(Self {
            ytdlp_path,
            format: format.unwrap_or(DEFAULT_FORMAT).to_string(),
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        })
    }

    /// Whether `locator` looks like something yt-dlp should handle
    pub fn accepts(locator: &str) -> bool {
        let lower = locator.trim().to_ascii_lowercase();
        lower.starts_with("https://") || lower.starts_with("http://")
    }

    fn args(&self, locator: &str, work_dir: &Path) -> Vec<String> {
        let template = work_dir.join("video.%(ext)s");
        vec![
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--no-part".to_string(),
            "-f".to_string(),
            self.format.clone(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "-o".to_string(),
            template.display().to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            locator.to_string(),
        ]
    }
}

#[async_trait]
impl VideoSourcePort for YtDlpSource {
    async fn fetch(&self, locator: &str, work_dir: &Path) -> StudioResult<PathBuf> {
        if !Self::accepts(locator) {
            return Err(StudioError::fetch(locator, "not an http(s) URL"));
        }

        info!(url = locator, "Downloading video");
        let output = run_tool(&self.ytdlp_path, &self.args(locator, work_dir), self.timeout)
            .await
            .map_err(|e| StudioError::fetch(locator, format!("yt-dlp failed to run: {}", e)))?;

        if !output.status.success() {
            return Err(StudioError::fetch(
                locator,
                format!("yt-dlp exited with {}: {}", output.status, last_line(&output.stderr)),
            ));
        }

        let written = last_line(&output.stdout);
        if written.is_empty() {
            return Err(StudioError::fetch(locator, "yt-dlp did not report a file"));
        }
        let path = PathBuf::from(written);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {
                info!(path = %path.display(), bytes = meta.len(), "Video downloaded");
                Ok(path)
            }
            _ => Err(StudioError::fetch(
                locator,
                format!("downloaded file {} is missing or empty", path.display()),
            )),
        }
    }
}
