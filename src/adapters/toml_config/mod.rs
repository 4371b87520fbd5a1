// TOML config adapter - Run configuration stored in a `[studio]` table

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapters::source_ytdlp::DEFAULT_FORMAT;
use crate::domain::model::CropAspect;
use crate::error::{StudioError, StudioResult};
use crate::planner::{DEFAULT_SEGMENT_LENGTH, MIN_SEGMENT_LENGTH};

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "shorts-studio.toml";

/// Effective settings of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub segment_length_seconds: f64,
    pub crop_aspect: CropAspect,
    pub output_dir: PathBuf,
    pub max_concurrent_jobs: usize,
    /// Idle watchdog per job; a job silent for this long is failed
    pub job_timeout_seconds: u64,
    pub max_attempts: u32,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub ytdlp_path: PathBuf,
    pub ytdlp_format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            segment_length_seconds: DEFAULT_SEGMENT_LENGTH,
            crop_aspect: CropAspect::PORTRAIT_9_16,
            output_dir: default_output_dir(),
            max_concurrent_jobs: num_cpus::get().max(1),
            job_timeout_seconds: 300,
            max_attempts: 1,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            ytdlp_path: PathBuf::from("yt-dlp"),
            ytdlp_format: DEFAULT_FORMAT.to_string(),
        }
    }
}

impl AppConfig {
    /// Reject values no run could work with
    pub fn validate(&self) -> StudioResult<()> {
        if !(self.segment_length_seconds.is_finite()
            && self.segment_length_seconds >= MIN_SEGMENT_LENGTH)
        {
            return Err(StudioError::config(format!(
                "segment_length_seconds must be at least {}, got {}",
                MIN_SEGMENT_LENGTH, self.segment_length_seconds
            )));
        }
        if self.max_concurrent_jobs == 0 {
            return Err(StudioError::config("max_concurrent_jobs must be at least 1"));
        }
        if self.job_timeout_seconds == 0 {
            return Err(StudioError::config("job_timeout_seconds must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(StudioError::config("max_attempts must be at least 1"));
        }
        if self.ytdlp_format.trim().is_empty() {
            return Err(StudioError::config("ytdlp_format must not be empty"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(StudioError::config("output_dir must not be empty"));
        }
        Ok(())
    }
}

/// The user's Downloads folder plus `ytstudio`
pub fn default_output_dir() -> PathBuf {
    match directories::UserDirs::new() {
        Some(dirs) => dirs
            .download_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dirs.home_dir().join("Downloads"))
            .join("ytstudio"),
        None => PathBuf::from("ytstudio"),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    studio: AppConfig,
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse a config document; missing keys keep their defaults
    pub fn parse(toml_content: &str) -> StudioResult<AppConfig> {
        let file: ConfigFile = toml::from_str(toml_content)
            .map_err(|e| StudioError::config(format!("failed to parse TOML config: {}", e)))?;
        Ok(file.studio)
    }

    pub fn load(path: &Path) -> StudioResult<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StudioError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&content)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }
}
