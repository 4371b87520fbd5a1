//! FFprobe adapter for media duration probing
//!
//! Shells out to `ffprobe -show_entries format=duration -of json` and reads
//! the container duration from the JSON report.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{StudioError, StudioResult};
use crate::ports::ProbePort;
use crate::utils::process::{last_line, resolve_tool, run_tool};

const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct FfprobeReport {
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    /// ffprobe prints numbers as strings, or omits the field when unknown
    #[serde(default)]
    duration: Option<String>,
}

/// FFprobe-based probe adapter
#[derive(Debug, Clone)]
pub struct FFprobeAdapter {
    ffprobe_path: PathBuf,
}

impl FFprobeAdapter {
    /// Use the given ffprobe binary, or find one on `PATH`
    pub fn new(configured: Option<&Path>) -> StudioResult<Self> {
        let ffprobe_path = resolve_tool(configured, "ffprobe")?;
        debug!(path = %ffprobe_path.display(), "Using ffprobe");
        Ok(Self { ffprobe_path })
    }

    fn args(file_path: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "json".to_string(),
            file_path.display().to_string(),
        ]
    }
}

/// Extract a usable duration from ffprobe's JSON report
pub(crate) fn parse_duration(file_path: &Path, json: &str) -> StudioResult<f64> {
    let report: FfprobeReport = serde_json::from_str(json)
        .map_err(|e| StudioError::probe(file_path, format!("unreadable ffprobe report: {}", e)))?;

    let raw = report
        .format
        .and_then(|format| format.duration)
        .ok_or_else(|| StudioError::probe(file_path, "container reports no duration"))?;

    let duration: f64 = raw
        .trim()
        .parse()
        .map_err(|_| StudioError::probe(file_path, format!("invalid duration '{}'", raw)))?;

    if duration.is_finite() && duration > 0.0 {
        Ok(duration)
    } else {
        Err(StudioError::probe(
            file_path,
            format!("non-positive duration {}", duration),
        ))
    }
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe_duration(&self, file_path: &Path) -> StudioResult<f64> {
        if !file_path.is_file() {
            return Err(StudioError::probe(file_path, "file does not exist"));
        }

        let output = run_tool(&self.ffprobe_path, &Self::args(file_path), PROBE_TIMEOUT)
            .await
            .map_err(|e| StudioError::probe(file_path, format!("ffprobe failed to run: {}", e)))?;

        if !output.status.success() {
            return Err(StudioError::probe(
                file_path,
                format!("ffprobe exited with {}: {}", output.status, last_line(&output.stderr)),
            ));
        }

        let duration = parse_duration(file_path, &output.stdout)?;
        info!(path = %file_path.display(), duration, "Probed media duration");
        Ok(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> &'static Path {
        Path::new("video.mp4")
    }

    #[test]
    fn test_parse_duration() {
        let json = r#"{ "format": { "duration": "125.041000" } }"#;
        assert_eq!(parse_duration(path(), json).unwrap(), 125.041);
    }

    #[test]
    fn test_missing_duration_is_probe_error() {
        for json in [r#"{}"#, r#"{ "format": {} }"#] {
            assert!(matches!(
                parse_duration(path(), json),
                Err(StudioError::Probe { .. })
            ));
        }
    }

    #[test]
    fn test_unusable_durations_are_rejected() {
        for raw in ["N/A", "0.000000", "-3", "inf"] {
            let json = format!(r#"{{ "format": {{ "duration": "{}" }} }}"#, raw);
            assert!(parse_duration(path(), &json).is_err(), "accepted {}", raw);
        }
    }

    #[test]
    fn test_garbage_report_is_probe_error() {
        let err = parse_duration(path(), "not json").unwrap_err();
        assert!(err.to_string().contains("video.mp4"));
    }
}
