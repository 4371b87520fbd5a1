//! Time parsing and formatting utilities

use crate::error::{StudioError, StudioResult};

/// Parser for user-supplied lengths of time
pub struct TimeParser;

impl TimeParser {
    /// Parse `SS[.ms]`, `SSs`, `MM:SS[.ms]` or `HH:MM:SS[.ms]` into seconds
    pub fn parse_seconds(time_str: &str) -> StudioResult<f64> {
        let trimmed = time_str.trim();
        let invalid = || StudioError::config(format!("invalid time '{}'", time_str));

        let plain = trimmed.strip_suffix('s').unwrap_or(trimmed);
        let seconds = if plain.contains(':') {
            let parts: Vec<&str> = plain.split(':').collect();
            if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
                return Err(invalid());
            }
            let (last, leading) = parts.split_last().ok_or_else(invalid)?;
            let seconds: f64 = last.parse().map_err(|_| invalid())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(invalid());
            }
            let mut total = 0.0;
            for part in leading {
                let unit: u64 = part.parse().map_err(|_| invalid())?;
                total = total * 60.0 + unit as f64;
            }
            total * 60.0 + seconds
        } else {
            plain.parse().map_err(|_| invalid())?
        };

        if seconds.is_finite() && seconds >= 0.0 {
            Ok(seconds)
        } else {
            Err(invalid())
        }
    }

    /// Like [`TimeParser::parse_seconds`] but rejects zero
    pub fn parse_positive_seconds(time_str: &str) -> StudioResult<f64> {
        let seconds = Self::parse_seconds(time_str)?;
        if seconds > 0.0 {
            Ok(seconds)
        } else {
            Err(StudioError::config(format!("'{}' must be longer than zero", time_str)))
        }
    }

    /// Format seconds as `MM:SS.mmm`, or `HH:MM:SS.mmm` past an hour
    pub fn format_seconds(seconds: f64) -> String {
        let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
        let ms = total_ms % 1000;
        let total_s = total_ms / 1000;
        let (h, m, s) = (total_s / 3600, (total_s % 3600) / 60, total_s % 60);
        if h > 0 {
            format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
        } else {
            format!("{:02}:{:02}.{:03}", m, s, ms)
        }
    }
}

/// Clap value parser for segment lengths
pub fn parse_segment_length(value: &str) -> Result<f64, String> {
    TimeParser::parse_positive_seconds(value).map_err(|e| e.to_string())
}
