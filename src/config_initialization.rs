//! Configuration initialization and hierarchy management
//!
//! Precedence: CLI > environment > file > defaults. Environment values
//! reach us through clap's `env` fallbacks, so they arrive already merged
//! with the command line.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::adapters::toml_config::DEFAULT_CONFIG_FILE;
use crate::adapters::{AppConfig, TomlConfigAdapter};
use crate::cli::args::{InspectArgs, SplitArgs};
use crate::error::{StudioError, StudioResult};

/// Load the file layer: an explicit `--config` must exist, the default
/// file is optional
pub fn load_config_file(explicit: Option<&Path>, working_dir: &Path) -> StudioResult<AppConfig> {
    match explicit {
        Some(path) => TomlConfigAdapter::load(path),
        None => {
            let candidate = working_dir.join(DEFAULT_CONFIG_FILE);
            if candidate.is_file() {
                TomlConfigAdapter::load(&candidate)
            } else {
                debug!("No configuration file, using defaults");
                Ok(AppConfig::default())
            }
        }
    }
}

/// Apply `split` overrides on top of the file layer
pub fn apply_split_overrides(mut config: AppConfig, args: &SplitArgs) -> AppConfig {
    let mut overrides = 0;
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
        overrides += 1;
    }
    if let Some(length) = args.segment_length {
        config.segment_length_seconds = length;
        overrides += 1;
    }
    if let Some(aspect) = args.crop_aspect {
        config.crop_aspect = aspect;
        overrides += 1;
    }
    if let Some(jobs) = args.max_jobs {
        config.max_concurrent_jobs = jobs;
        overrides += 1;
    }
    if let Some(timeout) = args.job_timeout {
        config.job_timeout_seconds = timeout;
        overrides += 1;
    }
    if let Some(retries) = args.retries {
        config.max_attempts = retries + 1;
        overrides += 1;
    }
    if overrides > 0 {
        debug!(overrides, "Applied command line configuration overrides");
    }
    config
}

/// Apply `inspect` overrides on top of the file layer
pub fn apply_inspect_overrides(mut config: AppConfig, args: &InspectArgs) -> AppConfig {
    if let Some(length) = args.segment_length {
        config.segment_length_seconds = length;
    }
    config
}

/// Resolve and validate the configuration for a run
pub fn initialize_configuration(
    explicit: Option<&Path>,
    overrides: impl FnOnce(AppConfig) -> AppConfig,
) -> StudioResult<AppConfig> {
    let working_dir: PathBuf = std::env::current_dir()?;
    let mut config = overrides(load_config_file(explicit, &working_dir)?);
    config.output_dir = expand_home(&config.output_dir)?;
    config.validate()?;
    info!(
        output_dir = %config.output_dir.display(),
        segment_length = config.segment_length_seconds,
        max_jobs = config.max_concurrent_jobs,
        "Configuration resolved"
    );
    Ok(config)
}

/// Expand a leading `~` the way shells do, for paths coming from files
pub fn expand_home(path: &Path) -> StudioResult<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let dirs = directories::UserDirs::new()
        .ok_or_else(|| StudioError::config("cannot determine home directory"))?;
    Ok(dirs.home_dir().join(rest))
}
