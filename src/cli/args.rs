//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::model::CropAspect;
use crate::utils::time::parse_segment_length;

fn parse_max_jobs(value: &str) -> Result<usize, String> {
    clap_num::number_range(value, 1, 256)
}

fn parse_retries(value: &str) -> Result<u32, String> {
    clap_num::number_range(value, 0, 10)
}

fn parse_job_timeout(value: &str) -> Result<u64, String> {
    clap_num::number_range(value, 1, 86_400)
}

/// Arguments for the split command
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Video URL or local file path; asked for interactively when omitted
    #[arg(value_name = "LOCATOR")]
    pub locator: Option<String>,

    /// Directory receiving subclip_N.mp4 files; clips of an earlier run are cleared first
    #[arg(short, long, env = "SHORTS_STUDIO_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Segment length (seconds, MM:SS or HH:MM:SS)
    #[arg(
        short = 'l',
        long,
        env = "SHORTS_STUDIO_SEGMENT_LENGTH",
        value_parser = parse_segment_length
    )]
    pub segment_length: Option<f64>,

    /// Target aspect ratio as W:H
    #[arg(long, env = "SHORTS_STUDIO_CROP_ASPECT")]
    pub crop_aspect: Option<CropAspect>,

    /// Maximum number of simultaneous transcodes
    #[arg(short = 'j', long, env = "SHORTS_STUDIO_MAX_JOBS", value_parser = parse_max_jobs)]
    pub max_jobs: Option<usize>,

    /// Fail a transcode that reports nothing for this many seconds
    #[arg(long, env = "SHORTS_STUDIO_JOB_TIMEOUT", value_parser = parse_job_timeout)]
    pub job_timeout: Option<u64>,

    /// Extra attempts for a failed segment
    #[arg(long, env = "SHORTS_STUDIO_RETRIES", value_parser = parse_retries)]
    pub retries: Option<u32>,

    /// Do not draw progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Print the run report as JSON on stdout; job events and logs go to stderr as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Local video file path
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Segment length (seconds, MM:SS or HH:MM:SS)
    #[arg(
        short = 'l',
        long,
        env = "SHORTS_STUDIO_SEGMENT_LENGTH",
        value_parser = parse_segment_length
    )]
    pub segment_length: Option<f64>,

    /// Output in JSON format
    #[arg(long, conflicts_with = "yaml")]
    pub json: bool,

    /// Output in YAML format
    #[arg(long)]
    pub yaml: bool,
}
