//! CLI module for Shorts Studio
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapters::LogFormat;

pub mod args;
pub mod commands;
pub mod progress_display;

/// Shorts Studio
///
/// Splits a long video into fixed-length, portrait-cropped clips for
/// short-form platforms.
#[derive(Parser, Debug)]
#[command(name = "shorts-studio")]
#[command(about = "Shorts Studio - Turn long videos into vertical shorts")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level or filter directive (RUST_LOG wins when set)
    #[arg(long, default_value = "info", global = true, env = "SHORTS_STUDIO_LOG_LEVEL")]
    pub log_level: String,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    /// Configuration file (default: ./shorts-studio.toml when present)
    #[arg(long, global = true, env = "SHORTS_STUDIO_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log format for this run; `split --json` forces JSON so that every
    /// stderr line is machine-readable next to the job events
    pub fn effective_log_format(&self) -> LogFormat {
        match &self.command {
            Commands::Split(args) if args.json => LogFormat::Json,
            _ => self.log_format,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download or open a video and cut it into cropped segments
    Split(args::SplitArgs),
    /// Show a local video's duration and the segments it would produce
    Inspect(args::InspectArgs),
}
