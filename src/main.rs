//! Shorts Studio CLI
//!
//! Splits a long video into fixed-length 9:16 clips.
//!
//! # Usage
//!
//! ```bash
//! shorts-studio split "https://www.youtube.com/watch?v=..." -o ~/Downloads/ytstudio
//! shorts-studio split talk.mp4 --segment-length 30 -j 4
//! shorts-studio inspect talk.mp4 --json
//! ```
//!
//! Exit status: 0 when every segment succeeded (or none were planned),
//! 2 when only some did, 1 when nothing could be produced.

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use shorts_studio::adapters::{LogFormat, TracingLogAdapter};
use shorts_studio::cli::{commands, Cli, Commands};
use shorts_studio::domain::rules::ExitStatusRule;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_format = cli.effective_log_format();
    if let Err(e) = TracingLogAdapter::init(&cli.log_level, log_format) {
        eprintln!("{}", e);
        return ExitCode::from(ExitStatusRule::FAILURE);
    }
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Shorts Studio");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping running jobs");
            interrupt.cancel();
        }
    });

    let config_file = cli.config.as_deref();
    let result = match cli.command {
        Commands::Split(args) => {
            info!("Executing split command");
            commands::split(config_file, args, cancel).await
        }
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            commands::inspect(config_file, args).await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("could not process video: {:#}", e);
            if log_format != LogFormat::Json {
                eprintln!("could not process video: {:#}", e);
            }
            ExitCode::from(ExitStatusRule::FAILURE)
        }
    }
}
