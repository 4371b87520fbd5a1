//! Command implementations

use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::{AppContainer, DefaultAppContainer, SplitReport, SplitRequest};
use crate::cli::args::{InspectArgs, SplitArgs};
use crate::cli::progress_display::ProgressBars;
use crate::config_initialization::{
    apply_inspect_overrides, apply_split_overrides, initialize_configuration,
};
use crate::domain::rules::ExitStatusRule;
use crate::engine::JsonLinesSink;
use crate::ports::{NullSink, ProgressSink};
use crate::utils::time::TimeParser;

/// Execute the split command.
///
/// `Err` means the video could not be processed at all; a finished batch
/// is reported through the exit code instead.
pub async fn split(
    config_file: Option<&Path>,
    args: SplitArgs,
    cancel: CancellationToken,
) -> Result<ExitCode> {
    let config = initialize_configuration(config_file, |c| apply_split_overrides(c, &args))?;
    let container = DefaultAppContainer::new(config)?;

    let given = args.locator.clone();
    let locator = tokio::task::spawn_blocking(move || resolve_locator(given))
        .await
        .context("locator prompt failed")??;
    let interactor = container.split_interactor()?;

    let request = SplitRequest {
        locator: locator.clone(),
        output_dir: container.config().output_dir.clone(),
        segment_length: container.config().segment_length_seconds,
    };
    let sink: Arc<dyn ProgressSink> = if args.no_progress {
        Arc::new(NullSink)
    } else if args.json {
        Arc::new(JsonLinesSink::stderr(false))
    } else {
        Arc::new(ProgressBars::new())
    };

    let report = interactor
        .execute(request, sink, cancel)
        .await
        .with_context(|| format!("could not process {}", locator))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("JSON serialization failed")?
        );
    } else {
        print!("{}", render_summary(&report));
    }

    let code = ExitStatusRule::for_status(report.status());
    info!(exit_code = code, "Split finished");
    Ok(ExitCode::from(code))
}

/// The locator from the command line, or one typed at an interactive prompt
fn resolve_locator(given: Option<String>) -> Result<String> {
    if let Some(locator) = given {
        return Ok(locator);
    }
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        bail!("no video locator given and stdin is not a terminal");
    }
    read_locator(stdin.lock(), std::io::stderr())
}

fn read_locator(mut input: impl BufRead, mut prompt: impl Write) -> Result<String> {
    write!(prompt, "Video URL or file path: ")?;
    prompt.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("could not read the video locator")?;
    let locator = line.trim();
    if locator.is_empty() {
        bail!("no video locator given");
    }
    Ok(locator.to_string())
}

/// Execute the inspect command
pub async fn inspect(config_file: Option<&Path>, args: InspectArgs) -> Result<ExitCode> {
    let config = initialize_configuration(config_file, |c| apply_inspect_overrides(c, &args))?;
    let segment_length = config.segment_length_seconds;
    let container = DefaultAppContainer::new(config)?;
    let report = container
        .inspect_interactor()?
        .execute(&args.input, segment_length)
        .await?;

    let rendered = if args.json {
        report.to_json()?
    } else if args.yaml {
        report.to_yaml()?
    } else {
        report.to_text()
    };
    print!("{}", rendered);
    if !rendered.ends_with('\n') {
        println!();
    }
    Ok(ExitCode::SUCCESS)
}

/// Human-readable end-of-run summary
pub fn render_summary(report: &SplitReport) -> String {
    let batch = &report.batch;
    let mut out = String::new();

    if report.plan.is_empty() {
        out.push_str(&format!(
            "Video is {} long, shorter than one {}s segment; no clips produced.\n",
            TimeParser::format_seconds(report.asset.duration_seconds),
            report.plan.segment_length()
        ));
        return out;
    }

    out.push_str(&format!(
        "Processed {} with {}/{} segments succeeding.\n",
        report.source,
        batch.succeeded_count(),
        batch.planned()
    ));
    for (index, reason) in batch.failures() {
        out.push_str(&format!("  subclip_{}.mp4 failed: {}\n", index + 1, reason));
    }
    let written: Vec<String> = batch
        .output_paths()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    if !written.is_empty() {
        out.push_str(&format!(
            "Clips written to {}: {}\n",
            report.output_dir.display(),
            written.join(", ")
        ));
    }
    let dropped = report.plan.dropped_seconds(report.asset.duration_seconds);
    if dropped > 0.0 {
        out.push_str(&format!("Skipped the last {:.1}s (shorter than a segment).\n", dropped));
    }
    out
}
