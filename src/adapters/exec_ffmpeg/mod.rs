//! FFmpeg execution adapter
//!
//! Each invocation runs one `ffmpeg` child that seeks into the source,
//! crops and re-encodes a window into its own output file. Machine-readable
//! progress comes from `-progress pipe:1`; stderr is kept only as a short
//! tail for failure reasons.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::StudioResult;
use crate::ports::{EngineEvent, EngineEvents, TranscodePort, TranscodeRequest};
use crate::utils::process::resolve_tool;

/// Lines of ffmpeg stderr kept for failure messages
const STDERR_TAIL_LINES: usize = 20;

/// Encoder settings for the produced clips
#[derive(Debug, Clone, PartialEq, Eq)]
struct EncodeSettings {
    video_codec: String,
    preset: String,
    audio_codec: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "veryfast".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

/// FFmpeg-based execution adapter
#[derive(Debug, Clone)]
pub struct FFmpegAdapter {
    ffmpeg_path: PathBuf,
    encode: EncodeSettings,
}

impl FFmpegAdapter {
    /// Use the given ffmpeg binary, or find one on `PATH`
    pub fn new(configured: Option<&Path>) -> StudioResult<Self> {
        let ffmpeg_path = resolve_tool(configured, "ffmpeg")?;
        debug!(path = %ffmpeg_path.display(), "Using ffmpeg");
        Ok(Self::with_binary(ffmpeg_path))
    }

    /// Use `ffmpeg_path` as is, without checking that it exists
    pub fn with_binary(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            encode: EncodeSettings::default(),
        }
    }

    /// Command line for one invocation, without the program name
    pub fn build_args(&self, request: &TranscodeRequest) -> Vec<String> {
        let mut args: Vec<String> = [
            "-nostdin",
            "-hide_banner",
            "-nostats",
            "-y",
            "-progress",
            "pipe:1",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        // Input seeking: fast, and timestamps restart at zero for the clip.
        args.extend([
            "-ss".to_string(),
            format!("{:.3}", request.start_seconds),
            "-i".to_string(),
            request.input_path.display().to_string(),
            "-t".to_string(),
            format!("{:.3}", request.length_seconds),
            "-vf".to_string(),
            request.crop_filter.clone(),
            "-c:v".to_string(),
            self.encode.video_codec.clone(),
            "-preset".to_string(),
            self.encode.preset.clone(),
            "-c:a".to_string(),
            self.encode.audio_codec.clone(),
            request.output_path.display().to_string(),
        ]);
        args
    }
}

impl TranscodePort for FFmpegAdapter {
    fn invoke(&self, request: TranscodeRequest, cancel: CancellationToken) -> EngineEvents {
        let (tx, rx) = mpsc::channel(32);
        let program = self.ffmpeg_path.clone();
        let args = self.build_args(&request);
        tokio::spawn(drive(program, args, tx, cancel));
        Box::pin(ReceiverStream::new(rx))
    }
}

/// Own one ffmpeg child from spawn to exit, forwarding its events
async fn drive(
    program: PathBuf,
    args: Vec<String>,
    tx: mpsc::Sender<EngineEvent>,
    cancel: CancellationToken,
) {
    debug!(program = %program.display(), ?args, "Spawning ffmpeg");
    let spawned = Command::new(&program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            let _ = tx
                .send(EngineEvent::Unavailable {
                    reason: format!("{}: {}", program.display(), e),
                })
                .await;
            return;
        }
    };

    let stderr_tail = child.stderr.take().map(|stderr| tokio::spawn(collect_tail(stderr)));
    let Some(stdout) = child.stdout.take() else {
        let _ = child.start_kill();
        let _ = tx
            .send(EngineEvent::Unavailable {
                reason: "ffmpeg stdout was not captured".to_string(),
            })
            .await;
        return;
    };

    let mut lines = BufReader::new(stdout).lines();
    let mut parser = ProgressParser::default();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                stop(&mut child).await;
                return;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(processed_seconds) = parser.feed(&line) {
                        // A full channel only means the job is slow to read;
                        // a later block carries a newer position anyway.
                        let _ = tx.try_send(EngineEvent::Progress { processed_seconds });
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Could not read ffmpeg progress");
                    break;
                }
            }
        }
    }

    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            stop(&mut child).await;
            return;
        }
        status = child.wait() => status,
    };

    let tail = match stderr_tail {
        Some(handle) => handle.await.unwrap_or_default(),
        None => VecDeque::new(),
    };

    let event = match status {
        Ok(status) if status.success() => EngineEvent::Completed,
        Ok(status) => EngineEvent::Failed {
            reason: failure_reason(status, &tail),
        },
        Err(e) => EngineEvent::Failed {
            reason: format!("could not wait for ffmpeg: {}", e),
        },
    };
    let _ = tx.send(event).await;
}

async fn stop(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "ffmpeg already gone");
    }
    let _ = child.wait().await;
    debug!("ffmpeg stopped on cancellation");
}

async fn collect_tail<R: AsyncRead + Unpin>(stream: R) -> VecDeque<String> {
    let mut lines = BufReader::new(stream).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail
}

fn failure_reason(status: ExitStatus, tail: &VecDeque<String>) -> String {
    match tail.back() {
        Some(last) => format!("ffmpeg exited with {}: {}", status, last.trim()),
        None => format!("ffmpeg exited with {}", status),
    }
}

/// Incremental parser for `-progress` key=value blocks
#[derive(Debug, Default)]
pub(crate) struct ProgressParser {
    out_time_us: Option<i64>,
}

impl ProgressParser {
    /// Feed one line; returns the encoded position at the end of a block
    pub(crate) fn feed(&mut self, line: &str) -> Option<f64> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            // `out_time_ms` is microseconds as well, kept for older builds
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.trim().parse::<i64>() {
                    self.out_time_us = Some(us);
                }
                None
            }
            "progress" => self
                .out_time_us
                .filter(|us| *us >= 0)
                .map(|us| us as f64 / 1_000_000.0),
            _ => None,
        }
    }
}
