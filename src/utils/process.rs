//! External tool lookup and one-shot execution

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{StudioError, StudioResult};

/// Locate `name`, preferring an explicitly configured path
pub fn resolve_tool(configured: Option<&Path>, name: &str) -> StudioResult<PathBuf> {
    match configured {
        Some(path) if path.components().count() > 1 || path.is_absolute() => {
            if path.is_file() {
                Ok(path.to_path_buf())
            } else {
                Err(StudioError::ToolNotFound {
                    tool: path.display().to_string(),
                })
            }
        }
        Some(path) => which::which(path).map_err(|_| StudioError::ToolNotFound {
            tool: path.display().to_string(),
        }),
        None => which::which(name).map_err(|_| StudioError::ToolNotFound {
            tool: name.to_string(),
        }),
    }
}

/// Captured result of a finished tool
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` to completion, giving up after `timeout`.
///
/// A non-zero exit is returned as output, not as an error; callers decide
/// what a failure means for them. The child is killed if the timeout fires.
pub async fn run_tool(
    program: &Path,
    args: &[String],
    timeout: Duration,
) -> std::io::Result<ToolOutput> {
    debug!(program = %program.display(), ?args, "Running tool");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => {
            let output = output?;
            Ok(ToolOutput {
                status: output.status,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
        Err(_elapsed) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("timed out after {:?}", timeout),
        )),
    }
}

/// Last non-empty line of a tool's diagnostics, for error messages
pub fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}
