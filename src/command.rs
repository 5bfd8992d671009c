//! Subprocess execution for CLI-based collaborators.

use crate::{HelperError, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Executes a command and returns stdout as a string.
///
/// The child is killed if the returned future is dropped, so cancelling the
/// caller also terminates the subprocess.
///
/// # Arguments
///
/// - `program`: Command to execute (e.g., "op")
/// - `args`: Command arguments, passed without a shell
///
/// # Errors
///
/// - [`HelperError::RetrieverNotInstalled`]: program not found
/// - [`HelperError::CommandFailed`]: non-zero exit, with captured stderr
/// - [`HelperError::MalformedOutput`]: stdout is not valid UTF-8
pub async fn run_command(program: &str, args: &[&str]) -> Result<String> {
    debug!("Running {} {}", program, args.first().copied().unwrap_or_default());

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let output = cmd.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            HelperError::RetrieverNotInstalled(format!("{} command not found", program))
        } else {
            HelperError::Io(e)
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HelperError::CommandFailed {
            program: program.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: stderr.trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|e| {
        HelperError::MalformedOutput(format!("invalid UTF-8 in {} output: {}", program, e))
    })
}
