//! MFA code prompting.

use crate::{HelperError, Result};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use tracing::debug;

/// Prompt shown on the controlling terminal.
pub const MFA_PROMPT: &str = "Enter MFA code: ";

#[cfg(unix)]
const TTY_IN: &str = "/dev/tty";
#[cfg(unix)]
const TTY_OUT: &str = "/dev/tty";

#[cfg(windows)]
const TTY_IN: &str = "CONIN$";
#[cfg(windows)]
const TTY_OUT: &str = "CONOUT$";

/// Source of one-time MFA codes.
#[async_trait]
pub trait MfaPrompter: Send + Sync {
    /// Obtains one code. Called at most once per run.
    ///
    /// # Errors
    ///
    /// - [`HelperError::MfaPrompt`]: no interactive terminal or read failure
    /// - [`HelperError::EmptyMfaCode`]: a blank line was entered
    async fn prompt(&self) -> Result<String>;
}

/// Reads the code from the controlling terminal.
///
/// stdin and stdout are left alone: the invoking SDK owns stdout and may
/// have redirected stdin.
#[derive(Debug, Clone, Default)]
pub struct TtyPrompter;

impl TtyPrompter {
    /// Creates a terminal prompter.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MfaPrompter for TtyPrompter {
    async fn prompt(&self) -> Result<String> {
        debug!("Prompting for MFA code on {}", TTY_IN);

        // Terminal reads cannot be interrupted; the thread is abandoned on
        // cancellation.
        let line = tokio::task::spawn_blocking(read_from_terminal)
            .await
            .map_err(|e| HelperError::Other(anyhow::anyhow!("terminal reader panicked: {}", e)))?
            .map_err(HelperError::MfaPrompt)?;

        normalize_code(&line)
    }
}

fn read_from_terminal() -> std::io::Result<String> {
    let input = OpenOptions::new().read(true).open(TTY_IN)?;
    let mut output = OpenOptions::new().write(true).open(TTY_OUT)?;

    read_code(BufReader::new(input), &mut output)
}

/// Writes the prompt and reads one line.
fn read_code<R: BufRead, W: Write>(mut input: R, output: &mut W) -> std::io::Result<String> {
    output.write_all(MFA_PROMPT.as_bytes())?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "terminal closed before a code was entered",
        ));
    }
    Ok(line)
}

fn normalize_code(line: &str) -> Result<String> {
    let code = line.trim();
    if code.is_empty() {
        return Err(HelperError::EmptyMfaCode);
    }
    Ok(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_code_writes_prompt() {
        let mut out = Vec::new();
        let line = read_code(Cursor::new("123456\n"), &mut out).unwrap();
        assert_eq!(line, "123456\n");
        assert_eq!(out, MFA_PROMPT.as_bytes());
    }

    #[test]
    fn test_read_code_eof() {
        let mut out = Vec::new();
        let err = read_code(Cursor::new(""), &mut out).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_normalize_trims() {
        assert_eq!(normalize_code("  654321\r\n").unwrap(), "654321");
        assert!(matches!(normalize_code(" \n"), Err(HelperError::EmptyMfaCode)));
    }
}
