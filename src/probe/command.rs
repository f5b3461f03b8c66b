//! Bounded external command execution

use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::CommandError;

/// Captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Exit code as reported in results, with signal deaths mapped to 1
    pub fn code(&self) -> i32 {
        self.status.unwrap_or(1)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, timeout: Duration) -> Result<CommandOutput, CommandError>;
}

/// Runs the program directly (no shell), splitting the line with POSIX
/// shell-word rules. The child is killed if the timeout elapses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, timeout: Duration) -> Result<CommandOutput, CommandError> {
        let argv = shlex::split(command).ok_or_else(|| CommandError::Parse(command.to_string()))?;
        let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;

        debug!(program = %program, timeout_secs = timeout.as_secs(), "spawning command");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => CommandError::NotFound(format!("{}: {}", program, e)),
                _ => CommandError::Io(e.to_string()),
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| CommandError::Timeout)?
            .map_err(|e| CommandError::Io(e.to_string()))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
