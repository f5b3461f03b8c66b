//! Automatic gateway restart

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::CommandError;
use crate::probe::{excerpt, CommandRunner, ShellRunner};

pub const DEFAULT_RESTART_CMD: &str = "openclaw gateway restart";

const NOTE_LIMIT: usize = 220;

/// Invokes a recovery action and reports `(success, note)`. Never fails.
#[async_trait]
pub trait Restarter: Send + Sync {
    async fn restart(&self) -> (bool, String);
}

pub struct CommandRestarter {
    command: String,
    timeout: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl CommandRestarter {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self::with_runner(command, timeout, Arc::new(ShellRunner))
    }

    pub fn with_runner(
        command: impl Into<String>,
        timeout: Duration,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            command: command.into(),
            timeout,
            runner,
        }
    }
}

#[async_trait]
impl Restarter for CommandRestarter {
    async fn restart(&self) -> (bool, String) {
        info!(command = %self.command, "Restarting OpenClaw gateway");

        let output = match self.runner.run(&self.command, self.timeout).await {
            Ok(output) => output,
            Err(CommandError::Timeout) => return (false, "restart timeout".to_string()),
            Err(CommandError::NotFound(msg)) => {
                return (false, format!("restart command missing: {}", msg))
            }
            Err(e) => return (false, format!("restart error: {}", e)),
        };

        let source = if output.stdout.trim().is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        let note = excerpt(source, NOTE_LIMIT);

        if output.success() {
            let note = if note.is_empty() {
                "restart ok".to_string()
            } else {
                note
            };
            (true, note)
        } else {
            warn!(code = output.code(), "Gateway restart command failed");
            let note = if note.is_empty() {
                format!("restart exit={}", output.code())
            } else {
                note
            };
            (false, note)
        }
    }
}
