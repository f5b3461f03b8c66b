//! OpenClaw gateway probes driven by its CLI

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::command::{CommandOutput, CommandRunner, ShellRunner};
use super::{
    elapsed_ms, excerpt, Probe, ProbeResult, EXCERPT_LIMIT, LAYER_OPENCLAW_HEALTH,
    LAYER_OPENCLAW_STATUS,
};
use crate::error::CommandError;

pub const DEFAULT_HEALTH_CMD: &str = "openclaw health --json";
pub const DEFAULT_STATUS_CMD: &str = "openclaw status --deep";

fn first_non_empty<'a>(candidates: &[&'a str], fallback: &'a str) -> &'a str {
    candidates
        .iter()
        .copied()
        .find(|s| !s.trim().is_empty())
        .unwrap_or(fallback)
}

/// Map a runner error to a failing result for `layer`; `kind` prefixes reasons.
fn command_error_result(layer: &str, kind: &str, err: CommandError, latency_ms: u64) -> ProbeResult {
    let (reason, code) = match err {
        CommandError::Timeout => (format!("{} command timeout", kind), 124),
        CommandError::NotFound(msg) => (format!("{} command missing: {}", kind, msg), 127),
        other => (format!("{} command error: {}", kind, other), 1),
    };
    ProbeResult::failure(layer, reason, code, latency_ms, "")
}

/// Runs `openclaw health --json` and inspects the payload.
pub struct HealthProbe {
    command: String,
    timeout: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl HealthProbe {
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

    fn evaluate(output: &CommandOutput, latency_ms: u64) -> ProbeResult {
        let stdout = output.stdout.as_str();
        let stderr = output.stderr.as_str();

        if !output.success() {
            let reason = excerpt(
                first_non_empty(&[stderr, stdout], "health command failed"),
                EXCERPT_LIMIT,
            );
            return ProbeResult::failure(
                LAYER_OPENCLAW_HEALTH,
                reason,
                output.code(),
                latency_ms,
                excerpt(first_non_empty(&[stdout, stderr], ""), EXCERPT_LIMIT),
            );
        }

        // Only an explicit `"ok": false` in a JSON object counts; other shapes pass.
        let reports_not_ok = serde_json::from_str::<Value>(stdout)
            .ok()
            .and_then(|v| v.get("ok").and_then(Value::as_bool))
            == Some(false);

        if reports_not_ok {
            return ProbeResult::failure(
                LAYER_OPENCLAW_HEALTH,
                "health payload ok=false",
                0,
                latency_ms,
                excerpt(stdout, EXCERPT_LIMIT),
            );
        }

        ProbeResult::success(
            LAYER_OPENCLAW_HEALTH,
            output.code(),
            latency_ms,
            excerpt(stdout, EXCERPT_LIMIT),
        )
    }
}

#[async_trait]
impl Probe for HealthProbe {
    fn layer(&self) -> &str {
        LAYER_OPENCLAW_HEALTH
    }

    async fn check(&self) -> ProbeResult {
        let started = Instant::now();
        let result = match self.runner.run(&self.command, self.timeout).await {
            Ok(output) => Self::evaluate(&output, elapsed_ms(started)),
            Err(e) => command_error_result(LAYER_OPENCLAW_HEALTH, "health", e, elapsed_ms(started)),
        };
        debug!(layer = %result.layer, ok = result.ok, code = result.code, "health probe finished");
        result
    }
}

/// Runs `openclaw status --deep`; exit code alone decides.
pub struct StatusProbe {
    command: String,
    timeout: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl StatusProbe {
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

    fn evaluate(output: &CommandOutput, latency_ms: u64) -> ProbeResult {
        let stdout = output.stdout.as_str();
        let stderr = output.stderr.as_str();
        let raw = excerpt(first_non_empty(&[stdout, stderr], ""), EXCERPT_LIMIT);

        if output.success() {
            ProbeResult::success(LAYER_OPENCLAW_STATUS, output.code(), latency_ms, raw)
        } else {
            let reason = excerpt(
                first_non_empty(&[stderr, stdout], "status command failed"),
                EXCERPT_LIMIT,
            );
            ProbeResult::failure(LAYER_OPENCLAW_STATUS, reason, output.code(), latency_ms, raw)
        }
    }
}

#[async_trait]
impl Probe for StatusProbe {
    fn layer(&self) -> &str {
        LAYER_OPENCLAW_STATUS
    }

    async fn check(&self) -> ProbeResult {
        let started = Instant::now();
        let result = match self.runner.run(&self.command, self.timeout).await {
            Ok(output) => Self::evaluate(&output, elapsed_ms(started)),
            Err(e) => command_error_result(LAYER_OPENCLAW_STATUS, "status", e, elapsed_ms(started)),
        };
        debug!(layer = %result.layer, ok = result.ok, code = result.code, "status probe finished");
        result
    }
}
