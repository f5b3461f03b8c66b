//! Health probes
//!
//! Every probe reduces its own transport failures to a [`ProbeResult`]:
//! - OpenClaw health and status commands
//! - Network reachability (DNS + TCP)

pub mod command;
pub mod network;
pub mod openclaw;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub use command::{CommandOutput, CommandRunner, ShellRunner};
pub use network::{NetworkProbe, NetworkTarget, TokioTransport};
pub use openclaw::{HealthProbe, StatusProbe};

pub const LAYER_OPENCLAW_HEALTH: &str = "openclaw_health";
pub const LAYER_OPENCLAW_STATUS: &str = "openclaw_status";
pub const LAYER_SYSTEM_PROBE: &str = "system_probe";

/// Layers whose failure a gateway restart can plausibly fix.
pub const RESTART_ELIGIBLE_LAYERS: [&str; 2] = [LAYER_OPENCLAW_HEALTH, LAYER_OPENCLAW_STATUS];

pub const EXCERPT_LIMIT: usize = 300;

/// Outcome of a single probe invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub layer: String,
    pub ok: bool,
    pub reason: String,
    pub code: i32,
    pub latency_ms: u64,
    pub raw_excerpt: String,
}

impl ProbeResult {
    pub fn success(
        layer: impl Into<String>,
        code: i32,
        latency_ms: u64,
        raw_excerpt: impl Into<String>,
    ) -> Self {
        Self {
            layer: layer.into(),
            ok: true,
            reason: "ok".to_string(),
            code,
            latency_ms,
            raw_excerpt: raw_excerpt.into(),
        }
    }

    pub fn failure(
        layer: impl Into<String>,
        reason: impl Into<String>,
        code: i32,
        latency_ms: u64,
        raw_excerpt: impl Into<String>,
    ) -> Self {
        Self {
            layer: layer.into(),
            ok: false,
            reason: reason.into(),
            code,
            latency_ms,
            raw_excerpt: raw_excerpt.into(),
        }
    }

    /// Whether a restart of the gateway is warranted by this result
    pub fn is_restart_eligible_failure(&self) -> bool {
        !self.ok && RESTART_ELIGIBLE_LAYERS.contains(&self.layer.as_str())
    }
}

/// A zero-argument health check.
///
/// Implementations never fail: timeouts, missing binaries and transport
/// errors all come back as a result with `ok == false`.
#[async_trait]
pub trait Probe: Send + Sync {
    fn layer(&self) -> &str;

    async fn check(&self) -> ProbeResult;
}

/// Collapse whitespace runs and cap the length at `limit` characters.
pub fn excerpt(text: &str, limit: usize) -> String {
    let compact = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() <= limit {
        compact
    } else {
        compact.chars().take(limit).collect()
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_collapses_whitespace() {
        assert_eq!(excerpt("  gateway \n\t down  now ", 300), "gateway down now");
    }

    #[test]
    fn test_excerpt_truncates_to_limit() {
        let long = "x".repeat(400);
        assert_eq!(excerpt(&long, 300).len(), 300);
    }

    #[test]
    fn test_excerpt_counts_chars_not_bytes() {
        let text = "é".repeat(10);
        assert_eq!(excerpt(&text, 4), "éééé");
    }

    #[test]
    fn test_excerpt_empty() {
        assert_eq!(excerpt("   ", 300), "");
    }

    #[test]
    fn test_success_reason_is_ok() {
        let result = ProbeResult::success(LAYER_SYSTEM_PROBE, 0, 3, "");
        assert!(result.ok);
        assert_eq!(result.reason, "ok");
    }

    #[test]
    fn test_restart_eligibility() {
        let health = ProbeResult::failure(LAYER_OPENCLAW_HEALTH, "down", 1, 1, "");
        let status = ProbeResult::failure(LAYER_OPENCLAW_STATUS, "down", 1, 1, "");
        let network = ProbeResult::failure(LAYER_SYSTEM_PROBE, "dns", 1, 1, "");
        let healthy = ProbeResult::success(LAYER_OPENCLAW_HEALTH, 0, 1, "");

        assert!(health.is_restart_eligible_failure());
        assert!(status.is_restart_eligible_failure());
        assert!(!network.is_restart_eligible_failure());
        assert!(!healthy.is_restart_eligible_failure());
    }
}
