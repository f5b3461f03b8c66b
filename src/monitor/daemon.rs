//! One check-notify-restart-persist-log cycle

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::audit::{message_preview, AuditLog, AuditRecord};
use super::state_machine::{HealthState, MonitorStateMachine, Transition};
use super::store::{PersistedState, StateStore};
use crate::error::Result;
use crate::notifier::Notifier;
use crate::probe::{Probe, ProbeResult};
use crate::restart::Restarter;

const ALERT_PREFIX: &str = "[OpenClaw Alert]";

/// Result of the restart gate for one unhealthy transition
#[derive(Debug, Clone, PartialEq, Eq)]
struct RestartOutcome {
    attempted: bool,
    ok: bool,
    note: String,
}

impl RestartOutcome {
    fn skipped(note: &str) -> Self {
        Self {
            attempted: false,
            ok: false,
            note: note.to_string(),
        }
    }
}

pub struct HealthDaemon {
    machine: MonitorStateMachine,
    probes: Vec<Box<dyn Probe>>,
    notifier: Arc<dyn Notifier>,
    restarter: Option<Arc<dyn Restarter>>,
    store: StateStore,
    audit: AuditLog,
}

impl HealthDaemon {
    /// Build a daemon, resuming from whatever the store holds.
    pub fn new(
        threshold: u32,
        probes: Vec<Box<dyn Probe>>,
        notifier: Arc<dyn Notifier>,
        store: StateStore,
        audit: AuditLog,
    ) -> Self {
        let persisted = store.load();
        let state = HealthState::from_label(&persisted.state);
        info!(
            state = %state,
            layers = persisted.counters.len(),
            path = %store.path().display(),
            "Loaded monitor state"
        );

        Self {
            machine: MonitorStateMachine::restore(threshold, state, persisted.counters),
            probes,
            notifier,
            restarter: None,
            store,
            audit,
        }
    }

    pub fn with_restarter(mut self, restarter: Option<Arc<dyn Restarter>>) -> Self {
        self.restarter = restarter;
        self
    }

    pub fn state(&self) -> HealthState {
        self.machine.current_state()
    }

    pub fn machine(&self) -> &MonitorStateMachine {
        &self.machine
    }

    /// Run every probe, decide, act on the edge, then persist and log.
    ///
    /// Only storage failures escape; probe, notifier and restarter problems
    /// are already folded into their return values.
    pub async fn run_cycle(&mut self) -> Result<Transition> {
        let mut results = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            let result = probe.check().await;
            debug!(
                layer = %result.layer,
                ok = result.ok,
                code = result.code,
                latency_ms = result.latency_ms,
                "Probe finished"
            );
            results.push(result);
        }

        let transition = self.machine.apply(&results).unwrap_or(Transition::Steady);

        let mut notified = false;
        let mut restart = RestartOutcome::skipped("");
        let mut message = String::new();

        match transition {
            Transition::EnteredUnhealthy => {
                restart = self.maybe_restart(&results).await;
                message = build_unhealthy_message(&results, &timestamp());
                if restart.attempted {
                    let status = if restart.ok { "ok" } else { "failed" };
                    message.push_str(&format!("\nAuto-restart: {} ({})", status, restart.note));
                }
                notified = self.notifier.send(&message).await;
                info!(notified, restart_attempted = restart.attempted, "OpenClaw entered UNHEALTHY");
            }
            Transition::Recovered => {
                message = build_recovered_message(&results, &timestamp());
                notified = self.notifier.send(&message).await;
                info!(notified, "OpenClaw RECOVERED");
            }
            Transition::Steady => {}
        }

        if !message.is_empty() && !notified {
            warn!(transition = %transition, "Alert was not delivered");
        }

        self.store.save(&PersistedState {
            state: self.machine.current_state().as_str().to_string(),
            counters: self.machine.counters().clone(),
        })?;

        self.audit.append(&AuditRecord {
            ts: timestamp(),
            state: self.machine.current_state().as_str().to_string(),
            transition: transition.label().to_string(),
            notified,
            restart_attempted: restart.attempted,
            restart_ok: restart.ok,
            message_preview: message_preview(&message),
            counters: self.machine.counters().clone(),
            results,
        })?;

        Ok(transition)
    }

    async fn maybe_restart(&self, results: &[ProbeResult]) -> RestartOutcome {
        let Some(restarter) = &self.restarter else {
            debug!("Restart skipped: restarter disabled");
            return RestartOutcome::skipped("restarter disabled");
        };
        if !has_openclaw_failure(results) {
            // A gateway restart cannot fix the network.
            debug!("Restart skipped: no openclaw failure");
            return RestartOutcome::skipped("no openclaw failure");
        }

        let (ok, note) = restarter.restart().await;
        if !ok {
            warn!(note = %note, "Auto-restart failed");
        }
        RestartOutcome {
            attempted: true,
            ok,
            note,
        }
    }
}

fn has_openclaw_failure(results: &[ProbeResult]) -> bool {
    results.iter().any(ProbeResult::is_restart_eligible_failure)
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

/// First failing result in probe order, falling back to the first result.
fn primary_failure(results: &[ProbeResult]) -> Option<&ProbeResult> {
    results.iter().find(|r| !r.ok).or_else(|| results.first())
}

fn build_unhealthy_message(results: &[ProbeResult], now: &str) -> String {
    let (layer, reason, code) = match primary_failure(results) {
        Some(r) => (r.layer.as_str(), r.reason.as_str(), r.code),
        None => ("unknown", "no probe results", 1),
    };
    format!(
        "{} UNHEALTHY\nTime: {}\nReason: {} - {}\nCode: {}",
        ALERT_PREFIX, now, layer, reason, code
    )
}

fn build_recovered_message(results: &[ProbeResult], now: &str) -> String {
    let summary = results
        .iter()
        .map(|r| format!("{}=ok", r.layer))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} RECOVERED\nTime: {}\nChecks: {}", ALERT_PREFIX, now, summary)
}
