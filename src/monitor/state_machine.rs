//! Hysteresis over consecutive probe failures
//!
//! Any layer reaching the threshold flips the aggregate to unhealthy;
//! every layer must be back below it before recovery is declared.

use std::collections::BTreeMap;
use std::fmt;

use crate::probe::ProbeResult;

/// Aggregate health of the monitored gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthState {
    #[default]
    Healthy,
    Unhealthy,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "HEALTHY",
            Self::Unhealthy => "UNHEALTHY",
        }
    }

    /// Parse a persisted label; anything unrecognised starts out healthy
    pub fn from_label(label: &str) -> Self {
        match label {
            "UNHEALTHY" => Self::Unhealthy,
            _ => Self::Healthy,
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one cycle as seen by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    EnteredUnhealthy,
    Recovered,
    Steady,
}

impl Transition {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EnteredUnhealthy => "entered_unhealthy",
            Self::Recovered => "recovered",
            Self::Steady => "steady",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct MonitorStateMachine {
    threshold: u32,
    current_state: HealthState,
    counters: BTreeMap<String, u32>,
}

impl MonitorStateMachine {
    /// A threshold of 0 would mean "always unhealthy"; it is treated as 1.
    pub fn new(threshold: u32) -> Self {
        Self::restore(threshold, HealthState::Healthy, BTreeMap::new())
    }

    pub fn restore(
        threshold: u32,
        current_state: HealthState,
        counters: BTreeMap<String, u32>,
    ) -> Self {
        Self {
            threshold: threshold.max(1),
            current_state,
            counters,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn current_state(&self) -> HealthState {
        self.current_state
    }

    pub fn counters(&self) -> &BTreeMap<String, u32> {
        &self.counters
    }

    /// Fold one cycle's results into the counters.
    ///
    /// Returns `None` when the aggregate state did not change. Layers absent
    /// from `results` keep their previous count.
    pub fn apply(&mut self, results: &[ProbeResult]) -> Option<Transition> {
        for result in results {
            let count = self.counters.entry(result.layer.clone()).or_insert(0);
            if result.ok {
                *count = 0;
            } else {
                *count = count.saturating_add(1);
            }
        }

        let any_unhealthy = self.counters.values().any(|&c| c >= self.threshold);

        match (self.current_state, any_unhealthy) {
            (HealthState::Healthy, true) => {
                self.current_state = HealthState::Unhealthy;
                Some(Transition::EnteredUnhealthy)
            }
            (HealthState::Unhealthy, false) => {
                self.current_state = HealthState::Healthy;
                Some(Transition::Recovered)
            }
            _ => None,
        }
    }
}
