//! Monitoring core
//!
//! - Hysteresis state machine over per-layer failure counters
//! - Durable state store and audit log
//! - The cycle orchestrator tying probes, alerts and restarts together

pub mod audit;
pub mod daemon;
pub mod state_machine;
pub mod store;

pub use audit::{AuditLog, AuditRecord};
pub use daemon::HealthDaemon;
pub use state_machine::{HealthState, MonitorStateMachine, Transition};
pub use store::{PersistedState, StateStore};
