//! openclaw-healthd - standalone health watchdog for the OpenClaw gateway
//!
//! Probes the gateway every interval, alerts over Telegram when failures
//! persist past the threshold, and optionally restarts the gateway.

pub mod cli;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notifier;
pub mod probe;
pub mod restart;
