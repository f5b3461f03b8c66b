//! `oc-healthd` command line and run loop

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{load_config, AppConfig, DEFAULT_CONFIG_PATH};
use crate::monitor::{AuditLog, HealthDaemon, StateStore};
use crate::notifier::{Notifier, TelegramNotifier};
use crate::probe::{HealthProbe, NetworkProbe, Probe, StatusProbe};
use crate::restart::{CommandRestarter, Restarter};

#[derive(Debug, Parser)]
#[command(name = "oc-healthd")]
#[command(about = "OpenClaw standalone health monitor", version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Run exactly one cycle and exit
    #[arg(long)]
    pub once: bool,
}

/// The three checks, in the order they run each cycle
pub fn build_probes(config: &AppConfig) -> Vec<Box<dyn Probe>> {
    let timeout = config.monitor.timeout();
    vec![
        Box::new(HealthProbe::new(config.openclaw.health_cmd.clone(), timeout)),
        Box::new(StatusProbe::new(config.openclaw.status_cmd.clone(), timeout)),
        Box::new(NetworkProbe::new(config.system.target(), timeout)),
    ]
}

pub fn build_restarter(config: &AppConfig) -> Option<Arc<dyn Restarter>> {
    let command = config.openclaw.restart_cmd.trim();
    if command.is_empty() {
        return None;
    }
    Some(Arc::new(CommandRestarter::new(
        command,
        config.monitor.timeout(),
    )))
}

pub fn build_daemon(config: &AppConfig) -> HealthDaemon {
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(
        config.telegram.bot_token.clone(),
        config.telegram.chat_id.clone(),
        config.monitor.timeout(),
    ));

    HealthDaemon::new(
        config.monitor.failure_threshold,
        build_probes(config),
        notifier,
        StateStore::new(&config.paths.state_file),
        AuditLog::new(&config.paths.log_file),
    )
    .with_restarter(build_restarter(config))
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;
    let mut daemon = build_daemon(&config);

    // Installed before the first cycle so an interrupt never tears a cycle.
    let shutdown = CancellationToken::new();
    spawn_interrupt_listener(shutdown.clone());

    if cli.once {
        let transition = daemon.run_cycle().await.context("Monitoring cycle failed")?;
        info!(transition = %transition, state = %daemon.state(), "Single cycle complete");
        return Ok(());
    }

    info!(
        interval_secs = config.monitor.interval_seconds,
        threshold = config.monitor.failure_threshold,
        restart_enabled = !config.openclaw.restart_cmd.trim().is_empty(),
        "Health monitor started"
    );

    run_loop(&mut daemon, config.monitor.interval(), &shutdown).await
}

fn spawn_interrupt_listener(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        // Registering here, not inside the task, takes SIGINT over immediately.
        match signal(SignalKind::interrupt()) {
            Ok(mut sigint) => {
                tokio::spawn(async move {
                    let received = sigint.recv().await.ok_or_else(|| {
                        io::Error::new(io::ErrorKind::BrokenPipe, "signal stream closed")
                    });
                    handle_interrupt(received, &shutdown);
                });
            }
            Err(e) => {
                handle_interrupt(Err(e), &shutdown);
            }
        }
    }

    #[cfg(not(unix))]
    tokio::spawn(async move {
        handle_interrupt(tokio::signal::ctrl_c().await, &shutdown);
    });
}

/// Cancel only on a real interrupt; a broken listener keeps the watchdog running.
fn handle_interrupt(result: io::Result<()>, shutdown: &CancellationToken) -> bool {
    match result {
        Ok(()) => {
            info!("Interrupt received, stopping after the current cycle");
            shutdown.cancel();
            true
        }
        Err(e) => {
            warn!(error = %e, "Failed to listen for interrupt, monitoring continues");
            false
        }
    }
}

/// Cycles never get cancelled midway; the interrupt is only honoured
/// between cycles so state and log writes always complete.
pub async fn run_loop(
    daemon: &mut HealthDaemon,
    interval: std::time::Duration,
    shutdown: &CancellationToken,
) -> Result<()> {
    while !shutdown.is_cancelled() {
        daemon.run_cycle().await.context("Monitoring cycle failed")?;

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Health monitor stopped");
    Ok(())
}
