//! oc-healthd - OpenClaw standalone health monitor

use anyhow::Result;
use clap::Parser;
use openclaw_healthd::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let default_directive = if std::env::var("OC_HEALTHD_DEBUG").is_ok() {
        "openclaw_healthd=debug"
    } else {
        "openclaw_healthd=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // Audit records go to the JSONL file; diagnostics stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cli::run(Cli::parse()).await
}
