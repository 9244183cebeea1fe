//! Sadaqah CLI - operator entry point for the contribution ledger.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sadaqah_cli::{cli::Cli, commands};
use sadaqah_ledger::{Engine, LedgerConfig};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sadaqah=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = LedgerConfig::from_env().context("loading configuration")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    tracing::info!(
        data_dir = %config.data_dir,
        canonical_currency = %config.canonical_currency,
        missing_rate_policy = ?config.missing_rate_policy,
        "Configuration loaded"
    );

    let engine = Engine::open(config).context("opening ledger store")?;
    let output = commands::run(&engine, cli.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
