//! # Scuffle Engine
//!
//! Headless runner for the Scuffle simulation core.
//!
//! This binary ties the pieces together:
//! - Config: TOML match setup and simulation rules
//! - Scripts: JSON input scripts standing in for controllers
//! - Summary: JSON report of the finished match on stdout
//!
//! Usage: `scuffle [config.toml]` (defaults to `scuffle.toml`), or
//! `scuffle --init [config.toml]` to write the default configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod script;
mod summary;

use anyhow::Result;
use tracing::{info, warn, Subscriber};
use tracing_subscriber::{fmt, fmt::MakeWriter, prelude::*, reload, EnvFilter, Registry};

use crate::config::EngineConfig;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing before the config loads so its warnings are kept.
    let (filter, from_env) = initial_filter();
    let (subscriber, filter_handle) = build_subscriber(filter, std::io::stderr);
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = std::env::args().skip(1);
    let mut config = match args.next() {
        Some(flag) if flag == "--init" => {
            let path = args.next().unwrap_or_else(|| config::CONFIG_FILE.to_string());
            EngineConfig::default().save_to(&path)?;
            println!("Wrote default configuration to {path}");
            return Ok(());
        },
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };
    config.validate();

    if !from_env {
        apply_config_filter(&filter_handle, &config.log_filter)?;
    }

    info!("Scuffle starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let summary = app::run(&config)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    match summary.winning_team() {
        Some(team) => info!("Team {} wins after {} ticks", team, summary.ticks),
        None => info!("Match ended after {} ticks without a winner", summary.ticks),
    }
    Ok(())
}

/// `RUST_LOG` if set, else the default directive. The flag tells whether
/// the environment chose it.
fn initial_filter() -> (EnvFilter, bool) {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(config::DEFAULT_LOG_FILTER), false),
    }
}

fn build_subscriber<W>(
    filter: EnvFilter,
    writer: W,
) -> (impl Subscriber + Send + Sync + 'static, FilterHandle)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer));
    (subscriber, handle)
}

/// Swaps in the configured filter. An unparsable filter keeps the current one.
fn apply_config_filter(handle: &FilterHandle, log_filter: &str) -> Result<()> {
    match EnvFilter::try_new(log_filter) {
        Ok(filter) => handle.reload(filter)?,
        Err(e) => warn!("Invalid log filter '{log_filter}': {e}"),
    }
    Ok(())
}
