//! # carequest
//!
//! Entry point for the assignment reconciliation tool.
//!
//! ## Startup
//!
//! 1. **Arguments** - parsed with clap
//! 2. **Tracing** - `RUST_LOG`, falling back to `--log-level`, written to stderr
//! 3. **Settings** - defaults, then `--config`, then `CAREQUEST_*` variables,
//!    then `--base-url`
//! 4. **Command** - run against the HTTP assignment store
//!
//! ## Exit status
//!
//! Zero only when every requested change was saved and the reload succeeded.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use carequest::cli::Cli;
use carequest::commands::execute_command;
use carequest::settings::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(&cli.log_level);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            warn!("Not every change was saved");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let settings = match cli.base_url {
        Some(url) => settings.with_base_url(url),
        None => settings,
    };

    let mut stdout = std::io::stdout();
    execute_command(cli.command, &settings, &mut stdout).await
}

/// Initialize tracing subscriber.
fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
