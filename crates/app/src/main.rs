//! NestBuffer - keeps nest buffer polygons in sync with survey points
//!
//! Main entry point for the command-line tool.

use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use nestbuffer_app::cli::Cli;
use nestbuffer_app::{commands, logging, AppContext};

#[tokio::main]
async fn main() -> ExitCode {
    // .env must be loaded before clap reads NESTBUFFER_* fallbacks
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(err) = logging::init(cli.log_format) {
        eprintln!("failed to initialize logging: {err:#}");
        return ExitCode::FAILURE;
    }

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "could not load .env file"),
    }

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "nestbuffer failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = nestbuffer_infra::config::load(cli.config, cli.credentials)
        .context("failed to load configuration")?;
    let context = AppContext::new(config)?;

    commands::execute(&context, cli.command).await
}
