//! Command handlers
//!
//! Each handler runs one service operation and renders the outcome for the
//! terminal. Rendering is kept in pure functions so it can be tested without
//! a remote service.

mod render;

use std::process::ExitCode;

use anyhow::Context as _;
use tracing::{error, warn};

pub use render::{render_pass, render_plan, render_purge};

use crate::cli::Commands;
use crate::context::AppContext;

/// Dispatch a parsed command.
///
/// # Errors
/// Returns an error if the instance lock is held elsewhere or the operation
/// aborts before issuing edits.
pub async fn execute(context: &AppContext, command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Sync { strict, json } => run_sync(context, strict, json).await,
        Commands::Plan { json } => run_plan(context, json).await,
        Commands::Purge { yes } => run_purge(context, yes).await,
    }
}

#[allow(clippy::print_stdout)]
async fn run_sync(context: &AppContext, strict: bool, json: bool) -> anyhow::Result<ExitCode> {
    let _lock = context.acquire_lock()?;

    let report = context.sync.run_pass().await.map_err(|err| {
        error!(kind = err.kind(), error = %err, "buffer sync pass aborted");
        err
    })?;

    println!("{}", render_pass(&report, json));

    if strict && !report.is_clean() {
        warn!(failures = report.failures.len(), "strict mode: reporting failure exit status");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::print_stdout)]
async fn run_plan(context: &AppContext, json: bool) -> anyhow::Result<ExitCode> {
    let planned = context.sync.plan().await.context("could not compute plan")?;
    println!("{}", render_plan(&planned, json));
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::print_stdout)]
async fn run_purge(context: &AppContext, confirmed: bool) -> anyhow::Result<ExitCode> {
    if !confirmed {
        anyhow::bail!("purge deletes every buffer feature; re-run with --yes to confirm");
    }

    let _lock = context.acquire_lock()?;
    let report = context.sync.purge().await.context("purge aborted")?;

    println!("{}", render_purge(&report));
    Ok(if report.failures.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
