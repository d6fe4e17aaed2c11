//! CLI command handlers.
//!
//! Handlers write their output to the given writer and return whether the
//! command fully succeeded. Logs go to stderr through `tracing`.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use carequest_api::HttpAssignmentApi;
use carequest_core::{Assignment, CategoryId, DesiredAssignmentList, Priority, Target};
use carequest_reconciler::{CommitOutcome, Plan, Reconciler, ReconcilerBuilder};
use serde::Serialize;
use tracing::info;

use crate::cli::{Commands, OrderArgs};
use crate::settings::Settings;

/// Execute a CLI command.
///
/// Returns `Ok(false)` when the command ran but not every change was saved.
///
/// # Errors
///
/// Returns an error if the command could not run: bad input, unreachable
/// store, or invalid configuration.
pub async fn execute_command(
    command: Commands,
    settings: &Settings,
    out: &mut dyn Write,
) -> Result<bool> {
    match command {
        Commands::List { target, json } => cmd_list(settings, target.target()?, json, out).await,

        Commands::Plan {
            target,
            order,
            json,
        } => cmd_plan(settings, target.target()?, &order, json, out).await,

        Commands::Apply {
            target,
            order,
            json,
        } => cmd_apply(settings, target.target()?, &order, json, out).await,

        Commands::AssignCategory {
            target,
            category,
            priority,
            json,
        } => {
            let priority = Priority::new(priority)?;
            cmd_assign_category(
                settings,
                target.target()?,
                CategoryId::new(category),
                priority,
                json,
                out,
            )
            .await
        }
    }
}

/// Build a reconciler against the configured HTTP store.
///
/// `allow_empty` lifts the configured refusal of empty desired orders.
///
/// # Errors
///
/// Returns an error if the API client cannot be built.
pub fn build_reconciler(settings: &Settings, allow_empty: bool) -> Result<Reconciler> {
    let api = HttpAssignmentApi::with_config(settings.api.clone())
        .context("Failed to create assignment API client")?;

    let reconciler = ReconcilerBuilder::new()
        .with_api(Arc::new(api))
        .with_config(settings.reconciler.config(allow_empty))
        .build()?;

    Ok(reconciler)
}

async fn cmd_list(
    settings: &Settings,
    target: Target,
    json: bool,
    out: &mut dyn Write,
) -> Result<bool> {
    let reconciler = build_reconciler(settings, false)?;
    let rows = reconciler
        .known(target)
        .await
        .with_context(|| format!("Failed to list assignments for {target}"))?;

    if json {
        write_json(out, &rows)?;
    } else {
        write_assignments(out, target, &rows)?;
    }
    Ok(true)
}

async fn cmd_plan(
    settings: &Settings,
    target: Target,
    order: &OrderArgs,
    json: bool,
    out: &mut dyn Write,
) -> Result<bool> {
    let reconciler = build_reconciler(settings, order.allow_empty)?;
    let mut session = reconciler.session();
    session
        .load(target)
        .await
        .with_context(|| format!("Failed to load assignments for {target}"))?;

    let desired =
        DesiredAssignmentList::from_question_ids(target, order.question_ids(), session.known());
    session.set_desired(desired)?;
    let plan = session.plan()?;

    if json {
        write_json(out, &plan)?;
    } else {
        write_plan(out, &plan)?;
    }
    Ok(true)
}

async fn cmd_apply(
    settings: &Settings,
    target: Target,
    order: &OrderArgs,
    json: bool,
    out: &mut dyn Write,
) -> Result<bool> {
    let reconciler = build_reconciler(settings, order.allow_empty)?;
    let mut session = reconciler.session();
    session
        .load(target)
        .await
        .with_context(|| format!("Failed to load assignments for {target}"))?;

    let desired =
        DesiredAssignmentList::from_question_ids(target, order.question_ids(), session.known());
    session.set_desired(desired)?;
    let outcome = session.commit().await?;

    info!(%target, outcome = %outcome.report.summary(), "Apply finished");

    if json {
        write_json(out, &outcome)?;
    } else {
        write_outcome(out, target, &outcome)?;
    }
    Ok(outcome.is_complete())
}

async fn cmd_assign_category(
    settings: &Settings,
    target: Target,
    category_id: CategoryId,
    priority: Priority,
    json: bool,
    out: &mut dyn Write,
) -> Result<bool> {
    let reconciler = build_reconciler(settings, false)?;
    let rows = reconciler
        .assign_category(category_id, target, priority)
        .await
        .with_context(|| format!("Failed to assign category {category_id} to {target}"))?;

    if json {
        write_json(out, &rows)?;
    } else {
        write_assignments(out, target, &rows)?;
    }
    Ok(true)
}

fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_plan(out: &mut dyn Write, plan: &Plan) -> Result<()> {
    if plan.is_empty() {
        writeln!(out, "No changes needed for {}", plan.target)?;
    } else {
        writeln!(out, "{plan}")?;
    }
    Ok(())
}

fn write_outcome(out: &mut dyn Write, target: Target, outcome: &CommitOutcome) -> Result<()> {
    writeln!(out, "{}", outcome.report)?;
    match outcome.assignments() {
        Some(rows) => write_assignments(out, target, rows),
        None => {
            writeln!(
                out,
                "Could not reload assignments for {target}; run `carequest list` before editing again"
            )?;
            Ok(())
        }
    }
}

fn write_assignments(out: &mut dyn Write, target: Target, rows: &[Assignment]) -> Result<()> {
    if rows.is_empty() {
        writeln!(out, "No assignments for {target}")?;
        return Ok(());
    }

    writeln!(out, "Assignments for {target}:")?;
    for row in rows {
        writeln!(
            out,
            "  {}. question {} (assignment {})",
            row.priority, row.question_id, row.id
        )?;
    }
    Ok(())
}
