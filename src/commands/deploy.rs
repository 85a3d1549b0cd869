//! Plan, apply and destroy deployments.

use crate::Context;
use crate::commands;
use crate::progress::{self, SpinnerObserver};
use crate::ui;
use anyhow::Result;
use colored::Colorize;
use deployment::{ChangeAction, ChangeRequest, ComponentChange, Plan};
use std::path::Path;

pub fn plan(ctx: &Context, file: &Path, id: Option<&str>) -> Result<()> {
    let desired = commands::load_desired(file)?;
    let client = commands::client(ctx, None);

    let request = client.plan(&desired, id).map_err(commands::report)?;
    display_plan(&request, ctx.verbose > 0);
    Ok(())
}

pub fn apply(ctx: &Context, file: &Path, id: Option<&str>, dry_run: bool) -> Result<()> {
    let desired = commands::load_desired(file)?;

    let request = commands::client(ctx, None)
        .plan(&desired, id)
        .map_err(commands::report)?;
    display_plan(&request, ctx.verbose > 0);

    if request.is_noop() {
        return Ok(());
    }
    if dry_run {
        println!();
        ui::info("Dry run: nothing was submitted");
        return Ok(());
    }

    let action = if id.is_some() { "Updating" } else { "Creating" };
    let pb = progress::spinner(&format!("{action} {}...", desired.name), ctx.quiet);
    let client = commands::client(
        ctx,
        Some(Box::new(SpinnerObserver::new(pb.clone(), action))),
    );

    let result = match id {
        Some(id) => client.update(id, &desired),
        None => client.create(&desired),
    };
    let applied = match result {
        Ok(applied) => applied,
        Err(e) => {
            progress::finish_error(&pb, &format!("{action} {} failed", desired.name));
            return Err(commands::report(e));
        }
    };

    progress::finish_success(&pb, &format!("Deployment {} is stable", applied.id));
    if !applied.unhealthy.is_empty() {
        ui::warn(&format!(
            "Unhealthy after apply: {}",
            ui::join_or_dash(&applied.unhealthy)
        ));
    }
    for (kind, component) in &applied.state.components {
        if !component.https_endpoint.is_empty() {
            ui::kv(kind.name(), &component.https_endpoint);
        }
    }
    Ok(())
}

pub fn destroy(ctx: &Context, id: &str) -> Result<()> {
    let pb = progress::spinner(&format!("Shutting down {id}..."), ctx.quiet);
    let client = commands::client(
        ctx,
        Some(Box::new(SpinnerObserver::new(pb.clone(), "Shutting down"))),
    );

    match client.delete(id) {
        Ok(()) => {
            progress::finish_success(&pb, &format!("Deployment {id} is gone"));
            Ok(())
        }
        Err(e) => {
            progress::finish_error(&pb, &format!("Shutting down {id} failed"));
            Err(commands::report(e))
        }
    }
}

/// Display a change request as a diff
fn display_plan(request: &ChangeRequest, show_unchanged: bool) {
    let summary = request.summary();
    if !summary.has_changes() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Deployment Plan".bold()
    );
    println!("│");
    println!("│ {} {}", request.name.bold(), format!("({})", request.region).dimmed());

    for change in &request.components {
        if !change.action.is_change() && !show_unchanged {
            continue;
        }
        println!(
            "│   {} {:<18} {:<24} {}",
            symbol(change.action),
            change.kind.name(),
            change.ref_id,
            describe(change).dimmed()
        );
    }
    println!("│");

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} create, {} update, {} remove)",
        summary.total().to_string().bold(),
        summary.creates.to_string().green(),
        summary.updates.to_string().yellow(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn symbol(action: ChangeAction) -> colored::ColoredString {
    match action {
        ChangeAction::Create => "+".green(),
        ChangeAction::Remove => "-".red(),
        ChangeAction::Resize | ChangeAction::TopologyChange | ChangeAction::VersionChange => {
            "~".yellow()
        }
        ChangeAction::NoChange => "=".dimmed(),
    }
}

/// One-line description of what a component change does
fn describe(change: &ComponentChange) -> String {
    let label = match change.action {
        ChangeAction::Create => "(new)",
        ChangeAction::Remove => return "(will remove)".to_string(),
        ChangeAction::Resize => "(resize)",
        ChangeAction::TopologyChange => "(topology)",
        ChangeAction::VersionChange => "(version)",
        ChangeAction::NoChange => "(unchanged)",
    };
    match &change.request {
        Some(request) => format!("{label} → {}", plan_summary(&request.plan)),
        None => label.to_string(),
    }
}

fn plan_summary(plan: &Plan) -> String {
    let elements: Vec<String> = plan
        .provisioned()
        .map(|el| {
            format!(
                "{} × {}z",
                deployment::size::encode(el.size_units()),
                el.zone_count
            )
        })
        .collect();
    format!("{} [{}]", plan.version, elements.join(", "))
}
