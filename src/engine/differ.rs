//! Plan display

use crate::resource::Tracked;
use colored::{ColoredString, Colorize};
use declarative::{Change, DiffSummary, FieldChange, PlanOutcome, summarize};

const MASK: &str = "(sensitive)";

/// Display a set of plans in a user-friendly format
pub fn display_plan(plans: &[PlanOutcome<Tracked>]) {
    let summary = summarize(plans);
    let failed = plans
        .iter()
        .filter(|p| matches!(p, PlanOutcome::Failed { .. }))
        .count();

    if !summary.has_changes() && failed == 0 {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");

    for plan in plans {
        match plan {
            PlanOutcome::Planned(unit) => {
                let change = unit.change();
                if !change.is_change() && unit.drift().is_none() {
                    continue;
                }
                println!(
                    "│ {} {:<36} {}",
                    symbol(change),
                    unit.address(),
                    change.label().dimmed()
                );
                if let Some(drift) = unit.drift() {
                    println!("│     {} {}", "!".yellow(), drift.describe().yellow());
                }
                for field in change.field_changes() {
                    let line = describe_field(field);
                    if field.forces_replace() {
                        println!("│     {} {}", line, "(forces replacement)".red());
                    } else {
                        println!("│     {line}");
                    }
                }
            }
            PlanOutcome::Failed { failure, .. } => {
                println!("│ {} {:<36} {}", "✗".red(), failure.address, failure.error);
            }
        }
    }

    println!("│");
    println!("├─────────────────────────────────────────────────────┤");
    println!("│ {}", summary_line(&summary).bold());
    if failed > 0 {
        println!("│ {} could not be planned", failed.to_string().red());
    }
    println!("└─────────────────────────────────────────────────────┘");
}

fn symbol(change: &Change) -> ColoredString {
    match change {
        Change::NoOp => " ".normal(),
        Change::Create => "+".green(),
        Change::Update { .. } => "~".yellow(),
        Change::Replace { .. } => "-/+".magenta(),
        Change::Delete => "-".red(),
    }
}

/// `field: before → after`, masking sensitive values
pub fn describe_field(change: &FieldChange) -> String {
    if change.sensitive {
        return format!("{}: {MASK} → {MASK}", change.field);
    }
    format!("{}: {} → {}", change.field, change.before, change.after)
}

/// One-line plan summary
pub fn summary_line(summary: &DiffSummary) -> String {
    format!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete",
        summary.creates, summary.updates, summary.replaces, summary.deletes
    )
}
