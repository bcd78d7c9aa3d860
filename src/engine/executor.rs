//! Execution engine - pushsync-specific executor with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyResult, ConfirmCallback, EntityFailure, ExecuteReport, ExecuteSummary, UnitOutcome,
};

use crate::resource::Tracked;

/// Interactive confirmation prompt
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        println!();
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} updated in place", summary.updated);
    }
    if summary.replaced > 0 {
        println!("    • {} replaced", summary.replaced);
    }
    if summary.deleted > 0 {
        println!("    • {} deleted", summary.deleted);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}

/// Print each failure with its category and advice
pub fn print_failures(report: &ExecuteReport<Tracked>) {
    let failures: Vec<&EntityFailure> = report
        .outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().err())
        .collect();
    if failures.is_empty() {
        return;
    }

    println!();
    println!("{}", "Errors:".red().bold());
    for failure in failures {
        let category = failure.error.root().category();
        println!("  {} {failure}", "✗".red());
        if failure.error.remote_state_changed() {
            println!(
                "    {} remote state was partially changed",
                "!".yellow()
            );
        }
        println!("    {} {}", format!("{category}:").dimmed(), category.advice().dimmed());
    }
}

/// Print entities skipped by a dry run or a declined prompt
pub fn print_skipped(outcomes: &[UnitOutcome<Tracked>]) {
    let reason = outcomes.iter().find_map(|o| match &o.result {
        Ok(ApplyResult::Skipped { reason }) => Some(reason.as_str()),
        _ => None,
    });
    match reason {
        Some("dry run") => {
            println!();
            println!("  {} Dry run - no changes made", "ℹ".blue());
        }
        Some(_) => {
            println!();
            println!("  {} Aborted", "✗".red());
        }
        None => {}
    }
}
