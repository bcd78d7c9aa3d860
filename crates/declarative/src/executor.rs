//! Execution engine - plans and applies entities in parallel
//!
//! Entities are independent, so both the refresh pass and the apply pass
//! fan out over a rayon pool. Within one entity every step stays
//! sequential.

use crate::context::{ConfirmCallback, ProgressCallback, ReconcileContext};
use crate::diff::{Change, DiffSummary};
use crate::error::EntityFailure;
use crate::reconcile::{Drift, PlannedUnit, Unit};
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::Result;
use rayon::prelude::*;

/// Planning result for one entity.
pub enum PlanOutcome<T> {
    /// Ready to apply.
    Planned(Box<dyn PlannedUnit<T>>),
    /// Validation or the drift read failed; the prior record is kept.
    Failed {
        /// Prior record.
        prior: Option<T>,
        /// Cause.
        failure: EntityFailure,
    },
}

impl<T> PlanOutcome<T> {
    /// Entity address.
    pub fn address(&self) -> &str {
        match self {
            Self::Planned(unit) => unit.address(),
            Self::Failed { failure, .. } => &failure.address,
        }
    }

    /// Classified change, if planning succeeded.
    pub fn change(&self) -> Option<&Change> {
        match self {
            Self::Planned(unit) => Some(unit.change()),
            Self::Failed { .. } => None,
        }
    }
}

/// Final outcome for one entity.
#[derive(Debug)]
pub struct UnitOutcome<T> {
    /// Entity address.
    pub address: String,
    /// Change that was planned; `None` when planning failed.
    pub change: Option<Change>,
    /// Drift found while refreshing.
    pub drift: Option<Drift>,
    /// Record to persist; `None` drops it.
    pub record: Option<T>,
    /// What happened.
    pub result: Result<ApplyResult, EntityFailure>,
}

/// Everything an apply run produced.
#[derive(Debug)]
pub struct ExecuteReport<T> {
    /// Per-entity outcomes, in input order.
    pub outcomes: Vec<UnitOutcome<T>>,
    /// Counts.
    pub summary: ExecuteSummary,
}

fn build_pool(jobs: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))
}

/// Validate, refresh and classify every entity
///
/// Results are returned in input order. One entity failing does not stop
/// the others.
pub fn plan_all<T: Send>(
    units: &[Box<dyn Unit<T>>],
    ctx: &ReconcileContext,
    jobs: usize,
) -> Result<Vec<PlanOutcome<T>>> {
    let pool = build_pool(jobs)?;
    let outcomes = pool.install(|| {
        units
            .par_iter()
            .map(|unit| match unit.plan(ctx) {
                Ok(planned) => PlanOutcome::Planned(planned),
                Err(failure) => PlanOutcome::Failed {
                    prior: unit.prior(),
                    failure,
                },
            })
            .collect()
    });
    Ok(outcomes)
}

/// Summarize the changes in a set of plans
pub fn summarize<T>(plans: &[PlanOutcome<T>]) -> DiffSummary {
    DiffSummary::from_changes(plans.iter().filter_map(PlanOutcome::change))
}

/// Apply planned entities with the given options and callbacks
///
/// Asks `confirm` once when there is anything to change. A dry run or a
/// declined prompt applies nothing and keeps the refreshed records.
pub fn apply_all<T, P, C>(
    plans: Vec<PlanOutcome<T>>,
    ctx: &ReconcileContext,
    opts: &ExecuteOptions,
    progress: &P,
    confirm: &mut C,
) -> Result<ExecuteReport<T>>
where
    T: Send,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let diff = summarize(&plans);

    let skip_reason = if !diff.has_changes() {
        None
    } else if opts.dry_run {
        Some("dry run")
    } else if !confirm.confirm("Apply these changes?")? {
        Some("declined")
    } else {
        None
    };

    if !diff.has_changes() || skip_reason.is_some() {
        let reason = skip_reason.unwrap_or_default();
        let outcomes: Vec<_> = plans
            .into_iter()
            .map(|plan| hold(plan, reason))
            .collect();
        return Ok(report(outcomes));
    }

    progress.on_start(diff.total());
    let pool = build_pool(opts.jobs)?;
    let outcomes = pool.install(|| {
        plans
            .into_par_iter()
            .map(|plan| run(plan, ctx, opts, progress))
            .collect()
    });
    progress.on_finish();

    Ok(report(outcomes))
}

/// Outcome for an entity that is not applied.
fn hold<T>(plan: PlanOutcome<T>, reason: &str) -> UnitOutcome<T> {
    match plan {
        PlanOutcome::Failed { prior, failure } => UnitOutcome {
            address: failure.address.clone(),
            change: None,
            drift: None,
            record: prior,
            result: Err(failure),
        },
        PlanOutcome::Planned(unit) => {
            let result = if unit.change().is_change() {
                ApplyResult::Skipped {
                    reason: reason.to_string(),
                }
            } else {
                ApplyResult::NoChange
            };
            UnitOutcome {
                address: unit.address().to_string(),
                change: Some(unit.change().clone()),
                drift: unit.drift(),
                record: unit.refreshed(),
                result: Ok(result),
            }
        }
    }
}

fn run<T, P: ProgressCallback>(
    plan: PlanOutcome<T>,
    ctx: &ReconcileContext,
    opts: &ExecuteOptions,
    progress: &P,
) -> UnitOutcome<T> {
    let unit = match plan {
        PlanOutcome::Planned(unit) => unit,
        failed => return hold(failed, ""),
    };

    let address = unit.address().to_string();
    let change = unit.change().clone();
    let drift = unit.drift();

    if change.is_change() {
        progress.on_unit_start(&address, &change);
    }
    let applied = unit.apply(ctx);
    if change.is_change() {
        progress.on_unit_complete(&address, &applied.result);
    }

    if opts.fail_fast && applied.result.is_err() && !ctx.is_cancelled() {
        log::warn!("{address} failed, cancelling remaining entities");
        ctx.cancel();
    }

    UnitOutcome {
        address,
        change: Some(change),
        drift,
        record: applied.record,
        result: applied.result,
    }
}

fn report<T>(outcomes: Vec<UnitOutcome<T>>) -> ExecuteReport<T> {
    let mut summary = ExecuteSummary::default();
    for outcome in &outcomes {
        summary.add_result(&outcome.result);
    }
    ExecuteReport { outcomes, summary }
}
