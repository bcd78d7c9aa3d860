//! The reconciliation state machine
//!
//! For one entity, [`plan`] validates the desired state, refreshes the prior
//! observation with a drift read and classifies the change. [`apply`] then
//! runs exactly the operations that change needs:
//!
//! | Change  | Calls                        | Record kept on failure |
//! |---------|------------------------------|------------------------|
//! | NoOp    | none                         | n/a                    |
//! | Create  | create                       | none                   |
//! | Update  | update                       | current                |
//! | Replace | delete, then create          | current, or none once delete succeeded |
//! | Delete  | delete                       | current                |
//!
//! [`Managed`] erases the resource type so entities of different types can
//! share one executor.

use crate::context::ReconcileContext;
use crate::diff::{Change, classify};
use crate::error::{EntityFailure, Operation, ReconcileError};
use crate::resource::Resource;
use crate::sequence::Sequence;
use crate::types::{ApplyResult, Lifecycle, ReadOutcome};
use std::sync::Arc;

/// Build an entity address, `type.name`.
pub fn address(type_name: &str, name: &str) -> String {
    format!("{type_name}.{name}")
}

/// One declared or tracked entity.
pub struct Entity<R: Resource> {
    /// Name within its type.
    pub name: String,
    /// Desired state; `None` when the entity was removed from configuration.
    pub desired: Option<R::Desired>,
    /// Last persisted observation; `None` when never created.
    pub prior: Option<R::Observed>,
}

/// Divergence found by the drift read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drift {
    /// The entity was removed outside this tool.
    Vanished,
    /// The entity was changed outside this tool.
    Changed,
}

impl Drift {
    /// Human-readable note.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Vanished => "removed outside pushsync",
            Self::Changed => "changed outside pushsync",
        }
    }
}

/// Classified change for one entity, ready to apply.
pub struct Plan<R: Resource> {
    /// Entity address.
    pub address: String,
    /// What will happen.
    pub change: Change,
    /// Drift discovered while refreshing.
    pub drift: Option<Drift>,
    /// Desired state.
    pub desired: Option<R::Desired>,
    /// Refreshed current state.
    pub current: Option<R::Observed>,
}

impl<R: Resource> std::fmt::Debug for Plan<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("address", &self.address)
            .field("change", &self.change)
            .field("drift", &self.drift)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

/// Outcome of applying a plan.
#[derive(Debug)]
pub struct Applied<O> {
    /// Observed state to persist; `None` drops the record.
    pub record: Option<O>,
    /// What happened.
    pub result: Result<ApplyResult, EntityFailure>,
}

impl<O> Applied<O> {
    fn ok(record: Option<O>, result: ApplyResult) -> Self {
        Self {
            record,
            result: Ok(result),
        }
    }

    fn failed(record: Option<O>, address: &str, operation: Operation, error: ReconcileError) -> Self {
        log::error!("{address}: {operation} failed: {error}");
        Self {
            record,
            result: Err(EntityFailure::new(address, operation, error)),
        }
    }

    /// Convert the record type.
    pub fn map<T>(self, f: impl FnOnce(O) -> T) -> Applied<T> {
        Applied {
            record: self.record.map(f),
            result: self.result,
        }
    }
}

/// Validate, refresh and classify one entity.
///
/// No remote call is made when validation fails. A failed drift read is
/// returned as an error for this entity only.
pub fn plan<R: Resource>(
    resource: &R,
    ctx: &ReconcileContext,
    entity: &Entity<R>,
) -> Result<Plan<R>, EntityFailure> {
    let address = address(resource.type_name(), &entity.name);

    if let Some(desired) = &entity.desired {
        resource
            .validate(desired)
            .map_err(|e| EntityFailure::new(&address, Operation::Validate, e))?;
    }

    let (current, drift) = match &entity.prior {
        None => (None, None),
        Some(prior) => {
            ctx.check("read")
                .map_err(|e| EntityFailure::new(&address, Operation::Read, e))?;
            match resource.read(ctx, prior) {
                Ok(ReadOutcome::Found(observed)) => {
                    let drift = (observed != *prior).then_some(Drift::Changed);
                    (Some(observed), drift)
                }
                Ok(ReadOutcome::Absent) => {
                    log::warn!("{address}: {}", Drift::Vanished.describe());
                    (None, Some(Drift::Vanished))
                }
                Err(e) => return Err(EntityFailure::new(&address, Operation::Read, e)),
            }
        }
    };

    let mut change = classify(
        resource.schema(),
        entity.desired.as_ref(),
        current.as_ref(),
    );
    if resource.lifecycle() == Lifecycle::CreateOnly {
        change = change.into_replace();
    }
    log::info!("{address}: {}", change.label());

    Ok(Plan {
        address,
        change,
        drift,
        desired: entity.desired.clone(),
        current,
    })
}

/// Run the operations a plan calls for.
pub fn apply<R: Resource>(
    resource: &R,
    ctx: &ReconcileContext,
    plan: Plan<R>,
) -> Applied<R::Observed> {
    let Plan {
        address,
        change,
        desired,
        current,
        ..
    } = plan;

    match (&change, desired.as_ref(), current) {
        (Change::NoOp, _, current) => Applied::ok(current, ApplyResult::NoChange),

        (Change::Create, Some(desired), _) => {
            if let Err(e) = ctx.check("create") {
                return Applied::failed(None, &address, Operation::Create, e);
            }
            match resource.create(ctx, desired) {
                Ok(observed) => Applied::ok(Some(observed), ApplyResult::Created),
                Err(e) => Applied::failed(None, &address, Operation::Create, e),
            }
        }

        (Change::Update { .. }, Some(desired), Some(current)) => {
            if let Err(e) = ctx.check("update") {
                return Applied::failed(Some(current), &address, Operation::Update, e);
            }
            match resource.update(ctx, desired, &current) {
                Ok(observed) => Applied::ok(Some(observed), ApplyResult::Updated),
                Err(e) => Applied::failed(Some(current), &address, Operation::Update, e),
            }
        }

        (Change::Replace { .. }, Some(desired), Some(current)) => {
            let mut seq = Sequence::new(ctx, 2);
            if let Err(e) = seq.step("delete", |_| resource.delete(ctx, &current)) {
                return Applied::failed(Some(current), &address, Operation::Replace, e);
            }
            match seq.step("create", |_| resource.create(ctx, desired)) {
                Ok(observed) => Applied::ok(Some(observed), ApplyResult::Replaced),
                Err(e) => Applied::failed(None, &address, Operation::Replace, e),
            }
        }

        (Change::Delete, _, Some(current)) => {
            if let Err(e) = ctx.check("delete") {
                return Applied::failed(Some(current), &address, Operation::Delete, e);
            }
            match resource.delete(ctx, &current) {
                Ok(()) => Applied::ok(None, ApplyResult::Deleted),
                Err(e) => Applied::failed(Some(current), &address, Operation::Delete, e),
            }
        }

        (_, _, current) => {
            log::error!("{address}: inconsistent plan for {}", change.label());
            Applied::ok(
                current,
                ApplyResult::Skipped {
                    reason: "inconsistent plan".to_string(),
                },
            )
        }
    }
}

// =============================================================================
// Type erasure
// =============================================================================

/// An entity of any resource type, recording state as `T`.
pub trait Unit<T>: Send + Sync {
    /// Entity address.
    fn address(&self) -> &str;

    /// Record to keep when planning fails.
    fn prior(&self) -> Option<T>;

    /// Validate, refresh and classify.
    fn plan(&self, ctx: &ReconcileContext) -> Result<Box<dyn PlannedUnit<T>>, EntityFailure>;
}

/// A planned entity of any resource type.
pub trait PlannedUnit<T>: Send {
    /// Entity address.
    fn address(&self) -> &str;

    /// Classified change.
    fn change(&self) -> &Change;

    /// Drift found while refreshing.
    fn drift(&self) -> Option<Drift>;

    /// Refreshed current state, as a record.
    fn refreshed(&self) -> Option<T>;

    /// Run the planned operations.
    fn apply(self: Box<Self>, ctx: &ReconcileContext) -> Applied<T>;
}

/// A resource type paired with one of its entities.
pub struct Managed<R: Resource> {
    resource: Arc<R>,
    address: String,
    entity: Entity<R>,
}

impl<R: Resource> Managed<R> {
    /// Pair `entity` with the resource type that manages it.
    pub fn new(resource: Arc<R>, entity: Entity<R>) -> Self {
        let address = address(resource.type_name(), &entity.name);
        Self {
            resource,
            address,
            entity,
        }
    }
}

struct ManagedPlan<R: Resource> {
    resource: Arc<R>,
    plan: Plan<R>,
}

impl<R, T> Unit<T> for Managed<R>
where
    R: Resource + 'static,
    T: From<R::Observed> + 'static,
{
    fn address(&self) -> &str {
        &self.address
    }

    fn prior(&self) -> Option<T> {
        self.entity.prior.clone().map(T::from)
    }

    fn plan(&self, ctx: &ReconcileContext) -> Result<Box<dyn PlannedUnit<T>>, EntityFailure> {
        let plan = plan(self.resource.as_ref(), ctx, &self.entity)?;
        Ok(Box::new(ManagedPlan {
            resource: Arc::clone(&self.resource),
            plan,
        }))
    }
}

impl<R, T> PlannedUnit<T> for ManagedPlan<R>
where
    R: Resource + 'static,
    T: From<R::Observed>,
{
    fn address(&self) -> &str {
        &self.plan.address
    }

    fn change(&self) -> &Change {
        &self.plan.change
    }

    fn drift(&self) -> Option<Drift> {
        self.plan.drift
    }

    fn refreshed(&self) -> Option<T> {
        self.plan.current.clone().map(T::from)
    }

    fn apply(self: Box<Self>, ctx: &ReconcileContext) -> Applied<T> {
        let ManagedPlan { resource, plan } = *self;
        apply(resource.as_ref(), ctx, plan).map(T::from)
    }
}
