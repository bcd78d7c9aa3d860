//! Resource trait for declarative state management
//!
//! A resource type knows how to create, read, update and delete one kind
//! of remote entity. It does not decide *which* of those to do; that is
//! [`crate::reconcile`]'s job, driven by the type's [`Schema`].

use crate::context::ReconcileContext;
use crate::error::{Operation, ReconcileError};
use crate::schema::{Attributes, Schema};
use crate::types::{Lifecycle, ReadOutcome};
use std::fmt;

/// Core trait for reconcilable resource types
///
/// Implementations are stateless apart from shared clients, and are used
/// from several worker threads at once.
///
/// # Example
///
/// ```ignore
/// impl Resource for MembershipResource {
///     type Desired = MembershipSpec;
///     type Observed = MembershipRecord;
///
///     fn schema(&self) -> &'static Schema { &MEMBERSHIP_SCHEMA }
///
///     fn create(&self, ctx: &ReconcileContext, desired: &MembershipSpec)
///         -> Result<MembershipRecord, ReconcileError> { ... }
///     fn read(&self, ctx: &ReconcileContext, prior: &MembershipRecord)
///         -> Result<ReadOutcome<MembershipRecord>, ReconcileError> { ... }
///     fn update(&self, ctx: &ReconcileContext, desired: &MembershipSpec, prior: &MembershipRecord)
///         -> Result<MembershipRecord, ReconcileError> { ... }
///     fn delete(&self, ctx: &ReconcileContext, prior: &MembershipRecord)
///         -> Result<(), ReconcileError> { ... }
/// }
/// ```
pub trait Resource: Send + Sync {
    /// Desired state, as declared by the user
    type Desired: Attributes + Clone + fmt::Debug + Send + Sync;

    /// Observed state, as last seen remotely and persisted
    ///
    /// Exposes the same attribute names as `Desired`, plus computed ones.
    type Observed: Attributes + Clone + PartialEq + fmt::Debug + Send + Sync;

    /// Field metadata table
    fn schema(&self) -> &'static Schema;

    /// Resource type name, the first address segment
    fn type_name(&self) -> &'static str {
        self.schema().type_name
    }

    /// Lifecycle tag
    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Updatable
    }

    /// Local checks, run before any remote call
    fn validate(&self, _desired: &Self::Desired) -> Result<(), ReconcileError> {
        Ok(())
    }

    /// Create the entity remotely
    fn create(
        &self,
        ctx: &ReconcileContext,
        desired: &Self::Desired,
    ) -> Result<Self::Observed, ReconcileError>;

    /// Reconstruct current remote state from the key in `prior`
    ///
    /// `Absent` means the entity is gone, not that the read failed.
    fn read(
        &self,
        ctx: &ReconcileContext,
        prior: &Self::Observed,
    ) -> Result<ReadOutcome<Self::Observed>, ReconcileError>;

    /// Apply mutable-field changes in place
    ///
    /// Only called when every differing field is mutable.
    fn update(
        &self,
        _ctx: &ReconcileContext,
        _desired: &Self::Desired,
        _prior: &Self::Observed,
    ) -> Result<Self::Observed, ReconcileError> {
        Err(ReconcileError::Unsupported {
            operation: Operation::Update,
            type_name: self.type_name(),
        })
    }

    /// Delete the entity remotely
    fn delete(&self, ctx: &ReconcileContext, prior: &Self::Observed) -> Result<(), ReconcileError>;
}
