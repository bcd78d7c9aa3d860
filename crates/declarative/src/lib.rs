//! # Declarative
//!
//! A framework for reconciling declared state against a remote service.
//!
//! This crate decides, for each declared entity, which of {no-op, create,
//! update, replace, delete} converges it, and runs that decision with
//! cancellation and per-step failure tagging.
//!
//! ## Core Concepts
//!
//! - **Schema**: A per-type field table marking each attribute immutable,
//!   mutable or computed
//! - **Resource**: Create, read, update and delete for one entity type
//! - **Plan**: Validation, a drift read and a classified [`Change`]
//! - **Executor**: Plans and applies many entities in parallel
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     AutoConfirm, Entity, ExecuteOptions, Managed, NoProgress, ReconcileContext, Unit,
//!     apply_all, plan_all,
//! };
//! use std::sync::Arc;
//!
//! let resource = Arc::new(MembershipResource::new(client));
//! let units: Vec<Box<dyn Unit<MembershipRecord>>> = vec![Box::new(Managed::new(
//!     Arc::clone(&resource),
//!     Entity { name: "alice".into(), desired: Some(spec), prior: None },
//! ))];
//!
//! let ctx = ReconcileContext::new();
//! let plans = plan_all(&units, &ctx, 4)?;
//! let report = apply_all(plans, &ctx, &ExecuteOptions::default(), &NoProgress, &mut AutoConfirm)?;
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod reconcile;
pub mod resource;
pub mod schema;
pub mod sequence;
pub mod types;

// Re-export main types at crate root
pub use context::{
    AutoConfirm, AutoDecline, CancelHandle, ConfirmCallback, NoProgress, ProgressCallback,
    ReconcileContext,
};
pub use diff::{Change, DiffSummary, FieldChange, classify};
pub use error::{EntityFailure, ErrorCategory, Operation, ReconcileError};
pub use executor::{ExecuteReport, PlanOutcome, UnitOutcome, apply_all, plan_all, summarize};
pub use planner::{Target, filter_by_target};
pub use reconcile::{Applied, Drift, Entity, Managed, Plan, PlannedUnit, Unit, address, apply, plan};
pub use resource::Resource;
pub use schema::{AttrValue, Attributes, Field, Mutability, Schema};
pub use sequence::Sequence;
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, Lifecycle, ReadOutcome};
