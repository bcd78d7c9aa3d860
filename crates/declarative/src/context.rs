//! Reconcile context and callback traits
//!
//! These traits allow the declarative crate to be used without
//! depending on specific implementations of progress bars or prompts.

use crate::diff::Change;
use crate::error::{EntityFailure, ReconcileError};
use crate::types::ApplyResult;
use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cancellation and timing for a reconciliation run.
///
/// Clones share the cancellation flag, so one clone can be handed to each
/// worker and any of them (or a [`CancelHandle`]) can stop the rest.
/// [`check`](Self::check) runs before every remote step.
#[derive(Debug, Clone, Default)]
pub struct ReconcileContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
    call_timeout: Option<Duration>,
}

impl ReconcileContext {
    /// Create a context with no deadline and no per-call timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop starting new steps after `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Bound each remote call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Handle that cancels this context and all its clones.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    /// Cancel this context and all its clones.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail if `step` must not start.
    pub fn check(&self, step: &str) -> std::result::Result<(), ReconcileError> {
        if self.is_cancelled() {
            return Err(ReconcileError::Cancelled {
                step: step.to_string(),
            });
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ReconcileError::DeadlineExceeded {
                step: step.to_string(),
            });
        }
        Ok(())
    }

    /// Timeout for the next remote call.
    ///
    /// The smaller of the per-call timeout and the time left before the
    /// deadline.
    pub fn call_timeout(&self) -> Option<Duration> {
        let remaining = self
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()));
        match (self.call_timeout, remaining) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Cancels a [`ReconcileContext`] from outside the run (e.g. a signal handler).
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress callback for execution operations
///
/// Called from worker threads, hence `&self` and `Sync`.
pub trait ProgressCallback: Sync {
    /// Called once before applying, with the number of entities that change
    fn on_start(&self, count: usize);

    /// Called when an entity starts converging
    fn on_unit_start(&self, address: &str, change: &Change);

    /// Called when an entity finishes
    fn on_unit_complete(&self, address: &str, result: &std::result::Result<ApplyResult, EntityFailure>);

    /// Called after every entity finished
    fn on_finish(&self);
}

/// Confirmation callback for user interaction
///
/// Implement this trait to handle user confirmations.
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_start(&self, _count: usize) {}
    fn on_unit_start(&self, _address: &str, _change: &Change) {}
    fn on_unit_complete(
        &self,
        _address: &str,
        _result: &std::result::Result<ApplyResult, EntityFailure>,
    ) {
    }
    fn on_finish(&self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}
