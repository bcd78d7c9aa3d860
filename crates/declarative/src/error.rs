//! Reconciliation errors
//!
//! Every failure names the call or step it came from so the caller can
//! tell "nothing happened" from "step 1 of 2 happened".

use std::fmt;

/// Result type alias for reconciliation.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected locally, nothing was sent.
    Validation,
    /// The remote answered and said no.
    Rejected,
    /// The remote could not be asked.
    Transport,
    /// Some steps succeeded before one failed.
    Partial,
    /// Stopped by cancellation or deadline.
    Cancelled,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport | Self::Cancelled)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid configuration",
            Self::Rejected => "Rejected by remote service",
            Self::Transport => "Could not reach remote service",
            Self::Partial => "Partially applied",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Fix the named field and re-run",
            Self::Rejected => "Read the remote messages; they name the offending value",
            Self::Transport => "Check your network connection and re-run",
            Self::Partial => "Remote state was changed; re-run to converge",
            Self::Cancelled => "Re-run to finish the remaining steps",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Operation being attempted when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Local validation.
    Validate,
    /// Drift read.
    Read,
    /// Create.
    Create,
    /// In-place update.
    Update,
    /// Delete then create.
    Replace,
    /// Delete.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validate => "validate",
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

/// Errors from reconciling a single entity.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A field violates a local constraint.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The remote answered with a failure status.
    #[error("{call} rejected: {}", join_messages(.messages))]
    RemoteRejection {
        /// Remote call that was rejected.
        call: String,
        /// Diagnostic messages, verbatim.
        messages: Vec<String>,
        /// Remote request identifier, when given.
        request: Option<String>,
    },

    /// The round trip could not be completed.
    #[error("{call} failed: {message}")]
    Transport {
        /// Remote call that failed.
        call: String,
        /// Cause.
        message: String,
    },

    /// A multi-step operation failed after at least one step succeeded.
    #[error("{failed_step} failed after {} of {total} steps succeeded ({}): {source}", .completed.len(), .completed.join(", "))]
    PartialSequence {
        /// Steps that succeeded, in order.
        completed: Vec<String>,
        /// Step that failed.
        failed_step: String,
        /// Planned step count.
        total: usize,
        /// Cause.
        source: Box<ReconcileError>,
    },

    /// Cancelled before a step started.
    #[error("cancelled before {step}")]
    Cancelled {
        /// Step that was not started.
        step: String,
    },

    /// The deadline passed before a step started.
    #[error("deadline exceeded before {step}")]
    DeadlineExceeded {
        /// Step that was not started.
        step: String,
    },

    /// The resource type does not support this operation.
    #[error("{operation} is not supported for {type_name}")]
    Unsupported {
        /// Operation requested.
        operation: Operation,
        /// Resource type.
        type_name: &'static str,
    },
}

fn join_messages(messages: &[String]) -> String {
    if messages.is_empty() {
        "no diagnostic messages returned".to_string()
    } else {
        messages.join("; ")
    }
}

impl ReconcileError {
    /// Create a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } | Self::Unsupported { .. } => ErrorCategory::Validation,
            Self::RemoteRejection { .. } => ErrorCategory::Rejected,
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::PartialSequence { .. } => ErrorCategory::Partial,
            Self::Cancelled { .. } | Self::DeadlineExceeded { .. } => ErrorCategory::Cancelled,
        }
    }

    /// Whether remote state may have changed before this error.
    #[must_use]
    pub fn remote_state_changed(&self) -> bool {
        matches!(self, Self::PartialSequence { .. })
    }

    /// Innermost cause, skipping partial-sequence wrappers.
    #[must_use]
    pub fn root(&self) -> &ReconcileError {
        match self {
            Self::PartialSequence { source, .. } => source.root(),
            other => other,
        }
    }
}

/// A failure tied to the entity and operation it came from.
#[derive(Debug, thiserror::Error)]
#[error("{address}: {operation} failed: {error}")]
pub struct EntityFailure {
    /// Entity address, `type.name`.
    pub address: String,
    /// Operation attempted.
    pub operation: Operation,
    /// Cause.
    #[source]
    pub error: ReconcileError,
}

impl EntityFailure {
    /// Create an entity failure.
    pub fn new(address: impl Into<String>, operation: Operation, error: ReconcileError) -> Self {
        Self {
            address: address.into(),
            operation,
            error,
        }
    }
}
