//! Core types for declarative resource management

use crate::error::EntityFailure;
use serde::{Deserialize, Serialize};

/// How a resource type behaves after creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Read, updated in place, deleted
    Updatable,
    /// Created once; cannot be read back, updated or withdrawn
    ///
    /// Any change is a replace. Read and delete are no-ops.
    CreateOnly,
}

/// Result of a drift read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<O> {
    /// The entity exists with this observed state
    Found(O),
    /// The entity no longer exists remotely
    Absent,
}

/// Result of converging one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Entity was created
    Created,
    /// Entity was updated in place
    Updated,
    /// Entity was deleted and created again
    Replaced,
    /// Entity was deleted
    Deleted,
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Updated | Self::Replaced | Self::Deleted
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.replaced + self.deleted
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of entities processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &Result<ApplyResult, EntityFailure>) {
        match result {
            Ok(ApplyResult::NoChange) => self.no_change += 1,
            Ok(ApplyResult::Created) => self.created += 1,
            Ok(ApplyResult::Updated) => self.updated += 1,
            Ok(ApplyResult::Replaced) => self.replaced += 1,
            Ok(ApplyResult::Deleted) => self.deleted += 1,
            Ok(ApplyResult::Skipped { .. }) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel workers
    pub jobs: usize,
    /// Cancel remaining entities after the first failure
    pub fail_fast: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            fail_fast: false,
        }
    }
}
