//! Change classification between desired and current state

use crate::schema::{AttrValue, Attributes, Mutability, Schema};
use serde::Serialize;
use std::collections::BTreeMap;

/// One attribute that differs between current and desired state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    /// Attribute name.
    pub field: &'static str,
    /// Declared mutability.
    pub mutability: Mutability,
    /// Whether values must be masked when displayed.
    pub sensitive: bool,
    /// Current value.
    pub before: AttrValue,
    /// Desired value.
    pub after: AttrValue,
}

impl FieldChange {
    /// Whether this change alone forces replace.
    pub fn forces_replace(&self) -> bool {
        self.mutability == Mutability::Immutable
    }
}

/// What must happen to converge one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Change {
    /// Already converged.
    NoOp,
    /// Desired but not present remotely.
    Create,
    /// Present, only mutable fields differ.
    Update { changes: Vec<FieldChange> },
    /// Present, at least one immutable field differs.
    Replace { changes: Vec<FieldChange> },
    /// Present but no longer desired.
    Delete,
}

impl Change {
    /// Whether any remote operation is needed.
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }

    /// Plan symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::NoOp => " ",
            Self::Create => "+",
            Self::Update { .. } => "~",
            Self::Replace { .. } => "-/+",
            Self::Delete => "-",
        }
    }

    /// Short verb for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoOp => "no change",
            Self::Create => "create",
            Self::Update { .. } => "update in place",
            Self::Replace { .. } => "replace",
            Self::Delete => "delete",
        }
    }

    /// Field-level changes, empty for create/delete/no-op.
    pub fn field_changes(&self) -> &[FieldChange] {
        match self {
            Self::Update { changes } | Self::Replace { changes } => changes,
            _ => &[],
        }
    }

    /// Escalate an update to a replace.
    ///
    /// Used for entities that cannot be changed once created.
    pub fn into_replace(self) -> Self {
        match self {
            Self::Update { changes } => Self::Replace { changes },
            other => other,
        }
    }
}

/// Classify the change needed to move `current` to `desired`.
///
/// Computed fields are never compared. A field missing from one side is
/// compared as unset. Any differing immutable field makes the whole change
/// a replace; otherwise any differing mutable field makes it an update.
pub fn classify<D, C>(schema: &Schema, desired: Option<&D>, current: Option<&C>) -> Change
where
    D: Attributes + ?Sized,
    C: Attributes + ?Sized,
{
    let (desired, current) = match (desired, current) {
        (None, None) => return Change::NoOp,
        (Some(_), None) => return Change::Create,
        (None, Some(_)) => return Change::Delete,
        (Some(d), Some(c)) => (d, c),
    };

    let mut before: BTreeMap<&'static str, AttrValue> = current.attributes().into_iter().collect();
    let mut changes = Vec::new();

    for (name, after) in desired.attributes() {
        let mutability = schema.mutability(name);
        let prior = before.remove(name).unwrap_or(AttrValue::Null);
        if mutability == Mutability::Computed || prior == after {
            continue;
        }
        changes.push(FieldChange {
            field: name,
            mutability,
            sensitive: schema.is_sensitive(name),
            before: prior,
            after,
        });
    }

    // Fields only the current side knows about were cleared in desired.
    for (name, prior) in before {
        let mutability = schema.mutability(name);
        if mutability == Mutability::Computed || prior.is_null() {
            continue;
        }
        changes.push(FieldChange {
            field: name,
            mutability,
            sensitive: schema.is_sensitive(name),
            before: prior,
            after: AttrValue::Null,
        });
    }

    if changes.is_empty() {
        Change::NoOp
    } else if changes.iter().any(FieldChange::forces_replace) {
        Change::Replace { changes }
    } else {
        Change::Update { changes }
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Entities to create
    pub creates: usize,
    /// Entities to update in place
    pub updates: usize,
    /// Entities to replace
    pub replaces: usize,
    /// Entities to delete
    pub deletes: usize,
    /// Entities already converged
    pub unchanged: usize,
}

impl DiffSummary {
    /// Create a summary from a list of changes
    pub fn from_changes<'a>(changes: impl IntoIterator<Item = &'a Change>) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change {
                Change::NoOp => summary.unchanged += 1,
                Change::Create => summary.creates += 1,
                Change::Update { .. } => summary.updates += 1,
                Change::Replace { .. } => summary.replaces += 1,
                Change::Delete => summary.deletes += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.replaces + self.deletes
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}
