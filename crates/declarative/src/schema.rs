//! Field metadata tables and attribute views
//!
//! Every resource type declares a static [`Schema`]: one [`Field`] per
//! attribute with its [`Mutability`]. The generic diff in [`crate::diff`]
//! reads this table to decide between in-place update and replace, so no
//! resource hand-codes per-field branches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a field may change on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutability {
    /// A change forces the entity to be replaced.
    Immutable,
    /// A change is applied in place.
    Mutable,
    /// Produced by the remote; never compared.
    Computed,
}

/// One row of a metadata table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Attribute name, as it appears in configuration.
    pub name: &'static str,
    /// Change behaviour.
    pub mutability: Mutability,
    /// Whether values must be masked when displayed.
    pub sensitive: bool,
}

impl Field {
    /// A field whose change forces replace.
    pub const fn immutable(name: &'static str) -> Self {
        Self {
            name,
            mutability: Mutability::Immutable,
            sensitive: false,
        }
    }

    /// A field updated in place.
    pub const fn mutable(name: &'static str) -> Self {
        Self {
            name,
            mutability: Mutability::Mutable,
            sensitive: false,
        }
    }

    /// A read-only output.
    pub const fn computed(name: &'static str) -> Self {
        Self {
            name,
            mutability: Mutability::Computed,
            sensitive: false,
        }
    }

    /// Mark the field as sensitive.
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Static metadata table for a resource type.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    /// Resource type name, used as the first address segment.
    pub type_name: &'static str,
    /// Field table.
    pub fields: &'static [Field],
}

impl Schema {
    /// Look up a field.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Mutability of `name`.
    ///
    /// Undeclared fields are treated as immutable so a missing table row
    /// errs toward replace rather than a silent in-place update.
    pub fn mutability(&self, name: &str) -> Mutability {
        self.field(name)
            .map_or(Mutability::Immutable, |f| f.mutability)
    }

    /// Whether `name` is declared sensitive.
    pub fn is_sensitive(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.sensitive)
    }
}

/// A single attribute value, as compared by the diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Unset.
    Null,
    /// Text.
    Str(String),
    /// Integer.
    Int(i64),
    /// Flag.
    Bool(bool),
}

impl AttrValue {
    /// Whether the value is unset.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "(unset)"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&String> for AttrValue {
    fn from(s: &String) -> Self {
        Self::Str(s.clone())
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i8> for AttrValue {
    fn from(i: i8) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for AttrValue {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Flat attribute view of a desired or observed state.
///
/// Names must match the resource's [`Schema`]. Order is the display order.
pub trait Attributes {
    /// List `(name, value)` pairs.
    fn attributes(&self) -> Vec<(&'static str, AttrValue)>;
}
