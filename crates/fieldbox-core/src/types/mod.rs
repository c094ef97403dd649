//! # Core Type Definitions
//!
//! This module contains the value types shared by every persistence component:
//! - Arena identifiers (`BoxId`)
//! - Property values (`PropertyValue`, `Properties`)
//! - Error types (`FieldboxError`)
//!
//! ## Determinism Guarantees
//!
//! Property maps are `BTreeMap`s so that data files written from the same
//! graph are byte-identical from one save to the next.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// ARENA IDENTIFIERS
// =============================================================================

/// Index of a box inside a `BoxGraph` arena.
///
/// A `BoxId` is process-local and is never written to disk; the persisted
/// identity of a box is its `__id__` string property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoxId(pub u64);

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// PROPERTY VALUES
// =============================================================================

/// The value of a box property.
///
/// Serialized untagged, so a data file is a plain JSON map whose values read
/// back as the narrowest matching variant: strings become `Text`, booleans
/// `Bool`, integers `Int`, other numbers `Float`, everything else `Data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A text blob (source code, names, paths).
    Text(String),
    /// A boolean flag.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// An opaque structured value (geometry, lists, nested maps).
    Data(serde_json::Value),
}

impl PropertyValue {
    /// The text payload, if this is a text blob.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The flag payload, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Data(v)
    }
}

/// A box's property map, ordered by name.
pub type Properties = BTreeMap<String, PropertyValue>;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Fieldbox persistence engine.
///
/// Only failures that abort an operation are errors. Per-item failures during
/// a load or save (a missing sidecar, an unknown type tag, a dangling edge)
/// are reported as `Diagnostic`s instead.
#[derive(Debug, Error)]
pub enum FieldboxError {
    /// The requested box was not found in the graph.
    #[error("Box not found: {0}")]
    NodeNotFound(BoxId),

    /// No constructor is registered for a type tag.
    #[error("Unknown box type: {0}")]
    UnknownBoxType(String),

    /// A registered constructor failed.
    #[error("Construction of box type '{tag}' failed: {reason}")]
    ConstructionFailed { tag: String, reason: String },

    /// A post-load hook reported a failure.
    #[error("Post-load hook failed: {0}")]
    HookFailed(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// =============================================================================
// TESTS
// =============================================================================
