//! # Diagnostics
//!
//! Recoverable, per-item failures raised while saving or loading.
//!
//! None of these abort the surrounding operation: the affected property,
//! edge, type or hook is left at a safe default and the traversal carries on.
//! Every diagnostic is logged through `tracing` when recorded and is also
//! handed back to the caller in the operation's outcome.

use std::path::PathBuf;
use thiserror::Error;

/// Which side of a record an edge reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    Parent,
    Child,
}

/// A recoverable failure affecting a single box, property, edge or file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// A file-backed property's sidecar could not be read; the property is unset.
    #[error("box {id}: sidecar for '{property}' unreadable at {path:?}: {reason}")]
    MissingSidecar {
        id: String,
        property: String,
        path: PathBuf,
        reason: String,
    },

    /// A data file was missing or malformed; the box loads with no data properties.
    #[error("box {id}: data file {path:?} unusable: {reason}")]
    UnreadableData {
        id: String,
        path: PathBuf,
        reason: String,
    },

    /// A type tag could not be constructed; the box uses the default type.
    #[error("box {id}: type '{tag}' unavailable ({reason}), using default box")]
    UnresolvedType {
        id: String,
        tag: String,
        reason: String,
    },

    /// A parent or child id matched neither an anchor nor a loaded box.
    #[error("box {id}: lost {side:?} reference {reference}")]
    LostReference {
        id: String,
        reference: String,
        side: EdgeSide,
    },

    /// A post-load hook failed or panicked.
    #[error("box {id}: post-load hook failed: {reason}")]
    HookFailed { id: String, reason: String },

    /// A sidecar file could not be written during a save.
    #[error("could not write {path:?}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    /// A deferred filespec met a box with no suffix provider.
    #[error("box {id}: no file extension for '{property}', using {fallback}")]
    SuffixUnavailable {
        id: String,
        property: String,
        fallback: String,
    },
}

/// Collects diagnostics for one save or load.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and keep a diagnostic.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_order() {
        let mut diags = Diagnostics::new();
        diags.record(Diagnostic::HookFailed {
            id: "a".into(),
            reason: "boom".into(),
        });
        diags.record(Diagnostic::LostReference {
            id: "a".into(),
            reference: "b".into(),
            side: EdgeSide::Child,
        });

        assert_eq!(diags.len(), 2);
        assert!(matches!(diags.entries()[0], Diagnostic::HookFailed { .. }));
        assert!(matches!(diags.entries()[1], Diagnostic::LostReference { .. }));
    }

    #[test]
    fn lost_reference_message_names_both_ends() {
        let d = Diagnostic::LostReference {
            id: "a".into(),
            reference: "b".into(),
            side: EdgeSide::Parent,
        };
        assert_eq!(d.to_string(), "box a: lost Parent reference b");
    }
}
