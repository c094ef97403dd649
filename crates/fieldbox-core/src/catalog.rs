//! # Property Catalog
//!
//! The two registries that decide what survives a save:
//!
//! - **Filespecs**: properties whose text value is written to its own file.
//! - **Persisted properties**: properties written into a box's data file.
//!
//! Anything not registered in either is transient.

use crate::behavior::BoxBehavior;
use crate::primitives::{DEFAULT_PERSISTED_PROPERTIES, EXECUTION_TOKEN};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// FILESPEC
// =============================================================================

/// How a file-backed property picks its file suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Suffix {
    /// A fixed suffix such as `".js"`.
    Static(String),
    /// Ask the box's suffix provider (written as `{{execution}}`).
    DeferToBox,
}

impl From<String> for Suffix {
    fn from(s: String) -> Self {
        if s == EXECUTION_TOKEN {
            Self::DeferToBox
        } else {
            Self::Static(s)
        }
    }
}

impl From<&str> for Suffix {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Suffix> for String {
    fn from(s: Suffix) -> Self {
        match s {
            Suffix::Static(s) => s,
            Suffix::DeferToBox => EXECUTION_TOKEN.to_string(),
        }
    }
}

/// Registration of a file-backed property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filespec {
    pub name: String,
    pub suffix: Suffix,
    pub language: String,
}

impl Filespec {
    #[must_use]
    pub fn new(name: impl Into<String>, suffix: impl Into<Suffix>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            suffix: suffix.into(),
            language: language.into(),
        }
    }

    /// The static suffix, if this filespec has one.
    #[must_use]
    pub fn static_suffix(&self) -> Option<&str> {
        match &self.suffix {
            Suffix::Static(s) => Some(s),
            Suffix::DeferToBox => None,
        }
    }

    /// Suffix for this property on `behavior`.
    ///
    /// `None` when the filespec defers to the box and the box has no
    /// extension for this property.
    #[must_use]
    pub fn suffix_for(&self, behavior: &dyn BoxBehavior) -> Option<String> {
        match &self.suffix {
            Suffix::Static(s) => Some(s.clone()),
            Suffix::DeferToBox => behavior
                .suffix_provider()
                .and_then(|provider| provider.file_extension(&self.name)),
        }
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Known filespecs and persisted property names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    filespecs: BTreeMap<String, Filespec>,
    persisted: BTreeSet<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            filespecs: BTreeMap::new(),
            persisted: DEFAULT_PERSISTED_PROPERTIES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

impl Catalog {
    /// A catalog holding only the default persisted properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a file-backed property.
    pub fn register_filespec(
        &mut self,
        name: impl Into<String>,
        suffix: impl Into<Suffix>,
        language: impl Into<String>,
    ) {
        let spec = Filespec::new(name, suffix, language);
        self.filespecs.insert(spec.name.clone(), spec);
    }

    /// Register a property for inclusion in data files.
    pub fn register_persisted(&mut self, name: impl Into<String>) {
        self.persisted.insert(name.into());
    }

    #[must_use]
    pub fn filespec(&self, name: &str) -> Option<&Filespec> {
        self.filespecs.get(name)
    }

    #[must_use]
    pub fn is_persisted(&self, name: &str) -> bool {
        self.persisted.contains(name)
    }

    #[must_use]
    pub fn filespecs(&self) -> &BTreeMap<String, Filespec> {
        &self.filespecs
    }

    #[must_use]
    pub fn persisted(&self) -> &BTreeSet<String> {
        &self.persisted
    }

    /// File-backed property whose static suffix matches `extension` (with or
    /// without the leading dot).
    #[must_use]
    pub fn property_for_extension(&self, extension: &str) -> Option<&str> {
        let wanted = extension.trim_start_matches('.');
        self.filespecs
            .values()
            .find(|spec| {
                spec.static_suffix()
                    .is_some_and(|s| s.trim_start_matches('.') == wanted)
            })
            .map(|spec| spec.name.as_str())
    }

    /// Merge registrations read from a document. Existing filespecs win.
    pub fn merge(&mut self, filespecs: &BTreeMap<String, Filespec>, persisted: &BTreeSet<String>) {
        for (name, spec) in filespecs {
            self.filespecs
                .entry(name.clone())
                .or_insert_with(|| spec.clone());
        }
        self.persisted.extend(persisted.iter().cloned());
    }
}
