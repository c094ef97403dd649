//! # Document Format
//!
//! JSON serialization for Fieldbox documents and box data files.
//!
//! A document is a JSON map:
//! - `format`: format version
//! - `records`: one record per saved box, in traversal order
//! - `filespecs`: file-backed property registrations
//! - `persisted`: persisted property names
//!
//! A data file is a JSON map of property name to value.
//!
//! ## Validation
//!
//! Input size and format version are checked before records are trusted.

use crate::catalog::Filespec;
use crate::{FieldboxError, Properties};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// LIMITS
// =============================================================================

/// Current document format version.
///
/// Increment this when making breaking changes to the document layout.
pub const FORMAT_VERSION: u32 = 1;

/// Maximum accepted size of a document or data file.
///
/// Checked before parsing so a corrupted or hostile file cannot force a huge
/// allocation.
pub const MAX_DOCUMENT_SIZE: usize = 256 * 1024 * 1024; // 256 MB

// =============================================================================
// RECORD
// =============================================================================

/// The serialized form of one box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identity string of the box.
    pub id: String,
    /// Type tag resolved through the box type registry on load.
    #[serde(rename = "type")]
    pub type_tag: String,
    /// File-backed property name -> path (token or literal).
    #[serde(default)]
    pub text_files: BTreeMap<String, String>,
    /// Path of the data file holding every other persisted property.
    pub data_file: String,
    /// Identities (or anchor keys) of parent boxes.
    #[serde(default)]
    pub parents: BTreeSet<String>,
    /// Identities (or anchor keys) of child boxes.
    #[serde(default)]
    pub children: BTreeSet<String>,
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// A saved box graph plus the catalogs in effect when it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "current_version")]
    pub format: u32,
    pub records: Vec<Record>,
    #[serde(default)]
    pub filespecs: BTreeMap<String, Filespec>,
    #[serde(default)]
    pub persisted: BTreeSet<String>,
}

fn current_version() -> u32 {
    FORMAT_VERSION
}

impl Default for Document {
    fn default() -> Self {
        Self {
            format: FORMAT_VERSION,
            records: Vec::new(),
            filespecs: BTreeMap::new(),
            persisted: BTreeSet::new(),
        }
    }
}

impl Document {
    /// An empty document (the "new document" case).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find a record by identity.
    #[must_use]
    pub fn record(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Reject documents written by an incompatible format version.
    pub fn validate(&self) -> Result<(), FieldboxError> {
        if self.format != FORMAT_VERSION {
            return Err(FieldboxError::DeserializationError(format!(
                "Unsupported document format: {} (expected {})",
                self.format, FORMAT_VERSION
            )));
        }
        Ok(())
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a document to pretty-printed JSON.
pub fn document_to_string(document: &Document) -> Result<String, FieldboxError> {
    serde_json::to_string_pretty(document)
        .map_err(|e| FieldboxError::SerializationError(e.to_string()))
}

/// Parse and validate a document.
pub fn document_from_str(text: &str) -> Result<Document, FieldboxError> {
    check_size(text)?;
    let document: Document = serde_json::from_str(text).map_err(|e| {
        FieldboxError::DeserializationError(format!("Failed to parse document: {}", e))
    })?;
    document.validate()?;
    Ok(document)
}

/// Serialize a data-file property map.
pub fn data_to_string(data: &Properties) -> Result<String, FieldboxError> {
    serde_json::to_string_pretty(data).map_err(|e| FieldboxError::SerializationError(e.to_string()))
}

/// Parse a data-file property map.
pub fn data_from_str(text: &str) -> Result<Properties, FieldboxError> {
    check_size(text)?;
    serde_json::from_str(text).map_err(|e| {
        FieldboxError::DeserializationError(format!("Failed to parse data file: {}", e))
    })
}

fn check_size(text: &str) -> Result<(), FieldboxError> {
    if text.len() > MAX_DOCUMENT_SIZE {
        return Err(FieldboxError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            text.len(),
            MAX_DOCUMENT_SIZE
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
