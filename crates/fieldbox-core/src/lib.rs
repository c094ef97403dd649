//! # fieldbox-core
//!
//! Document persistence for a live box graph.
//!
//! A document is a named file in a workspace directory listing every
//! persistent box reachable from a root. Large text properties (source code,
//! shaders) live in their own sidecar files; the remaining persisted
//! properties live in one data file per box.
//!
//! ## Layout
//!
//! - `types`, `primitives`: values, errors and well-known names
//! - `graph`, `behavior`, `anchors`: the in-memory box graph
//! - `workspace`, `catalog`, `filename`, `registry`: save/load configuration
//! - `codec`, `formats`, `store`, `lifecycle`: the save and load pipelines
//! - `engine`: the facade an application calls
//!
//! ## Guarantees
//!
//! - A box keeps its identity and its file paths across saves
//! - Two boxes never share a file path
//! - One unreadable file never aborts a load; it becomes a `Diagnostic`
//! - No async, no network, no global state

// =============================================================================
// MODULES
// =============================================================================

pub mod anchors;
pub mod behavior;
pub mod catalog;
pub mod codec;
pub mod diagnostics;
pub mod engine;
pub mod filename;
pub mod formats;
pub mod graph;
pub mod lifecycle;
pub mod primitives;
pub mod registry;
pub mod store;
pub mod types;
pub mod workspace;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{BoxId, FieldboxError, Properties, PropertyValue};

// =============================================================================
// RE-EXPORTS: Box Graph
// =============================================================================

pub use anchors::Anchors;
pub use behavior::{BoxBehavior, DefaultBox, PostLoad, SuffixProvider};
pub use graph::{BoxGraph, BoxNode};

// =============================================================================
// RE-EXPORTS: Persistence
// =============================================================================

pub use catalog::{Catalog, Filespec, Suffix};
pub use codec::{CompiledDocument, LoadStage};
pub use diagnostics::{Diagnostic, Diagnostics, EdgeSide};
pub use engine::{LoadOutcome, PersistenceEngine, SaveOutcome};
pub use filename::FilenameAllocator;
pub use registry::BoxTypeRegistry;
pub use store::WriteSummary;
pub use workspace::Workspace;

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{Document, Record, document_from_str, document_to_string};
