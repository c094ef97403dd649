//! # Persistence Engine
//!
//! The entry points the surrounding application calls: `save`, `load`, the
//! `register_*` calls made at startup, and the single-file helpers used when
//! files are dropped onto the canvas.
//!
//! The engine owns its workspace, property catalog and box type registry.
//! There is no global state; each application passes its engine explicitly.

use crate::anchors::Anchors;
use crate::behavior::{BoxBehavior, DefaultBox};
use crate::catalog::{Catalog, Suffix};
use crate::codec::{CompiledDocument, Compiler, LoadStage, Reconstructor};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::filename::{is_path_slot, recorded_paths};
use crate::formats::{Document, data_from_str};
use crate::graph::{BoxGraph, BoxNode};
use crate::primitives::{
    CODE_PROPERTY, DATA_SUFFIX, DATAFILE_PROPERTY, FILENAME_PREFIX, NAME_PROPERTY,
    filename_property,
};
use crate::registry::BoxTypeRegistry;
use crate::store::{self, WriteSummary};
use crate::workspace::Workspace;
use crate::{BoxId, FieldboxError, lifecycle};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

// =============================================================================
// OUTCOMES
// =============================================================================

/// What a `save` wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub document: Document,
    pub summary: WriteSummary,
    pub diagnostics: Vec<Diagnostic>,
}

/// What a `load` created.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    /// Boxes created by this load, for the application to attach to its scene.
    pub created: BTreeSet<BoxId>,
    /// Record identity -> created box.
    pub by_identity: BTreeMap<String, BoxId>,
    pub document: Document,
    pub stage: LoadStage,
    /// The document did not exist; nothing was loaded.
    pub was_new: bool,
    /// Post-load hooks that completed successfully.
    pub hooks_run: usize,
    pub diagnostics: Vec<Diagnostic>,
}

// =============================================================================
// ENGINE
// =============================================================================

/// Saves and loads box graphs against one workspace directory.
#[derive(Debug)]
pub struct PersistenceEngine {
    workspace: Workspace,
    catalog: Catalog,
    types: BoxTypeRegistry,
    last_was_new: bool,
}

impl PersistenceEngine {
    /// Create an engine rooted at `workspace_dir`, creating the directory if
    /// needed. The catalog starts with the default persisted properties and
    /// the registry with the default box type.
    pub fn new(workspace_dir: impl AsRef<Path>) -> Result<Self, FieldboxError> {
        let root = std::path::absolute(workspace_dir.as_ref()).map_err(|e| {
            FieldboxError::IoError(format!(
                "Invalid workspace path '{}': {}",
                workspace_dir.as_ref().display(),
                e
            ))
        })?;
        let workspace = Workspace::new(root);
        workspace.ensure_exists()?;
        Ok(Self::with_parts(
            workspace,
            Catalog::new(),
            BoxTypeRegistry::new(),
        ))
    }

    /// Assemble an engine from prepared parts. Does not touch the filesystem.
    #[must_use]
    pub fn with_parts(workspace: Workspace, catalog: Catalog, types: BoxTypeRegistry) -> Self {
        Self {
            workspace,
            catalog,
            types,
            last_was_new: false,
        }
    }

    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn types(&self) -> &BoxTypeRegistry {
        &self.types
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Register a file-backed property. `suffix` may be `{{execution}}` to
    /// defer to each box's suffix provider.
    pub fn register_filespec(
        &mut self,
        name: impl Into<String>,
        suffix: impl Into<Suffix>,
        language: impl Into<String>,
    ) {
        self.catalog.register_filespec(name, suffix, language);
    }

    /// Register a property to be kept in data files.
    pub fn register_persisted_property(&mut self, name: impl Into<String>) {
        self.catalog.register_persisted(name);
    }

    /// Register the constructor for a box type tag.
    pub fn register_type<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn BoxBehavior>, FieldboxError> + Send + Sync + 'static,
    {
        self.types.register(tag, factory);
    }

    // =========================================================================
    // SAVE
    // =========================================================================

    /// Build the document for the graph under `root` without writing anything.
    ///
    /// Identities and file paths are still assigned on the live boxes.
    pub fn compile_document(
        &mut self,
        graph: &mut BoxGraph,
        root: BoxId,
        anchors: &Anchors,
        diagnostics: &mut Diagnostics,
    ) -> Result<CompiledDocument, FieldboxError> {
        Compiler::new(&self.workspace, &mut self.catalog).compile(graph, root, anchors, diagnostics)
    }

    /// Save every persistent box reachable from `root` to the document at `path`.
    pub fn save(
        &mut self,
        graph: &mut BoxGraph,
        root: BoxId,
        anchors: &Anchors,
        path: &str,
    ) -> Result<SaveOutcome, FieldboxError> {
        let mut diagnostics = Diagnostics::new();
        let compiled = self.compile_document(graph, root, anchors, &mut diagnostics)?;
        let summary = store::write(&self.workspace, path, &compiled, &mut diagnostics)?;
        Ok(SaveOutcome {
            document: compiled.document,
            summary,
            diagnostics: diagnostics.into_vec(),
        })
    }

    // =========================================================================
    // LOAD
    // =========================================================================

    /// Load the document at `path` into `graph`, resolving anchor keys
    /// through `anchors`, then run post-load hooks on the created boxes.
    ///
    /// A missing document is not an error: the outcome is empty and
    /// `was_new` is set.
    pub fn load(
        &mut self,
        path: &str,
        graph: &mut BoxGraph,
        anchors: &Anchors,
    ) -> Result<LoadOutcome, FieldboxError> {
        self.last_was_new = false;
        let mut diagnostics = Diagnostics::new();
        let loaded = store::load(
            &self.workspace,
            &self.types,
            path,
            graph,
            anchors,
            &mut diagnostics,
        )?;

        self.last_was_new = loaded.stage == LoadStage::Empty;
        let mut stage = loaded.stage;
        let mut hooks_run = 0;
        if !self.last_was_new {
            self.catalog
                .merge(&loaded.document.filespecs, &loaded.document.persisted);
            hooks_run = lifecycle::dispatch(graph, &loaded.reconstruction.created, &mut diagnostics);
            stage = LoadStage::PostLoadDispatched;
        }

        Ok(LoadOutcome {
            created: loaded.reconstruction.created,
            by_identity: loaded.reconstruction.by_identity,
            document: loaded.document,
            stage,
            was_new: self.last_was_new,
            hooks_run,
            diagnostics: diagnostics.into_vec(),
        })
    }

    /// Whether the most recent `load` found no document.
    #[must_use]
    pub fn last_was_new(&self) -> bool {
        self.last_was_new
    }

    // =========================================================================
    // SINGLE FILES
    // =========================================================================

    /// Whether `path` names a box data file.
    #[must_use]
    pub fn is_box_file(&self, path: &Path) -> bool {
        path.to_string_lossy().ends_with(DATA_SUFFIX)
    }

    /// The file-backed property whose suffix matches `path`'s extension.
    #[must_use]
    pub fn lookup_file_suffix(&self, path: &Path) -> Option<&str> {
        let extension = path.extension()?.to_str()?;
        self.catalog.property_for_extension(extension)
    }

    /// Load one box from its data file, hydrating any sidecar text files the
    /// data file names. The box is created unconnected.
    ///
    /// Paths already owned by another box in `graph` are not kept; the next
    /// save allocates fresh ones.
    pub fn load_single_box(
        &self,
        graph: &mut BoxGraph,
        path: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<BoxId, FieldboxError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FieldboxError::IoError(format!("Cannot read box file {}: {}", path.display(), e))
        })?;
        let data = data_from_str(&text)?;
        let recorded = recorded_paths(graph);

        let mut node = BoxNode::new(Box::new(DefaultBox));
        let label = path.to_string_lossy().into_owned();
        let reconstructor = Reconstructor::new(&self.workspace, &self.types);
        for (name, value) in &data {
            let Some(property) = name.strip_prefix(FILENAME_PREFIX) else {
                continue;
            };
            if let Some(sidecar) = value.as_text() {
                reconstructor.hydrate_text(&mut node, &label, property, sidecar, diagnostics);
            }
        }
        for (name, value) in data {
            let owned =
                is_path_slot(&name) && value.as_text().is_some_and(|p| recorded.contains(p));
            if owned {
                tracing::debug!("{} is owned by another box, not reusing {}", label, name);
                continue;
            }
            node.set(name, value);
        }
        let data_file = self.workspace.derelativize(path);
        if node.get(DATAFILE_PROPERTY).is_none() && !recorded.contains(&data_file) {
            node.set(DATAFILE_PROPERTY, data_file);
        }

        Ok(graph.insert_node(node))
    }

    /// Create a child of `parent` holding the text of `path` in its
    /// file-backed property (matched by extension, `code` otherwise). The
    /// box's file slot points at `path` itself, so saving writes back to it,
    /// unless another box already owns `path`.
    pub fn import_text_file(
        &self,
        graph: &mut BoxGraph,
        parent: BoxId,
        path: &Path,
    ) -> Result<BoxId, FieldboxError> {
        graph.node(parent)?;
        let text = std::fs::read_to_string(path).map_err(|e| {
            FieldboxError::IoError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let absolute: PathBuf = std::path::absolute(path).map_err(|e| {
            FieldboxError::IoError(format!("Invalid path '{}': {}", path.display(), e))
        })?;
        let property = self
            .lookup_file_suffix(path)
            .unwrap_or(CODE_PROPERTY)
            .to_string();

        let slot = self.workspace.derelativize(&absolute);

        let mut node = BoxNode::new(Box::new(DefaultBox));
        node.set(NAME_PROPERTY, display_name(&absolute));
        if recorded_paths(graph).contains(&slot) {
            tracing::debug!("{} is owned by another box, allocating a fresh path", slot);
        } else {
            node.set(filename_property(&property), slot);
        }
        node.set(property, text);

        let id = graph.insert_node(node);
        graph.connect(parent, id)?;
        Ok(id)
    }
}

/// `<parent dir>/<file name>`, the label given to imported files.
fn display_name(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.parent().and_then(Path::file_name) {
        Some(dir) => format!("{}/{}", dir.to_string_lossy(), file),
        None => file,
    }
}

// =============================================================================
// TESTS
// =============================================================================
