//! # Filename Allocator
//!
//! Chooses the workspace file names a box's properties are written to.
//!
//! A name is `<box name>_<property><suffix>`. When that name is taken (a file
//! exists, or another slot already claimed it) a five-digit disambiguator is
//! inserted before the property part: `foo00000_code.js`, `foo00001_code.js`.
//! A slot that already recorded a path keeps it verbatim, so repeated saves
//! never churn file names.

use crate::catalog::Filespec;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::graph::{BoxGraph, BoxNode};
use crate::primitives::{
    DATA_SUFFIX, DATAFILE_PROPERTY, DEFAULT_BOX_NAME, FALLBACK_TEXT_SUFFIX, FILENAME_PREFIX,
    WORKSPACE_TOKEN, filename_property, pad,
};
use crate::workspace::Workspace;
use std::collections::BTreeSet;

/// Allocates collision-free workspace paths for one save.
#[derive(Debug)]
pub struct FilenameAllocator<'a> {
    workspace: &'a Workspace,
    /// Token paths owned by some slot, whether or not the file exists yet.
    claimed: BTreeSet<String>,
}

impl<'a> FilenameAllocator<'a> {
    #[must_use]
    pub fn new(workspace: &'a Workspace) -> Self {
        Self {
            workspace,
            claimed: BTreeSet::new(),
        }
    }

    /// An allocator that treats every path already recorded in `graph` as taken.
    #[must_use]
    pub fn for_graph(workspace: &'a Workspace, graph: &BoxGraph) -> Self {
        Self {
            workspace,
            claimed: recorded_paths(graph),
        }
    }

    /// Mark a path as owned.
    pub fn claim(&mut self, path: impl Into<String>) {
        self.claimed.insert(path.into());
    }

    /// Whether `path` is unavailable for a new slot.
    #[must_use]
    pub fn is_taken(&self, path: &str) -> bool {
        self.claimed.contains(path) || self.workspace.exists(path)
    }

    /// Path for `spec`'s property on `node`.
    ///
    /// Returns the slot's recorded path if there is one; otherwise allocates
    /// and claims a fresh name.
    pub fn allocate(
        &mut self,
        node: &BoxNode,
        spec: &Filespec,
        diagnostics: &mut Diagnostics,
    ) -> String {
        if let Some(existing) = node.text(&filename_property(&spec.name)) {
            return existing.to_string();
        }

        let suffix = spec.suffix_for(node.behavior()).unwrap_or_else(|| {
            diagnostics.record(Diagnostic::SuffixUnavailable {
                id: node.identity().unwrap_or_default().to_string(),
                property: spec.name.clone(),
                fallback: FALLBACK_TEXT_SUFFIX.to_string(),
            });
            FALLBACK_TEXT_SUFFIX.to_string()
        });

        self.allocate_name(node, &spec.name, &suffix)
    }

    /// Path for `node`'s consolidated data file.
    ///
    /// Reuses the recorded path; otherwise derives it from the box's first
    /// file-backed path, or allocates `<name>_.box`.
    pub fn allocate_data(&mut self, node: &BoxNode, first_text_file: Option<&str>) -> String {
        if let Some(existing) = node.text(DATAFILE_PROPERTY) {
            return existing.to_string();
        }
        if let Some(text_file) = first_text_file {
            let path = format!("{text_file}{DATA_SUFFIX}");
            self.claim(path.clone());
            return path;
        }
        self.allocate_name(node, "", DATA_SUFFIX)
    }

    fn allocate_name(&mut self, node: &BoxNode, property: &str, suffix: &str) -> String {
        let stem = sanitize(node.name().unwrap_or(DEFAULT_BOX_NAME));
        let tail = format!("_{property}{suffix}");

        let first = format!("{WORKSPACE_TOKEN}{stem}{tail}");
        let path = if !self.is_taken(&first) {
            first
        } else {
            (0..=u32::MAX)
                .map(|n| format!("{WORKSPACE_TOKEN}{stem}{}{tail}", pad(n)))
                .find(|candidate| !self.is_taken(candidate))
                .unwrap_or_else(|| format!("{WORKSPACE_TOKEN}{stem}{}{tail}", uuid::Uuid::new_v4()))
        };

        self.claim(path.clone());
        path
    }
}

/// Whether `name` is a bookkeeping slot holding a file path.
#[must_use]
pub fn is_path_slot(name: &str) -> bool {
    name.starts_with(FILENAME_PREFIX) || name == DATAFILE_PROPERTY
}

/// Every file path some box in `graph` has recorded in a slot.
#[must_use]
pub fn recorded_paths(graph: &BoxGraph) -> BTreeSet<String> {
    graph
        .nodes()
        .flat_map(|(_, node)| node.properties())
        .filter(|(name, _)| is_path_slot(name))
        .filter_map(|(_, value)| value.as_text().map(str::to_string))
        .collect()
}

/// Box names may contain separators (`dir/file.js`); keep files flat.
fn sanitize(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}
