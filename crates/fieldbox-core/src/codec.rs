//! # Graph Codec
//!
//! Converts between a live `BoxGraph` and a flat, edge-annotated `Document`.
//!
//! ## Save
//!
//! `Compiler` walks the graph breadth-first from a document root. Each
//! persistent, non-anchored box has its properties snapshotted at the moment
//! it is visited; file-backed text properties get their own paths, persisted
//! properties go into one data map, and the box's identity plus the
//! identities of its neighbours become a `Record`. Paths and identities are
//! written back onto the live box so the next save reuses them.
//!
//! ## Load
//!
//! `Reconstructor` runs two passes. Pass 1 creates one box per record and
//! hydrates its properties from the sidecar and data files. Pass 2 wires
//! edges by identity, consulting the caller's anchors first. A missing file,
//! an unknown type or a dangling reference degrades only that item.

use crate::anchors::Anchors;
use crate::catalog::Catalog;
use crate::diagnostics::{Diagnostic, Diagnostics, EdgeSide};
use crate::filename::FilenameAllocator;
use crate::formats::{Document, Record, data_from_str};
use crate::graph::{BoxGraph, BoxNode};
use crate::primitives::{DATAFILE_PROPERTY, ID_PROPERTY, filename_property};
use crate::registry::BoxTypeRegistry;
use crate::workspace::Workspace;
use crate::{BoxId, FieldboxError, Properties, PropertyValue};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// COMPILED OUTPUT
// =============================================================================

/// The file contents belonging to one record, captured at visit time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPayload {
    /// Sidecar path -> text.
    pub texts: BTreeMap<String, String>,
    /// Data file path.
    pub data_file: String,
    /// Persisted properties for the data file.
    pub data: Properties,
}

/// A document ready to be written: records plus what each record's files hold.
///
/// `payloads[i]` belongs to `document.records[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledDocument {
    pub document: Document,
    pub payloads: Vec<RecordPayload>,
}

impl CompiledDocument {
    pub fn iter(&self) -> impl Iterator<Item = (&Record, &RecordPayload)> {
        self.document.records.iter().zip(self.payloads.iter())
    }
}

// =============================================================================
// SAVE: GRAPH -> RECORDS
// =============================================================================

/// Builds records from a live graph.
#[derive(Debug)]
pub struct Compiler<'a> {
    workspace: &'a Workspace,
    catalog: &'a mut Catalog,
}

impl<'a> Compiler<'a> {
    pub fn new(workspace: &'a Workspace, catalog: &'a mut Catalog) -> Self {
        Self { workspace, catalog }
    }

    /// Compile every persistent box reachable from `root`.
    ///
    /// Anchored boxes (normally including `root` itself) are skipped and
    /// referenced by key. New identities and file paths are stamped onto the
    /// live boxes, and the slots they are stored in are registered as
    /// persisted so they survive a reload.
    pub fn compile(
        &mut self,
        graph: &mut BoxGraph,
        root: BoxId,
        anchors: &Anchors,
        diagnostics: &mut Diagnostics,
    ) -> Result<CompiledDocument, FieldboxError> {
        graph.node(root)?;

        let mut allocator = FilenameAllocator::for_graph(self.workspace, graph);
        let mut compiled = CompiledDocument::default();

        for id in graph.breadth_first(root) {
            if anchors.is_anchor(id) {
                continue;
            }
            if !graph.node(id)?.is_persistent() {
                tracing::debug!("skipping non-persistent box {}", id);
                continue;
            }
            let (record, payload) =
                self.compile_box(graph, id, anchors, &mut allocator, diagnostics)?;
            compiled.document.records.push(record);
            compiled.payloads.push(payload);
        }

        compiled.document.filespecs = self.catalog.filespecs().clone();
        compiled.document.persisted = self.catalog.persisted().clone();
        Ok(compiled)
    }

    fn compile_box(
        &mut self,
        graph: &mut BoxGraph,
        id: BoxId,
        anchors: &Anchors,
        allocator: &mut FilenameAllocator<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(Record, RecordPayload), FieldboxError> {
        let identity = ensure_identity(graph, id)?;
        let node = graph.node(id)?;
        let mut snapshot = node.snapshot();

        let mut text_files = BTreeMap::new();
        let mut texts = BTreeMap::new();
        for (name, value) in &snapshot {
            let Some(spec) = self.catalog.filespec(name) else {
                continue;
            };
            let Some(text) = value.as_text() else {
                continue;
            };
            let path = allocator.allocate(node, spec, diagnostics);
            texts.insert(path.clone(), text.to_string());
            text_files.insert(name.clone(), path);
        }

        let first_text_file = text_files.values().next().cloned();
        let data_file = allocator.allocate_data(node, first_text_file.as_deref());
        let type_tag = node.type_tag().to_string();
        let parent_ids: Vec<BoxId> = node.parents().iter().copied().collect();
        let child_ids: Vec<BoxId> = node.children().iter().copied().collect();

        let mut bookkeeping: Vec<(String, String)> = text_files
            .iter()
            .map(|(name, path)| (filename_property(name), path.clone()))
            .collect();
        bookkeeping.push((DATAFILE_PROPERTY.to_string(), data_file.clone()));

        let node = graph.node_mut(id)?;
        for (slot, path) in bookkeeping {
            self.catalog.register_persisted(slot.clone());
            node.set(slot.clone(), path.clone());
            snapshot.insert(slot, PropertyValue::Text(path));
        }

        let data: Properties = snapshot
            .into_iter()
            .filter(|(name, _)| self.catalog.is_persisted(name))
            .collect();

        let parents = neighbour_refs(graph, &parent_ids, anchors)?;
        let children = neighbour_refs(graph, &child_ids, anchors)?;

        tracing::debug!(
            "compiled box {} as {} ({} text files, {} data entries)",
            id,
            identity,
            text_files.len(),
            data.len()
        );

        let record = Record {
            id: identity,
            type_tag,
            text_files,
            data_file: data_file.clone(),
            parents,
            children,
        };
        let payload = RecordPayload {
            texts,
            data_file,
            data,
        };
        Ok((record, payload))
    }
}

/// The box's identity, assigning a fresh UUID on first use.
pub fn ensure_identity(graph: &mut BoxGraph, id: BoxId) -> Result<String, FieldboxError> {
    let node = graph.node_mut(id)?;
    if let Some(existing) = node.identity() {
        return Ok(existing.to_string());
    }
    let identity = uuid::Uuid::new_v4().to_string();
    node.set(ID_PROPERTY, identity.clone());
    Ok(identity)
}

/// Record references for `neighbours`: anchor keys where anchored, identities
/// otherwise. Non-persistent neighbours can never resolve and are left out.
fn neighbour_refs(
    graph: &mut BoxGraph,
    neighbours: &[BoxId],
    anchors: &Anchors,
) -> Result<BTreeSet<String>, FieldboxError> {
    let mut refs = BTreeSet::new();
    for &neighbour in neighbours {
        if let Some(key) = anchors.key_for(neighbour) {
            refs.insert(key.to_string());
            continue;
        }
        if !graph.node(neighbour)?.is_persistent() {
            continue;
        }
        refs.insert(ensure_identity(graph, neighbour)?);
    }
    Ok(refs)
}

// =============================================================================
// LOAD: RECORDS -> GRAPH
// =============================================================================

/// Progress of a load. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadStage {
    Empty,
    Parsed,
    NodesCreated,
    EdgesWired,
    PostLoadDispatched,
}

/// What a reconstruction produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconstruction {
    /// Every box created by this load.
    pub created: BTreeSet<BoxId>,
    /// Record identity -> created box.
    pub by_identity: BTreeMap<String, BoxId>,
}

/// Rebuilds boxes and edges from records.
#[derive(Debug)]
pub struct Reconstructor<'a> {
    workspace: &'a Workspace,
    types: &'a BoxTypeRegistry,
}

impl<'a> Reconstructor<'a> {
    pub fn new(workspace: &'a Workspace, types: &'a BoxTypeRegistry) -> Self {
        Self { workspace, types }
    }

    /// Run both passes over `document`, inserting the new boxes into `graph`.
    pub fn reconstruct(
        &self,
        document: &Document,
        graph: &mut BoxGraph,
        anchors: &Anchors,
        diagnostics: &mut Diagnostics,
    ) -> Reconstruction {
        let mut result = Reconstruction::default();
        let mut placed = Vec::with_capacity(document.records.len());

        for record in &document.records {
            let id = self.create_box(record, graph, diagnostics);
            result.created.insert(id);
            result.by_identity.insert(record.id.clone(), id);
            placed.push((record, id));
        }

        for (record, id) in placed {
            self.wire_edges(record, id, &result.by_identity, graph, anchors, diagnostics);
        }

        result
    }

    /// Pass 1 for one record.
    fn create_box(
        &self,
        record: &Record,
        graph: &mut BoxGraph,
        diagnostics: &mut Diagnostics,
    ) -> BoxId {
        let constructed = self.types.construct(&record.type_tag);
        let mut node = match constructed.fallback {
            None => BoxNode::new(constructed.behavior),
            Some(reason) => {
                diagnostics.record(Diagnostic::UnresolvedType {
                    id: record.id.clone(),
                    tag: record.type_tag.clone(),
                    reason: reason.to_string(),
                });
                BoxNode::fallback(constructed.behavior, record.type_tag.clone())
            }
        };

        for (property, path) in &record.text_files {
            self.hydrate_text(&mut node, &record.id, property, path, diagnostics);
        }

        for (name, value) in self.read_data(&record.id, &record.data_file, diagnostics) {
            node.set(name, value);
        }

        for (property, path) in &record.text_files {
            node.set(filename_property(property), path.clone());
        }
        node.set(DATAFILE_PROPERTY, record.data_file.clone());
        node.set(ID_PROPERTY, record.id.clone());
        graph.insert_node(node)
    }

    /// Pass 2 for one record.
    fn wire_edges(
        &self,
        record: &Record,
        id: BoxId,
        loaded: &BTreeMap<String, BoxId>,
        graph: &mut BoxGraph,
        anchors: &Anchors,
        diagnostics: &mut Diagnostics,
    ) {
        let resolve = |reference: &str| {
            anchors
                .box_for(reference)
                .or_else(|| loaded.get(reference).copied())
        };

        for reference in &record.children {
            let wired = resolve(reference).is_some_and(|child| graph.connect(id, child).is_ok());
            if !wired {
                diagnostics.record(Diagnostic::LostReference {
                    id: record.id.clone(),
                    reference: reference.clone(),
                    side: EdgeSide::Child,
                });
            }
        }

        for reference in &record.parents {
            let wired = resolve(reference).is_some_and(|parent| graph.connect(parent, id).is_ok());
            if !wired {
                diagnostics.record(Diagnostic::LostReference {
                    id: record.id.clone(),
                    reference: reference.clone(),
                    side: EdgeSide::Parent,
                });
            }
        }
    }

    /// Install the text of a sidecar file as `property`; leave it unset if the
    /// file cannot be read.
    pub fn hydrate_text(
        &self,
        node: &mut BoxNode,
        id: &str,
        property: &str,
        path: &str,
        diagnostics: &mut Diagnostics,
    ) {
        let resolved = self.workspace.resolve(path);
        match std::fs::read_to_string(&resolved) {
            Ok(text) => {
                node.set(property, text);
            }
            Err(e) => diagnostics.record(Diagnostic::MissingSidecar {
                id: id.to_string(),
                property: property.to_string(),
                path: resolved,
                reason: e.to_string(),
            }),
        }
    }

    /// Decode a data file; an unreadable or malformed file yields an empty map.
    pub fn read_data(&self, id: &str, path: &str, diagnostics: &mut Diagnostics) -> Properties {
        let resolved = self.workspace.resolve(path);
        let decoded = std::fs::read_to_string(&resolved)
            .map_err(|e| e.to_string())
            .and_then(|text| data_from_str(&text).map_err(|e| e.to_string()));

        match decoded {
            Ok(data) => data,
            Err(reason) => {
                diagnostics.record(Diagnostic::UnreadableData {
                    id: id.to_string(),
                    path: resolved,
                    reason,
                });
                Properties::new()
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
