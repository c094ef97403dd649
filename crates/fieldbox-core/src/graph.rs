//! # Box Graph
//!
//! The in-memory box graph the persistence engine reads from and loads into.
//!
//! Boxes live in an arena keyed by `BoxId`. Parent and child relationships
//! are stored as index sets on both sides and are only ever changed through
//! `connect`/`disconnect`/`remove`, which keep the two sides consistent.
//! Cycles are permitted.

use crate::behavior::{BoxBehavior, DefaultBox};
use crate::primitives::{DONT_SAVE_PROPERTY, ID_PROPERTY, NAME_PROPERTY};
use crate::{BoxId, FieldboxError, Properties, PropertyValue};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// BOX NODE
// =============================================================================

/// A box: behavior, properties, and its edges.
#[derive(Debug)]
pub struct BoxNode {
    behavior: Box<dyn BoxBehavior>,
    /// Tag from the record this box was loaded from, when its type could not
    /// be constructed and the behavior is a fallback.
    recorded_tag: Option<String>,
    properties: Properties,
    parents: BTreeSet<BoxId>,
    children: BTreeSet<BoxId>,
}

impl BoxNode {
    /// Create an unconnected box with no properties.
    #[must_use]
    pub fn new(behavior: Box<dyn BoxBehavior>) -> Self {
        Self {
            behavior,
            recorded_tag: None,
            properties: Properties::new(),
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
        }
    }

    /// Create a box whose behavior stands in for an unconstructible `tag`.
    #[must_use]
    pub fn fallback(behavior: Box<dyn BoxBehavior>, tag: impl Into<String>) -> Self {
        Self {
            recorded_tag: Some(tag.into()),
            ..Self::new(behavior)
        }
    }

    /// Tag written when this box is saved.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        self.recorded_tag
            .as_deref()
            .unwrap_or_else(|| self.behavior.type_tag())
    }

    /// Whether this box runs a fallback behavior for an unresolved type.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.recorded_tag.is_some()
    }

    #[must_use]
    pub fn behavior(&self) -> &dyn BoxBehavior {
        self.behavior.as_ref()
    }

    pub fn behavior_mut(&mut self) -> &mut dyn BoxBehavior {
        self.behavior.as_mut()
    }

    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// Copy of the property map at this instant.
    #[must_use]
    pub fn snapshot(&self) -> Properties {
        self.properties.clone()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Set a property, returning the previous value.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.properties.insert(name.into(), value.into())
    }

    pub fn remove_property(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.remove(name)
    }

    /// Text value of a property, if present and a text blob.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(PropertyValue::as_text)
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.text(NAME_PROPERTY)
    }

    /// Persisted identity, once assigned.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.text(ID_PROPERTY)
    }

    /// Whether this box may appear in a saved document.
    ///
    /// A box is excluded when its behavior says so or when the application
    /// set its `dontSave` flag.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        let flagged = self
            .properties
            .get(DONT_SAVE_PROPERTY)
            .and_then(PropertyValue::as_bool)
            .unwrap_or(false);
        self.behavior.is_persistent() && !flagged
    }

    #[must_use]
    pub fn parents(&self) -> &BTreeSet<BoxId> {
        &self.parents
    }

    #[must_use]
    pub fn children(&self) -> &BTreeSet<BoxId> {
        &self.children
    }

    /// Run the post-load hook, if this box's behavior has one.
    pub(crate) fn run_post_load(&mut self) -> Option<Result<(), FieldboxError>> {
        let Self {
            behavior,
            properties,
            ..
        } = self;
        behavior.post_load().map(|hook| hook.loaded(properties))
    }
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// The box arena.
///
/// Uses `BTreeMap` so iteration order (and therefore save order of
/// unconnected boxes) is deterministic.
#[derive(Debug, Default)]
pub struct BoxGraph {
    nodes: BTreeMap<BoxId, BoxNode>,
    next_box_id: u64,
}

impl BoxGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a box to the arena.
    pub fn insert_node(&mut self, node: BoxNode) -> BoxId {
        let id = BoxId(self.next_box_id);
        self.next_box_id = self.next_box_id.saturating_add(1);
        self.nodes.insert(id, node);
        id
    }

    /// Add an unconnected box with the given behavior.
    pub fn insert(&mut self, behavior: Box<dyn BoxBehavior>) -> BoxId {
        self.insert_node(BoxNode::new(behavior))
    }

    /// Add an unconnected generic box.
    pub fn insert_default(&mut self) -> BoxId {
        self.insert(Box::new(DefaultBox))
    }

    #[must_use]
    pub fn get(&self, id: BoxId) -> Option<&BoxNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: BoxId) -> Option<&mut BoxNode> {
        self.nodes.get_mut(&id)
    }

    /// Like `get`, but a missing box is an error.
    pub fn node(&self, id: BoxId) -> Result<&BoxNode, FieldboxError> {
        self.nodes.get(&id).ok_or(FieldboxError::NodeNotFound(id))
    }

    /// Like `get_mut`, but a missing box is an error.
    pub fn node_mut(&mut self, id: BoxId) -> Result<&mut BoxNode, FieldboxError> {
        self.nodes
            .get_mut(&id)
            .ok_or(FieldboxError::NodeNotFound(id))
    }

    #[must_use]
    pub fn contains(&self, id: BoxId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All box ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = BoxId> + '_ {
        self.nodes.keys().copied()
    }

    /// All boxes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = (BoxId, &BoxNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// Make `child` a child of `parent`. Idempotent.
    pub fn connect(&mut self, parent: BoxId, child: BoxId) -> Result<(), FieldboxError> {
        if !self.nodes.contains_key(&child) {
            return Err(FieldboxError::NodeNotFound(child));
        }
        self.node_mut(parent)?.children.insert(child);
        self.node_mut(child)?.parents.insert(parent);
        Ok(())
    }

    /// Remove the `parent -> child` edge. Returns whether it existed.
    pub fn disconnect(&mut self, parent: BoxId, child: BoxId) -> bool {
        let removed = self
            .nodes
            .get_mut(&parent)
            .is_some_and(|node| node.children.remove(&child));
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parents.remove(&parent);
        }
        removed
    }

    /// Remove a box and every edge touching it.
    pub fn remove(&mut self, id: BoxId) -> Option<BoxNode> {
        let node = self.nodes.remove(&id)?;
        for parent in &node.parents {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.remove(&id);
            }
        }
        for child in &node.children {
            if let Some(c) = self.nodes.get_mut(child) {
                c.parents.remove(&id);
            }
        }
        Some(node)
    }

    /// Breadth-first order of every box reachable from `root` along child
    /// edges, `root` first. Each box appears once even in cyclic graphs.
    #[must_use]
    pub fn breadth_first(&self, root: BoxId) -> Vec<BoxId> {
        let mut order = Vec::new();
        if !self.nodes.contains_key(&root) {
            return order;
        }

        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        visited.insert(root);
        queue.push_back(root);

        while let Some(current) = queue.pop_front() {
            order.push(current);
            if let Some(node) = self.nodes.get(&current) {
                for &child in &node.children {
                    if visited.insert(child) {
                        queue.push_back(child);
                    }
                }
            }
        }

        order
    }

    /// Find the box carrying persisted identity `identity`.
    #[must_use]
    pub fn find_by_identity(&self, identity: &str) -> Option<BoxId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.identity() == Some(identity))
            .map(|(id, _)| *id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
