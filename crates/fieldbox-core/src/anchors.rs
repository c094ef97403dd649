//! # Anchors
//!
//! Caller-owned boxes that a document refers to but never contains, such as
//! the application's persistent root. On save an anchored box is written only
//! as its key in neighbouring records; on load the key resolves back to
//! whatever box the caller anchors under it this time.

use crate::BoxId;
use std::collections::BTreeMap;

/// Two-way mapping between anchor keys and boxes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Anchors {
    by_key: BTreeMap<String, BoxId>,
    by_box: BTreeMap<BoxId, String>,
}

impl Anchors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-anchor shorthand.
    #[must_use]
    pub fn with(key: impl Into<String>, id: BoxId) -> Self {
        let mut anchors = Self::new();
        anchors.insert(key, id);
        anchors
    }

    /// Anchor `id` under `key`, replacing any previous binding of either.
    pub fn insert(&mut self, key: impl Into<String>, id: BoxId) {
        let key = key.into();
        if let Some(old_box) = self.by_key.insert(key.clone(), id) {
            self.by_box.remove(&old_box);
        }
        if let Some(old_key) = self.by_box.insert(id, key.clone()) {
            if old_key != key {
                self.by_key.remove(&old_key);
            }
        }
    }

    #[must_use]
    pub fn key_for(&self, id: BoxId) -> Option<&str> {
        self.by_box.get(&id).map(String::as_str)
    }

    #[must_use]
    pub fn box_for(&self, key: &str) -> Option<BoxId> {
        self.by_key.get(key).copied()
    }

    #[must_use]
    pub fn is_anchor(&self, id: BoxId) -> bool {
        self.by_box.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
