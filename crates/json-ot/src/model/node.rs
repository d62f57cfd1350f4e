use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::events::NodeEvent;
use crate::events::Listeners;
use crate::id::NodeId;
use crate::path::PathElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Null,
    Undefined,
    Boolean,
    Number,
    String,
    Date,
    Array,
    Object,
}

impl NodeType {
    pub fn is_container(self) -> bool {
        matches!(self, NodeType::Array | NodeType::Object)
    }
}

/// Arena entry. Parent links replace back-references; the model owns every
/// node through its registry.
#[derive(Debug)]
pub(crate) struct ModelNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) data: NodeData,
    pub(crate) listeners: Listeners<NodeEvent>,
}

impl ModelNode {
    pub(crate) fn new(parent: Option<NodeId>, data: NodeData) -> Self {
        Self {
            parent,
            data,
            listeners: Listeners::new(),
        }
    }

    pub(crate) fn node_type(&self) -> NodeType {
        self.data.node_type()
    }

    /// Same parent and payload, no listeners.
    pub(crate) fn shadow(&self) -> Self {
        Self::new(self.parent.clone(), self.data.clone())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Null,
    Undefined,
    Boolean(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(ArrayChildren),
    Object(ObjectChildren),
}

impl NodeData {
    pub(crate) fn node_type(&self) -> NodeType {
        match self {
            NodeData::Null => NodeType::Null,
            NodeData::Undefined => NodeType::Undefined,
            NodeData::Boolean(_) => NodeType::Boolean,
            NodeData::Number(_) => NodeType::Number,
            NodeData::String(_) => NodeType::String,
            NodeData::Date(_) => NodeType::Date,
            NodeData::Array(_) => NodeType::Array,
            NodeData::Object(_) => NodeType::Object,
        }
    }

    /// Path element of `child` inside this container.
    pub(crate) fn element_of(&self, child: &NodeId) -> Option<PathElement> {
        match self {
            NodeData::Array(children) => children.position(child).map(PathElement::Index),
            NodeData::Object(children) => children.key_of(child).map(|key| PathElement::Key(key.to_string())),
            _ => None,
        }
    }

    pub(crate) fn child_ids(&self) -> Vec<NodeId> {
        match self {
            NodeData::Array(children) => children.ids().to_vec(),
            NodeData::Object(children) => children.entries().values().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

/// Ordered child ids plus the id → index map.
///
/// Every mutation reindexes from the first affected position before
/// returning, so `positions` always agrees with `ids`.
#[derive(Debug, Clone, Default)]
pub(crate) struct ArrayChildren {
    ids: Vec<NodeId>,
    positions: HashMap<NodeId, usize>,
}

impl ArrayChildren {
    pub(crate) fn new(ids: Vec<NodeId>) -> Self {
        let mut children = Self {
            ids,
            positions: HashMap::new(),
        };
        children.reindex_from(0);
        children
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub(crate) fn get(&self, index: usize) -> Option<&NodeId> {
        self.ids.get(index)
    }

    pub(crate) fn position(&self, id: &NodeId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub(crate) fn insert(&mut self, index: usize, id: NodeId) {
        self.ids.insert(index, id);
        self.reindex_from(index);
    }

    pub(crate) fn remove(&mut self, index: usize) -> NodeId {
        let id = self.ids.remove(index);
        self.positions.remove(&id);
        self.reindex_from(index);
        id
    }

    pub(crate) fn replace(&mut self, index: usize, id: NodeId) -> NodeId {
        let old = std::mem::replace(&mut self.ids[index], id.clone());
        self.positions.remove(&old);
        self.positions.insert(id, index);
        old
    }

    pub(crate) fn reorder(&mut self, from_index: usize, to_index: usize) {
        let id = self.ids.remove(from_index);
        self.ids.insert(to_index, id);
        self.reindex_from(from_index.min(to_index));
    }

    pub(crate) fn set(&mut self, ids: Vec<NodeId>) -> Vec<NodeId> {
        let old = std::mem::replace(&mut self.ids, ids);
        self.positions.clear();
        self.reindex_from(0);
        old
    }

    fn reindex_from(&mut self, start: usize) {
        for (index, id) in self.ids.iter().enumerate().skip(start) {
            self.positions.insert(id.clone(), index);
        }
    }
}

/// Insertion-ordered key → child id map plus the reverse id → key map.
#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectChildren {
    entries: IndexMap<String, NodeId>,
    keys: HashMap<NodeId, String>,
}

impl ObjectChildren {
    pub(crate) fn new(entries: IndexMap<String, NodeId>) -> Self {
        let keys = entries
            .iter()
            .map(|(key, id)| (id.clone(), key.clone()))
            .collect();
        Self { entries, keys }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> &IndexMap<String, NodeId> {
        &self.entries
    }

    pub(crate) fn get(&self, key: &str) -> Option<&NodeId> {
        self.entries.get(key)
    }

    pub(crate) fn key_of(&self, id: &NodeId) -> Option<&str> {
        self.keys.get(id).map(String::as_str)
    }

    /// Inserts or replaces in place; returns the displaced child.
    pub(crate) fn insert(&mut self, key: String, id: NodeId) -> Option<NodeId> {
        self.keys.insert(id.clone(), key.clone());
        let old = self.entries.insert(key, id);
        if let Some(old) = &old {
            self.keys.remove(old);
        }
        old
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<NodeId> {
        let old = self.entries.shift_remove(key)?;
        self.keys.remove(&old);
        Some(old)
    }

    pub(crate) fn set(&mut self, entries: IndexMap<String, NodeId>) -> Vec<NodeId> {
        let fresh = ObjectChildren::new(entries);
        let old = std::mem::replace(self, fresh);
        old.entries.into_values().collect()
    }
}
