//! The versioned value tree.
//!
//! A [`Model`] owns every node in an id → node registry. Nodes point at
//! their parent by id; containers keep the child → path-element maps that
//! paths and bubbled events are computed from. Local edits go through the
//! typed handles in [`handles`] and return the [`DiscreteOperation`] that
//! describes them; remote edits arrive through [`Model::apply_operation`].
//! Both paths share one mutation core, so a given operation has the same
//! effect on every replica.

mod events;
mod handles;
mod node;

pub use events::{NodeChange, NodeEvent};
pub use handles::{
    ArrayHandle, BooleanHandle, DateHandle, NodeHandle, NumberHandle, ObjectHandle, StringHandle,
};
pub use node::NodeType;

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::error::ModelError;
use crate::events::{ListenerId, Listeners};
use crate::id::{IdGenerator, NodeId, SessionIdGenerator};
use crate::operation::{DiscreteOperation, ModelOperationEvent, Mutation};
use crate::path::{Path, PathElement};
use crate::text;
use crate::value::{DataValue, ModelValue};
use node::{ArrayChildren, ModelNode, NodeData, ObjectChildren};

/// Id of the root object of a model created with [`Model::new`].
pub const DEFAULT_ROOT_ID: &str = "root";

/// Provenance stamped onto node events.
#[derive(Debug, Clone)]
struct Origin {
    local: bool,
    session_id: String,
    user_id: Option<String>,
}

/// Result of one mutation, before events are delivered.
struct Applied {
    change: NodeChange,
    detached: Vec<NodeId>,
}

impl Applied {
    fn change(change: NodeChange) -> Self {
        Self {
            change,
            detached: Vec::new(),
        }
    }

    fn replacing(change: NodeChange, detached: Vec<NodeId>) -> Self {
        Self { change, detached }
    }
}

pub struct Model {
    root_id: NodeId,
    nodes: HashMap<NodeId, ModelNode>,
    ids: Box<dyn IdGenerator>,
    session_id: String,
    user_id: Option<String>,
    operation_listeners: Listeners<ModelOperationEvent>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("root_id", &self.root_id)
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl Model {
    /// An empty document whose root object has id [`DEFAULT_ROOT_ID`] and
    /// whose new nodes are named `"{session_id}:{n}"`.
    pub fn new(session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        let mut nodes = HashMap::new();
        nodes.insert(
            DEFAULT_ROOT_ID.to_string(),
            ModelNode::new(None, NodeData::Object(ObjectChildren::default())),
        );
        Self {
            root_id: DEFAULT_ROOT_ID.to_string(),
            nodes,
            ids: Box::new(SessionIdGenerator::new(session_id.clone())),
            session_id,
            user_id: None,
            operation_listeners: Listeners::new(),
        }
    }

    /// Builds a document from a snapshot, keeping the snapshot's ids.
    pub fn from_data_value(
        root: &DataValue,
        session_id: impl Into<String>,
        ids: Box<dyn IdGenerator>,
    ) -> Result<Self, ModelError> {
        if !matches!(root, DataValue::Object { .. }) {
            return Err(ModelError::RootNotObject);
        }
        let mut model = Self {
            root_id: root.id().clone(),
            nodes: HashMap::new(),
            ids,
            session_id: session_id.into(),
            user_id: None,
            operation_listeners: Listeners::new(),
        };
        model.validate_new(std::iter::once(root))?;
        model.insert_subtree(root, None);
        Ok(model)
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Number of attached nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_type(&self, id: &str) -> Result<NodeType, ModelError> {
        Ok(self.node_ref(id)?.node_type())
    }

    pub fn node(&mut self, id: &str) -> Result<NodeHandle<'_>, ModelError> {
        let node_type = self.node_type(id)?;
        Ok(NodeHandle::new(self, id.to_string(), node_type))
    }

    pub fn root(&mut self) -> ObjectHandle<'_> {
        let id = self.root_id.clone();
        ObjectHandle::from_node(NodeHandle::new(self, id, NodeType::Object))
    }

    /// Path from the root, recomputed from the parent chain on every call.
    pub fn path(&self, id: &str) -> Result<Path, ModelError> {
        let mut path = Vec::new();
        let mut current = id.to_string();
        let mut node = self.node_ref(id)?;
        while let Some(parent_id) = &node.parent {
            let parent = self.node_ref(parent_id)?;
            let element = parent
                .data
                .element_of(&current)
                .ok_or_else(|| ModelError::NodeNotFound(current.clone()))?;
            path.push(element);
            current = parent_id.clone();
            node = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Resolves a path from the root to a node id.
    pub fn element_at(&self, path: &[PathElement]) -> Option<NodeId> {
        let mut current = self.root_id.clone();
        for element in path {
            let node = self.nodes.get(&current)?;
            current = match (&node.data, element) {
                (NodeData::Array(children), PathElement::Index(index)) => children.get(*index)?.clone(),
                (NodeData::Object(children), PathElement::Key(key)) => children.get(key)?.clone(),
                _ => return None,
            };
        }
        Some(current)
    }

    /// Native value of the subtree rooted at `id`.
    pub fn data(&self, id: &str) -> Result<ModelValue, ModelError> {
        let node = self.node_ref(id)?;
        Ok(match &node.data {
            NodeData::Null => ModelValue::Null,
            NodeData::Undefined => ModelValue::Undefined,
            NodeData::Boolean(b) => ModelValue::Boolean(*b),
            NodeData::Number(n) => ModelValue::Number(*n),
            NodeData::String(s) => ModelValue::String(s.clone()),
            NodeData::Date(d) => ModelValue::Date(*d),
            NodeData::Array(children) => ModelValue::Array(
                children
                    .ids()
                    .iter()
                    .map(|child| self.data(child))
                    .collect::<Result<_, _>>()?,
            ),
            NodeData::Object(children) => ModelValue::Object(
                children
                    .entries()
                    .iter()
                    .map(|(key, child)| Ok((key.clone(), self.data(child)?)))
                    .collect::<Result<_, ModelError>>()?,
            ),
        })
    }

    /// Snapshot of the subtree rooted at `id`, ids included.
    pub fn data_value(&self, id: &str) -> Result<DataValue, ModelError> {
        let node = self.node_ref(id)?;
        let id = id.to_string();
        Ok(match &node.data {
            NodeData::Null => DataValue::Null { id },
            NodeData::Undefined => DataValue::Undefined { id },
            NodeData::Boolean(b) => DataValue::Boolean { id, value: *b },
            NodeData::Number(n) => DataValue::Number { id, value: *n },
            NodeData::String(s) => DataValue::String {
                id,
                value: s.clone(),
            },
            NodeData::Date(d) => DataValue::Date { id, value: *d },
            NodeData::Array(children) => DataValue::Array {
                children: children
                    .ids()
                    .iter()
                    .map(|child| self.data_value(child))
                    .collect::<Result<_, _>>()?,
                id,
            },
            NodeData::Object(children) => DataValue::Object {
                children: children
                    .entries()
                    .iter()
                    .map(|(key, child)| Ok((key.clone(), self.data_value(child)?)))
                    .collect::<Result<_, ModelError>>()?,
                id,
            },
        })
    }

    /// JSON view of the whole document.
    ///
    /// The root is never detached and every child id a container holds is
    /// registered, so reading the root cannot fail.
    pub fn to_json(&self) -> Value {
        match self.data(&self.root_id) {
            Ok(value) => value.to_json(),
            Err(err) => {
                debug_assert!(false, "root {} must always resolve: {err}", self.root_id);
                Value::Null
            }
        }
    }

    /// Subscribes to changes of `id` and of everything below it.
    pub fn subscribe<F>(&mut self, id: &str, listener: F) -> Result<ListenerId, ModelError>
    where
        F: FnMut(&NodeEvent) + Send + 'static,
    {
        Ok(self.node_mut(id)?.listeners.add(listener))
    }

    pub fn unsubscribe(&mut self, id: &str, listener_id: ListenerId) -> bool {
        self.nodes
            .get_mut(id)
            .is_some_and(|node| node.listeners.remove(listener_id))
    }

    /// Subscribes to remote operations applied through [`Model::apply_operation`].
    pub fn on_operation<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ModelOperationEvent) + Send + 'static,
    {
        self.operation_listeners.add(listener)
    }

    pub fn off_operation(&mut self, listener_id: ListenerId) -> bool {
        self.operation_listeners.remove(listener_id)
    }

    /// Applies a remote operation.
    ///
    /// No-op placeholders are skipped, as are operations on nodes that a
    /// concurrent edit already detached. Node events carry the remote
    /// provenance and `local == false`.
    ///
    /// A compound applies all or nothing: it is first run against a
    /// listener-free copy of the tree, and the model is only touched once
    /// every part has succeeded there.
    pub fn apply_operation(&mut self, event: &ModelOperationEvent) -> Result<(), ModelError> {
        let origin = Origin {
            local: false,
            session_id: event.session_id.clone(),
            user_id: event.user_id.clone(),
        };
        let ops = event.operation.discrete_ops();
        if ops.iter().filter(|op| !op.is_no_op()).count() > 1 {
            self.shadow().apply_discrete_ops(ops, &origin, None)?;
        }
        self.apply_discrete_ops(ops, &origin, Some(event.version))?;
        self.operation_listeners.emit(event);
        Ok(())
    }

    /// Copy of the tree with no listeners and no id generator state, used to
    /// dry-run remote compounds.
    fn shadow(&self) -> Model {
        Model {
            root_id: self.root_id.clone(),
            nodes: self
                .nodes
                .iter()
                .map(|(id, node)| (id.clone(), node.shadow()))
                .collect(),
            ids: Box::new(SessionIdGenerator::new(self.session_id.clone())),
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            operation_listeners: Listeners::new(),
        }
    }

    /// `version` is only used for logging skipped operations; dry runs pass
    /// `None` and stay quiet.
    fn apply_discrete_ops(
        &mut self,
        ops: &[DiscreteOperation],
        origin: &Origin,
        version: Option<u64>,
    ) -> Result<(), ModelError> {
        for op in ops {
            if op.is_no_op() {
                continue;
            }
            if !self.nodes.contains_key(op.id()) {
                if let Some(version) = version {
                    debug!(
                        "skipping {:?} on detached node {} (version {})",
                        op.operation_type(),
                        op.id(),
                        version
                    );
                }
                continue;
            }
            self.apply_discrete(op, origin)?;
        }
        Ok(())
    }

    /// Applies an operation built by a handle and hands it back.
    fn apply_local(&mut self, op: DiscreteOperation) -> Result<DiscreteOperation, ModelError> {
        let origin = Origin {
            local: true,
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
        };
        self.apply_discrete(&op, &origin)?;
        Ok(op)
    }

    fn mint(&mut self, value: &ModelValue) -> DataValue {
        DataValue::from_model_value(value, self.ids.as_mut())
    }

    fn apply_discrete(&mut self, op: &DiscreteOperation, origin: &Origin) -> Result<(), ModelError> {
        let id = op.id();
        let node_type = self.node_type(id)?;
        let operation = op.operation_type();
        if operation.node_type() != node_type {
            return Err(ModelError::OperationMismatch {
                operation,
                node: node_type,
            });
        }

        let applied = match op.mutation() {
            Mutation::ArrayInsert(p) => self.array_insert(id, p.index, &p.value)?,
            Mutation::ArrayRemove(p) => self.array_remove(id, p.index)?,
            Mutation::ArrayReplace(p) => self.array_replace(id, p.index, &p.value)?,
            Mutation::ArrayMove(p) => self.array_move(id, p.from_index, p.to_index)?,
            Mutation::ArraySet(p) => self.array_set(id, &p.value)?,
            Mutation::ObjectAddProperty(p) => self.object_add(id, &p.key, &p.value)?,
            Mutation::ObjectSetProperty(p) => self.object_set_property(id, &p.key, &p.value)?,
            Mutation::ObjectRemoveProperty(p) => self.object_remove(id, &p.key)?,
            Mutation::ObjectSet(p) => self.object_set(id, &p.value)?,
            Mutation::StringInsert(p) => self.string_insert(id, p.index, &p.value)?,
            Mutation::StringRemove(p) => self.string_remove(id, p.index, &p.value)?,
            Mutation::StringSet(p) => self.string_set(id, &p.value)?,
            Mutation::NumberDelta(p) => self.number_delta(id, p.delta)?,
            Mutation::NumberSet(p) => self.number_set(id, p.value)?,
            Mutation::BooleanSet(p) => self.boolean_set(id, p.value)?,
            Mutation::DateSet(p) => self.date_set(id, p.value)?,
        };

        self.emit(id, applied.change, origin);
        for detached in &applied.detached {
            self.detach(detached, origin);
        }
        Ok(())
    }

    // Registry plumbing.

    fn node_ref(&self, id: &str) -> Result<&ModelNode, ModelError> {
        self.nodes
            .get(id)
            .ok_or_else(|| ModelError::NodeNotFound(id.to_string()))
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut ModelNode, ModelError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| ModelError::NodeNotFound(id.to_string()))
    }

    /// Rejects values whose ids collide with each other or with attached nodes.
    fn validate_new<'v>(&self, values: impl IntoIterator<Item = &'v DataValue>) -> Result<(), ModelError> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&DataValue> = values.into_iter().collect();
        while let Some(value) = stack.pop() {
            let id = value.id();
            if self.nodes.contains_key(id) || !seen.insert(id) {
                return Err(ModelError::DuplicateId(id.clone()));
            }
            match value {
                DataValue::Number { value, .. } if !value.is_finite() => {
                    return Err(ModelError::InvalidNumber(*value));
                }
                DataValue::Array { children, .. } => stack.extend(children.iter()),
                DataValue::Object { children, .. } => stack.extend(children.values()),
                _ => {}
            }
        }
        Ok(())
    }

    fn insert_subtree(&mut self, value: &DataValue, parent: Option<&NodeId>) -> NodeId {
        let id = value.id().clone();
        let data = match value {
            DataValue::Null { .. } => NodeData::Null,
            DataValue::Undefined { .. } => NodeData::Undefined,
            DataValue::Boolean { value, .. } => NodeData::Boolean(*value),
            DataValue::Number { value, .. } => NodeData::Number(*value),
            DataValue::String { value, .. } => NodeData::String(value.clone()),
            DataValue::Date { value, .. } => NodeData::Date(*value),
            DataValue::Array { children, .. } => {
                let ids = children
                    .iter()
                    .map(|child| self.insert_subtree(child, Some(&id)))
                    .collect();
                NodeData::Array(ArrayChildren::new(ids))
            }
            DataValue::Object { children, .. } => {
                let entries = children
                    .iter()
                    .map(|(key, child)| (key.clone(), self.insert_subtree(child, Some(&id))))
                    .collect();
                NodeData::Object(ObjectChildren::new(entries))
            }
        };
        self.nodes.insert(id.clone(), ModelNode::new(parent.cloned(), data));
        id
    }

    /// Drops `id` and its subtree from the registry. Each node hears
    /// `Detached` once, then loses its listeners.
    fn detach(&mut self, id: &NodeId, origin: &Origin) {
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            let Some(mut node) = self.nodes.remove(&current) else {
                continue;
            };
            stack.extend(node.data.child_ids());
            let event = NodeEvent {
                node_id: current,
                path: Vec::new(),
                change: NodeChange::Detached,
                local: origin.local,
                session_id: origin.session_id.clone(),
                user_id: origin.user_id.clone(),
            };
            node.listeners.emit(&event);
        }
    }

    /// Delivers `change` to `id`, then to each ancestor with the path
    /// relative to that ancestor.
    fn emit(&mut self, id: &NodeId, change: NodeChange, origin: &Origin) {
        let mut event = NodeEvent {
            node_id: id.clone(),
            path: Vec::new(),
            change,
            local: origin.local,
            session_id: origin.session_id.clone(),
            user_id: origin.user_id.clone(),
        };
        let mut current = id.clone();
        loop {
            let Some(node) = self.nodes.get_mut(&current) else {
                break;
            };
            node.listeners.emit(&event);
            let Some(parent_id) = node.parent.clone() else {
                break;
            };
            let Some(element) = self
                .nodes
                .get(&parent_id)
                .and_then(|parent| parent.data.element_of(&current))
            else {
                break;
            };
            event.path.insert(0, element);
            current = parent_id;
        }
    }

    // Typed access.

    fn array_ref(&self, id: &str) -> Result<&ArrayChildren, ModelError> {
        let node = self.node_ref(id)?;
        match &node.data {
            NodeData::Array(children) => Ok(children),
            other => Err(wrong_type(id, NodeType::Array, other.node_type())),
        }
    }

    fn array_mut(&mut self, id: &str) -> Result<&mut ArrayChildren, ModelError> {
        let node = self.node_mut(id)?;
        let actual = node.node_type();
        match &mut node.data {
            NodeData::Array(children) => Ok(children),
            _ => Err(wrong_type(id, NodeType::Array, actual)),
        }
    }

    fn object_ref(&self, id: &str) -> Result<&ObjectChildren, ModelError> {
        let node = self.node_ref(id)?;
        match &node.data {
            NodeData::Object(children) => Ok(children),
            other => Err(wrong_type(id, NodeType::Object, other.node_type())),
        }
    }

    fn object_mut(&mut self, id: &str) -> Result<&mut ObjectChildren, ModelError> {
        let node = self.node_mut(id)?;
        let actual = node.node_type();
        match &mut node.data {
            NodeData::Object(children) => Ok(children),
            _ => Err(wrong_type(id, NodeType::Object, actual)),
        }
    }

    fn string_ref(&self, id: &str) -> Result<&str, ModelError> {
        let node = self.node_ref(id)?;
        match &node.data {
            NodeData::String(s) => Ok(s),
            other => Err(wrong_type(id, NodeType::String, other.node_type())),
        }
    }

    fn string_mut(&mut self, id: &str) -> Result<&mut String, ModelError> {
        let node = self.node_mut(id)?;
        let actual = node.node_type();
        match &mut node.data {
            NodeData::String(s) => Ok(s),
            _ => Err(wrong_type(id, NodeType::String, actual)),
        }
    }

    fn leaf_mut(&mut self, id: &str) -> Result<&mut NodeData, ModelError> {
        Ok(&mut self.node_mut(id)?.data)
    }

    // Mutation core. Each function validates before touching the tree.

    fn array_insert(&mut self, id: &str, index: usize, value: &DataValue) -> Result<Applied, ModelError> {
        let len = self.array_ref(id)?.len();
        if index > len {
            return Err(ModelError::IndexOutOfBounds { index, len });
        }
        self.validate_new(std::iter::once(value))?;
        let parent = id.to_string();
        let child = self.insert_subtree(value, Some(&parent));
        self.array_mut(id)?.insert(index, child);
        Ok(Applied::change(NodeChange::ArrayInsert {
            index,
            value: value.to_model_value(),
        }))
    }

    fn array_remove(&mut self, id: &str, index: usize) -> Result<Applied, ModelError> {
        let child = self.array_child(id, index)?;
        let old_value = self.data(&child)?;
        self.array_mut(id)?.remove(index);
        Ok(Applied::replacing(
            NodeChange::ArrayRemove { index, old_value },
            vec![child],
        ))
    }

    fn array_replace(&mut self, id: &str, index: usize, value: &DataValue) -> Result<Applied, ModelError> {
        let old = self.array_child(id, index)?;
        self.validate_new(std::iter::once(value))?;
        let old_value = self.data(&old)?;
        let parent = id.to_string();
        let child = self.insert_subtree(value, Some(&parent));
        self.array_mut(id)?.replace(index, child);
        Ok(Applied::replacing(
            NodeChange::ArrayReplace {
                index,
                old_value,
                value: value.to_model_value(),
            },
            vec![old],
        ))
    }

    fn array_move(&mut self, id: &str, from_index: usize, to_index: usize) -> Result<Applied, ModelError> {
        let children = self.array_mut(id)?;
        let len = children.len();
        for index in [from_index, to_index] {
            if index >= len {
                return Err(ModelError::IndexOutOfBounds { index, len });
            }
        }
        if from_index != to_index {
            children.reorder(from_index, to_index);
        }
        Ok(Applied::change(NodeChange::ArrayReorder {
            from_index,
            to_index,
        }))
    }

    fn array_set(&mut self, id: &str, values: &[DataValue]) -> Result<Applied, ModelError> {
        self.array_ref(id)?;
        self.validate_new(values)?;
        let old_value = self.data(id)?;
        let parent = id.to_string();
        let ids = values
            .iter()
            .map(|value| self.insert_subtree(value, Some(&parent)))
            .collect();
        let old = self.array_mut(id)?.set(ids);
        let value = ModelValue::Array(values.iter().map(DataValue::to_model_value).collect());
        Ok(Applied::replacing(
            NodeChange::ValueChanged { old_value, value },
            old,
        ))
    }

    fn object_add(&mut self, id: &str, key: &str, value: &DataValue) -> Result<Applied, ModelError> {
        if self.object_ref(id)?.get(key).is_some() {
            return Err(ModelError::KeyExists(key.to_string()));
        }
        self.validate_new(std::iter::once(value))?;
        let parent = id.to_string();
        let child = self.insert_subtree(value, Some(&parent));
        self.object_mut(id)?.insert(key.to_string(), child);
        Ok(Applied::change(NodeChange::PropertySet {
            key: key.to_string(),
            old_value: None,
            value: value.to_model_value(),
        }))
    }

    fn object_set_property(&mut self, id: &str, key: &str, value: &DataValue) -> Result<Applied, ModelError> {
        let old = self.object_child(id, key)?;
        self.validate_new(std::iter::once(value))?;
        let old_value = self.data(&old)?;
        let parent = id.to_string();
        let child = self.insert_subtree(value, Some(&parent));
        self.object_mut(id)?.insert(key.to_string(), child);
        Ok(Applied::replacing(
            NodeChange::PropertySet {
                key: key.to_string(),
                old_value: Some(old_value),
                value: value.to_model_value(),
            },
            vec![old],
        ))
    }

    fn object_remove(&mut self, id: &str, key: &str) -> Result<Applied, ModelError> {
        let old = self.object_child(id, key)?;
        let old_value = self.data(&old)?;
        self.object_mut(id)?.remove(key);
        Ok(Applied::replacing(
            NodeChange::PropertyRemove {
                key: key.to_string(),
                old_value,
            },
            vec![old],
        ))
    }

    fn object_set(&mut self, id: &str, values: &IndexMap<String, DataValue>) -> Result<Applied, ModelError> {
        self.object_ref(id)?;
        self.validate_new(values.values())?;
        let old_value = self.data(id)?;
        let parent = id.to_string();
        let entries = values
            .iter()
            .map(|(key, value)| (key.clone(), self.insert_subtree(value, Some(&parent))))
            .collect();
        let old = self.object_mut(id)?.set(entries);
        let value = ModelValue::Object(
            values
                .iter()
                .map(|(key, value)| (key.clone(), value.to_model_value()))
                .collect(),
        );
        Ok(Applied::replacing(
            NodeChange::ValueChanged { old_value, value },
            old,
        ))
    }

    fn string_insert(&mut self, id: &str, index: usize, value: &str) -> Result<Applied, ModelError> {
        if value.is_empty() {
            return Err(ModelError::EmptyEdit);
        }
        let current = self.string_mut(id)?;
        let len = text::char_len(current);
        let offset = text::byte_offset(current, index).ok_or(ModelError::IndexOutOfBounds { index, len })?;
        current.insert_str(offset, value);
        Ok(Applied::change(NodeChange::StringInsert {
            index,
            value: value.to_string(),
        }))
    }

    fn string_remove(&mut self, id: &str, index: usize, value: &str) -> Result<Applied, ModelError> {
        if value.is_empty() {
            return Err(ModelError::EmptyEdit);
        }
        let current = self.string_mut(id)?;
        let len = text::char_len(current);
        let end = index
            .checked_add(text::char_len(value))
            .filter(|end| *end <= len)
            .ok_or(ModelError::IndexOutOfBounds { index, len })?;
        let start_byte = text::byte_offset(current, index).ok_or(ModelError::IndexOutOfBounds { index, len })?;
        let end_byte = text::byte_offset(current, end).ok_or(ModelError::IndexOutOfBounds { index: end, len })?;
        let removed = current[start_byte..end_byte].to_string();
        current.replace_range(start_byte..end_byte, "");
        Ok(Applied::change(NodeChange::StringRemove { index, value: removed }))
    }

    fn string_set(&mut self, id: &str, value: &str) -> Result<Applied, ModelError> {
        let current = self.string_mut(id)?;
        let old_value = ModelValue::String(std::mem::replace(current, value.to_string()));
        Ok(Applied::change(NodeChange::ValueChanged {
            old_value,
            value: ModelValue::String(value.to_string()),
        }))
    }

    fn number_delta(&mut self, id: &str, delta: f64) -> Result<Applied, ModelError> {
        if !delta.is_finite() {
            return Err(ModelError::InvalidNumber(delta));
        }
        let NodeData::Number(current) = self.leaf_mut(id)? else {
            return Err(ModelError::OperationMismatch {
                operation: crate::operation::OperationType::NumberDelta,
                node: NodeType::Number,
            });
        };
        let next = *current + delta;
        if !next.is_finite() {
            return Err(ModelError::InvalidNumber(next));
        }
        let old_value = ModelValue::Number(std::mem::replace(current, next));
        Ok(Applied::change(NodeChange::ValueChanged {
            old_value,
            value: ModelValue::Number(next),
        }))
    }

    fn number_set(&mut self, id: &str, value: f64) -> Result<Applied, ModelError> {
        if !value.is_finite() {
            return Err(ModelError::InvalidNumber(value));
        }
        self.replace_leaf(id, NodeData::Number(value))
    }

    fn boolean_set(&mut self, id: &str, value: bool) -> Result<Applied, ModelError> {
        self.replace_leaf(id, NodeData::Boolean(value))
    }

    fn date_set(&mut self, id: &str, value: DateTime<Utc>) -> Result<Applied, ModelError> {
        self.replace_leaf(id, NodeData::Date(value))
    }

    /// Swaps a scalar payload of the same type.
    fn replace_leaf(&mut self, id: &str, data: NodeData) -> Result<Applied, ModelError> {
        let old_value = self.data(id)?;
        let expected = data.node_type();
        let slot = self.leaf_mut(id)?;
        let actual = slot.node_type();
        if actual != expected {
            return Err(wrong_type(id, expected, actual));
        }
        *slot = data;
        let value = self.data(id)?;
        Ok(Applied::change(NodeChange::ValueChanged { old_value, value }))
    }

    fn array_child(&self, id: &str, index: usize) -> Result<NodeId, ModelError> {
        let children = self.array_ref(id)?;
        children
            .get(index)
            .cloned()
            .ok_or(ModelError::IndexOutOfBounds {
                index,
                len: children.len(),
            })
    }

    fn object_child(&self, id: &str, key: &str) -> Result<NodeId, ModelError> {
        self.object_ref(id)?
            .get(key)
            .cloned()
            .ok_or_else(|| ModelError::KeyNotFound(key.to_string()))
    }
}

fn wrong_type(id: &str, expected: NodeType, actual: NodeType) -> ModelError {
    ModelError::WrongType {
        id: id.to_string(),
        expected,
        actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{ArrayRemove, CompoundOperation, Operation, StringInsert, StringRemove};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn model_from(value: Value) -> Model {
        let mut ids = SessionIdGenerator::new("seed");
        let root = DataValue::from_json(&value, &mut ids);
        Model::from_data_value(&root, "local", Box::new(SessionIdGenerator::new("local")))
            .expect("snapshot must load")
    }

    fn remote(op: DiscreteOperation) -> ModelOperationEvent {
        ModelOperationEvent {
            session_id: "remote".into(),
            user_id: Some("bob".into()),
            version: 0,
            timestamp: Utc::now(),
            operation: Operation::Discrete(op),
        }
    }

    #[test]
    fn paths_follow_sibling_shifts() {
        let mut model = model_from(json!({"list": ["a", "b", {"deep": 1}]}));
        let deep = model
            .element_at(&["list".into(), 2.into(), "deep".into()])
            .expect("deep must resolve");
        assert_eq!(model.path(&deep).expect("path must resolve"), vec![
            PathElement::from("list"),
            PathElement::from(2),
            PathElement::from("deep"),
        ]);

        let list = model.element_at(&["list".into()]).expect("list must resolve");
        model
            .node(&list)
            .and_then(NodeHandle::as_array)
            .and_then(|mut list| list.remove(0))
            .expect("remove must succeed");
        assert_eq!(model.path(&deep).expect("path must resolve")[1], PathElement::Index(1));
    }

    #[test]
    fn events_bubble_with_relative_paths() {
        let mut model = model_from(json!({"doc": {"title": "hi"}}));
        let title = model
            .element_at(&["doc".into(), "title".into()])
            .expect("title must resolve");
        let seen = Arc::new(Mutex::new(Vec::new()));
        for id in [title.clone(), model.root_id().clone()] {
            let sink = Arc::clone(&seen);
            model
                .subscribe(&id, move |event| sink.lock().unwrap().push(event.path.clone()))
                .expect("subscribe must succeed");
        }

        model
            .node(&title)
            .and_then(NodeHandle::as_string)
            .and_then(|mut s| s.insert(2, "!"))
            .expect("insert must succeed");

        assert_eq!(seen.lock().unwrap().as_slice(), &[
            vec![],
            vec![PathElement::from("doc"), PathElement::from("title")],
        ]);
    }

    #[test]
    fn removed_subtrees_are_detached() {
        let mut model = model_from(json!({"list": [{"x": [1]}]}));
        let list = model.element_at(&["list".into()]).expect("list must resolve");
        let inner = model
            .element_at(&["list".into(), 0.into(), "x".into(), 0.into()])
            .expect("inner must resolve");
        let detached = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&detached);
        model
            .subscribe(&inner, move |event| {
                if event.change == NodeChange::Detached {
                    *counter.lock().unwrap() += 1;
                }
            })
            .expect("subscribe must succeed");
        let before = model.node_count();

        model
            .apply_operation(&remote(DiscreteOperation::new(list.clone(), ArrayRemove { index: 0 })))
            .expect("remote remove must apply");

        assert_eq!(*detached.lock().unwrap(), 1);
        assert_eq!(model.node_count(), before - 3);
        assert_eq!(model.node(&inner).err(), Some(ModelError::NodeNotFound(inner.clone())));
        assert_eq!(model.to_json(), json!({"list": []}));
    }

    #[test]
    fn remote_operations_on_detached_nodes_are_skipped() {
        let mut model = model_from(json!({"s": "abc"}));
        let before = model.to_json();
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        model.on_operation(move |_| *counter.lock().unwrap() += 1);

        model
            .apply_operation(&remote(DiscreteOperation::new(
                "gone",
                StringInsert {
                    index: 0,
                    value: "x".into(),
                },
            )))
            .expect("skipped operation is not an error");

        assert_eq!(model.to_json(), before);
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn remote_events_carry_remote_provenance() {
        let mut model = model_from(json!({"s": "abc"}));
        let s = model.element_at(&["s".into()]).expect("s must resolve");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        model
            .subscribe(&s, move |event| {
                sink.lock()
                    .unwrap()
                    .push((event.local, event.session_id.clone(), event.user_id.clone()))
            })
            .expect("subscribe must succeed");

        model
            .apply_operation(&remote(DiscreteOperation::new(
                s.clone(),
                StringInsert {
                    index: 3,
                    value: "d".into(),
                },
            )))
            .expect("remote insert must apply");
        model
            .node(&s)
            .and_then(NodeHandle::as_string)
            .and_then(|mut s| s.set("zz"))
            .expect("local set must succeed");

        assert_eq!(seen.lock().unwrap().as_slice(), &[
            (false, "remote".to_string(), Some("bob".to_string())),
            (true, "local".to_string(), None),
        ]);
    }

    #[test]
    fn failing_compounds_leave_the_tree_untouched() {
        let mut model = model_from(json!({"text": "abc", "list": [1, 2]}));
        let text = model.element_at(&["text".into()]).expect("text must resolve");
        let list = model.element_at(&["list".into()]).expect("list must resolve");
        let events = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&events);
        let root = model.root_id().clone();
        model
            .subscribe(&root, move |_| *counter.lock().unwrap() += 1)
            .expect("subscribe must succeed");
        let applied = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&applied);
        model.on_operation(move |_| *sink.lock().unwrap() += 1);

        let insert = |index: usize, value: &str| {
            DiscreteOperation::new(
                text.clone(),
                StringInsert {
                    index,
                    value: value.into(),
                },
            )
        };
        let compound = |ops| ModelOperationEvent {
            operation: CompoundOperation::new(ops).into(),
            ..remote(insert(0, "unused"))
        };

        let err = model
            .apply_operation(&compound(vec![
                insert(0, "Z"),
                DiscreteOperation::new(list.clone(), ArrayRemove { index: 0 }),
                insert(99, "Q"),
            ]))
            .expect_err("out of range insert must fail");
        assert_eq!(err, ModelError::IndexOutOfBounds { index: 99, len: 4 });
        assert_eq!(model.to_json(), json!({"text": "abc", "list": [1, 2]}));
        assert_eq!(model.node_count(), 5);
        assert_eq!(*events.lock().unwrap(), 0);
        assert_eq!(*applied.lock().unwrap(), 0);

        // Later parts see the effect of earlier ones.
        model
            .apply_operation(&compound(vec![insert(0, "Z"), insert(4, "Q")]))
            .expect("dependent parts must apply");
        assert_eq!(model.to_json(), json!({"text": "ZabcQ", "list": [1, 2]}));
        assert_eq!(*events.lock().unwrap(), 2);
        assert_eq!(*applied.lock().unwrap(), 1);
    }

    #[test]
    fn remote_removes_past_usize_max_are_out_of_bounds() {
        let mut model = model_from(json!({"text": "abc"}));
        let text = model.element_at(&["text".into()]).expect("text must resolve");
        let err = model
            .apply_operation(&remote(DiscreteOperation::new(
                text,
                StringRemove {
                    index: usize::MAX,
                    value: "a".into(),
                },
            )))
            .expect_err("overflowing remove must fail");
        assert_eq!(err, ModelError::IndexOutOfBounds { index: usize::MAX, len: 3 });
        assert_eq!(model.to_json(), json!({"text": "abc"}));
    }

    #[test]
    fn the_root_survives_whole_value_replacement() {
        let mut model = model_from(json!({"a": {"b": 1}}));
        let mut entries = IndexMap::new();
        entries.insert("c".to_string(), ModelValue::from(true));
        model.root().set_all(entries).expect("set_all must succeed");
        let root = model.data(model.root_id()).expect("root must resolve");
        assert_eq!(model.to_json(), root.to_json());
        assert_eq!(model.to_json(), json!({"c": true}));
    }

    #[test]
    fn mismatched_operations_are_rejected() {
        let mut model = model_from(json!({"s": "abc"}));
        let s = model.element_at(&["s".into()]).expect("s must resolve");
        let err = model
            .apply_operation(&remote(DiscreteOperation::new(s, ArrayRemove { index: 0 })))
            .expect_err("array op on a string must fail");
        assert_eq!(err, ModelError::OperationMismatch {
            operation: crate::operation::OperationType::ArrayRemove,
            node: NodeType::String,
        });
    }

    #[test]
    fn snapshots_must_have_object_roots_and_unique_ids() {
        let ids = || Box::new(SessionIdGenerator::new("x")) as Box<dyn IdGenerator>;
        let array = DataValue::Array {
            id: "a".into(),
            children: vec![],
        };
        assert_eq!(
            Model::from_data_value(&array, "s", ids()).err().map(|e| e.to_string()),
            Some(ModelError::RootNotObject.to_string())
        );

        let mut children = IndexMap::new();
        children.insert("k".to_string(), DataValue::Null { id: "r".into() });
        let dup = DataValue::Object {
            id: "r".into(),
            children,
        };
        assert!(matches!(
            Model::from_data_value(&dup, "s", ids()),
            Err(ModelError::DuplicateId(id)) if id == "r"
        ));
    }

    #[test]
    fn data_value_round_trips_through_a_fresh_model() {
        let model = model_from(json!({"a": [1, {"b": null}], "c": true}));
        let snapshot = model.data_value(model.root_id()).expect("snapshot must succeed");
        let copy = Model::from_data_value(&snapshot, "other", Box::new(SessionIdGenerator::new("other")))
            .expect("copy must load");
        assert_eq!(copy.to_json(), model.to_json());
        assert_eq!(copy.data_value(copy.root_id()).expect("snapshot must succeed"), snapshot);
    }
}
