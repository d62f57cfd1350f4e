//! Typed views over one node of a [`Model`].
//!
//! Every mutator validates, applies the edit locally and returns the
//! [`DiscreteOperation`] to hand to the concurrency control.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use super::{Model, NodeData, NodeEvent, NodeType};
use crate::error::ModelError;
use crate::events::ListenerId;
use crate::id::NodeId;
use crate::operation::{
    ArrayInsert, ArrayMove, ArrayRemove, ArrayReplace, ArraySet, BooleanSet, DateSet,
    DiscreteOperation, Mutation, NumberDelta, NumberSet, ObjectAddProperty, ObjectRemoveProperty,
    ObjectSet, ObjectSetProperty, StringInsert, StringRemove, StringSet,
};
use crate::path::Path;
use crate::text;
use crate::value::{DataValue, ModelValue};

pub struct NodeHandle<'a> {
    model: &'a mut Model,
    id: NodeId,
    node_type: NodeType,
}

pub struct ArrayHandle<'a> {
    inner: NodeHandle<'a>,
}

pub struct ObjectHandle<'a> {
    inner: NodeHandle<'a>,
}

pub struct StringHandle<'a> {
    inner: NodeHandle<'a>,
}

pub struct NumberHandle<'a> {
    inner: NodeHandle<'a>,
}

pub struct BooleanHandle<'a> {
    inner: NodeHandle<'a>,
}

pub struct DateHandle<'a> {
    inner: NodeHandle<'a>,
}

impl<'a> NodeHandle<'a> {
    pub(super) fn new(model: &'a mut Model, id: NodeId, node_type: NodeType) -> Self {
        Self {
            model,
            id,
            node_type,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn path(&self) -> Result<Path, ModelError> {
        self.model.path(&self.id)
    }

    pub fn data(&self) -> Result<ModelValue, ModelError> {
        self.model.data(&self.id)
    }

    pub fn data_value(&self) -> Result<DataValue, ModelError> {
        self.model.data_value(&self.id)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> Result<ListenerId, ModelError>
    where
        F: FnMut(&NodeEvent) + Send + 'static,
    {
        self.model.subscribe(&self.id, listener)
    }

    /// Replaces the whole value. The new value must have the node's type.
    pub fn set_data(&mut self, value: impl Into<ModelValue>) -> Result<DiscreteOperation, ModelError> {
        let mutation: Mutation = match (self.node_type, value.into()) {
            (NodeType::Null | NodeType::Undefined, _) => {
                return Err(ModelError::Immutable(self.node_type));
            }
            (NodeType::Array, ModelValue::Array(items)) => ArraySet {
                value: items.iter().map(|item| self.model.mint(item)).collect(),
            }
            .into(),
            (NodeType::Object, ModelValue::Object(entries)) => ObjectSet {
                value: entries
                    .iter()
                    .map(|(key, item)| (key.clone(), self.model.mint(item)))
                    .collect(),
            }
            .into(),
            (NodeType::String, ModelValue::String(value)) => StringSet { value }.into(),
            (NodeType::Number, ModelValue::Number(value)) => NumberSet { value }.into(),
            (NodeType::Boolean, ModelValue::Boolean(value)) => BooleanSet { value }.into(),
            (NodeType::Date, ModelValue::Date(value)) => DateSet { value }.into(),
            (expected, other) => {
                return Err(ModelError::WrongType {
                    id: self.id.clone(),
                    expected,
                    actual: other.node_type(),
                });
            }
        };
        self.submit(mutation)
    }

    pub fn as_array(self) -> Result<ArrayHandle<'a>, ModelError> {
        self.expect_type(NodeType::Array)?;
        Ok(ArrayHandle { inner: self })
    }

    pub fn as_object(self) -> Result<ObjectHandle<'a>, ModelError> {
        self.expect_type(NodeType::Object)?;
        Ok(ObjectHandle { inner: self })
    }

    pub fn as_string(self) -> Result<StringHandle<'a>, ModelError> {
        self.expect_type(NodeType::String)?;
        Ok(StringHandle { inner: self })
    }

    pub fn as_number(self) -> Result<NumberHandle<'a>, ModelError> {
        self.expect_type(NodeType::Number)?;
        Ok(NumberHandle { inner: self })
    }

    pub fn as_boolean(self) -> Result<BooleanHandle<'a>, ModelError> {
        self.expect_type(NodeType::Boolean)?;
        Ok(BooleanHandle { inner: self })
    }

    pub fn as_date(self) -> Result<DateHandle<'a>, ModelError> {
        self.expect_type(NodeType::Date)?;
        Ok(DateHandle { inner: self })
    }

    fn expect_type(&self, expected: NodeType) -> Result<(), ModelError> {
        if self.node_type == expected {
            return Ok(());
        }
        Err(ModelError::WrongType {
            id: self.id.clone(),
            expected,
            actual: self.node_type,
        })
    }

    fn submit(&mut self, mutation: impl Into<Mutation>) -> Result<DiscreteOperation, ModelError> {
        self.model
            .apply_local(DiscreteOperation::new(self.id.clone(), mutation))
    }

    fn data_ref(&self) -> Result<&NodeData, ModelError> {
        Ok(&self.model.node_ref(&self.id)?.data)
    }
}

impl<'a> ArrayHandle<'a> {
    pub fn id(&self) -> &NodeId {
        &self.inner.id
    }

    pub fn len(&self) -> usize {
        self.inner
            .model
            .array_ref(&self.inner.id)
            .map_or(0, |children| children.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn child_id(&self, index: usize) -> Result<NodeId, ModelError> {
        self.inner.model.array_child(&self.inner.id, index)
    }

    pub fn get(&self, index: usize) -> Result<ModelValue, ModelError> {
        let child = self.child_id(index)?;
        self.inner.model.data(&child)
    }

    pub fn child(&mut self, index: usize) -> Result<NodeHandle<'_>, ModelError> {
        let child = self.child_id(index)?;
        self.inner.model.node(&child)
    }

    pub fn data(&self) -> Result<ModelValue, ModelError> {
        self.inner.data()
    }

    pub fn insert(&mut self, index: usize, value: impl Into<ModelValue>) -> Result<DiscreteOperation, ModelError> {
        let len = self.len();
        if index > len {
            return Err(ModelError::IndexOutOfBounds { index, len });
        }
        let value = self.inner.model.mint(&value.into());
        self.inner.submit(ArrayInsert { index, value })
    }

    pub fn push(&mut self, value: impl Into<ModelValue>) -> Result<DiscreteOperation, ModelError> {
        let len = self.len();
        self.insert(len, value)
    }

    pub fn remove(&mut self, index: usize) -> Result<DiscreteOperation, ModelError> {
        self.inner.submit(ArrayRemove { index })
    }

    pub fn replace(&mut self, index: usize, value: impl Into<ModelValue>) -> Result<DiscreteOperation, ModelError> {
        self.child_id(index)?;
        let value = self.inner.model.mint(&value.into());
        self.inner.submit(ArrayReplace { index, value })
    }

    pub fn reorder(&mut self, from_index: usize, to_index: usize) -> Result<DiscreteOperation, ModelError> {
        self.inner.submit(ArrayMove {
            from_index,
            to_index,
        })
    }

    pub fn set(&mut self, values: Vec<ModelValue>) -> Result<DiscreteOperation, ModelError> {
        self.inner.set_data(ModelValue::Array(values))
    }

    pub fn subscribe<F>(&mut self, listener: F) -> Result<ListenerId, ModelError>
    where
        F: FnMut(&NodeEvent) + Send + 'static,
    {
        self.inner.subscribe(listener)
    }
}

impl<'a> ObjectHandle<'a> {
    pub(super) fn from_node(inner: NodeHandle<'a>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> &NodeId {
        &self.inner.id
    }

    pub fn len(&self) -> usize {
        self.inner
            .model
            .object_ref(&self.inner.id)
            .map_or(0, |children| children.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.inner.model.object_child(&self.inner.id, key).is_ok()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner
            .model
            .object_ref(&self.inner.id)
            .map(|children| children.entries().keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn child_id(&self, key: &str) -> Result<NodeId, ModelError> {
        self.inner.model.object_child(&self.inner.id, key)
    }

    pub fn get(&self, key: &str) -> Result<ModelValue, ModelError> {
        let child = self.child_id(key)?;
        self.inner.model.data(&child)
    }

    pub fn child(&mut self, key: &str) -> Result<NodeHandle<'_>, ModelError> {
        let child = self.child_id(key)?;
        self.inner.model.node(&child)
    }

    pub fn data(&self) -> Result<ModelValue, ModelError> {
        self.inner.data()
    }

    /// Adds the property when absent, replaces its value otherwise.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ModelValue>) -> Result<DiscreteOperation, ModelError> {
        let key = key.into();
        let value = self.inner.model.mint(&value.into());
        if self.has_key(&key) {
            self.inner.submit(ObjectSetProperty { key, value })
        } else {
            self.inner.submit(ObjectAddProperty { key, value })
        }
    }

    pub fn remove(&mut self, key: &str) -> Result<DiscreteOperation, ModelError> {
        self.child_id(key)?;
        self.inner.submit(ObjectRemoveProperty {
            key: key.to_string(),
        })
    }

    pub fn set_all(&mut self, entries: IndexMap<String, ModelValue>) -> Result<DiscreteOperation, ModelError> {
        self.inner.set_data(ModelValue::Object(entries))
    }

    pub fn subscribe<F>(&mut self, listener: F) -> Result<ListenerId, ModelError>
    where
        F: FnMut(&NodeEvent) + Send + 'static,
    {
        self.inner.subscribe(listener)
    }
}

impl<'a> StringHandle<'a> {
    pub fn id(&self) -> &NodeId {
        &self.inner.id
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.inner
            .model
            .string_ref(&self.inner.id)
            .map_or(0, text::char_len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value(&self) -> Result<String, ModelError> {
        self.inner.model.string_ref(&self.inner.id).map(str::to_string)
    }

    pub fn insert(&mut self, index: usize, value: &str) -> Result<DiscreteOperation, ModelError> {
        self.inner.submit(StringInsert {
            index,
            value: value.to_string(),
        })
    }

    /// Removes `len` chars starting at `index`.
    pub fn remove(&mut self, index: usize, len: usize) -> Result<DiscreteOperation, ModelError> {
        if len == 0 {
            return Err(ModelError::EmptyEdit);
        }
        let current = self.inner.model.string_ref(&self.inner.id)?;
        let total = text::char_len(current);
        let end = index
            .checked_add(len)
            .filter(|end| *end <= total)
            .ok_or(ModelError::IndexOutOfBounds { index, len: total })?;
        let value = text::slice(current, index, end);
        self.inner.submit(StringRemove { index, value })
    }

    pub fn set(&mut self, value: impl Into<String>) -> Result<DiscreteOperation, ModelError> {
        self.inner.submit(StringSet {
            value: value.into(),
        })
    }
}

impl<'a> NumberHandle<'a> {
    pub fn id(&self) -> &NodeId {
        &self.inner.id
    }

    pub fn value(&self) -> Result<f64, ModelError> {
        match self.inner.data_ref()? {
            NodeData::Number(n) => Ok(*n),
            other => Err(ModelError::WrongType {
                id: self.inner.id.clone(),
                expected: NodeType::Number,
                actual: other.node_type(),
            }),
        }
    }

    pub fn add(&mut self, delta: f64) -> Result<DiscreteOperation, ModelError> {
        self.inner.submit(NumberDelta { delta })
    }

    pub fn set(&mut self, value: f64) -> Result<DiscreteOperation, ModelError> {
        self.inner.submit(NumberSet { value })
    }
}

impl<'a> BooleanHandle<'a> {
    pub fn id(&self) -> &NodeId {
        &self.inner.id
    }

    pub fn value(&self) -> Result<bool, ModelError> {
        match self.inner.data_ref()? {
            NodeData::Boolean(b) => Ok(*b),
            other => Err(ModelError::WrongType {
                id: self.inner.id.clone(),
                expected: NodeType::Boolean,
                actual: other.node_type(),
            }),
        }
    }

    pub fn set(&mut self, value: bool) -> Result<DiscreteOperation, ModelError> {
        self.inner.submit(BooleanSet { value })
    }
}

impl<'a> DateHandle<'a> {
    pub fn id(&self) -> &NodeId {
        &self.inner.id
    }

    pub fn value(&self) -> Result<DateTime<Utc>, ModelError> {
        match self.inner.data_ref()? {
            NodeData::Date(d) => Ok(*d),
            other => Err(ModelError::WrongType {
                id: self.inner.id.clone(),
                expected: NodeType::Date,
                actual: other.node_type(),
            }),
        }
    }

    pub fn set(&mut self, value: DateTime<Utc>) -> Result<DiscreteOperation, ModelError> {
        self.inner.submit(DateSet { value })
    }
}
