//! Immutable operation algebra.
//!
//! A [`DiscreteOperation`] targets exactly one node and carries one
//! [`Mutation`] payload. A [`CompoundOperation`] is an ordered batch of discrete
//! operations applied as one logical edit. Operations are never modified in
//! place: transforms derive new instances through
//! [`DiscreteOperation::copy_with`] and [`DiscreteOperation::as_no_op`].

mod discrete;
mod events;

pub use discrete::{
    ArrayInsert, ArrayMove, ArrayRemove, ArrayReplace, ArraySet, BooleanSet, DateSet, Mutation,
    NumberDelta, NumberSet, ObjectAddProperty, ObjectRemoveProperty, ObjectSet, ObjectSetProperty,
    StringInsert, StringRemove, StringSet,
};
pub use events::{ClientOperationEvent, ModelOperationEvent, ServerOperationEvent};

use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::model::NodeType;

/// Fieldless discriminant of [`Mutation`]; registry keys are pairs of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationType {
    ArrayInsert,
    ArrayRemove,
    ArrayReplace,
    ArrayMove,
    ArraySet,
    ObjectAddProperty,
    ObjectSetProperty,
    ObjectRemoveProperty,
    ObjectSet,
    StringInsert,
    StringRemove,
    StringSet,
    NumberDelta,
    NumberSet,
    BooleanSet,
    DateSet,
}

impl OperationType {
    pub const ALL: [OperationType; 16] = [
        OperationType::ArrayInsert,
        OperationType::ArrayRemove,
        OperationType::ArrayReplace,
        OperationType::ArrayMove,
        OperationType::ArraySet,
        OperationType::ObjectAddProperty,
        OperationType::ObjectSetProperty,
        OperationType::ObjectRemoveProperty,
        OperationType::ObjectSet,
        OperationType::StringInsert,
        OperationType::StringRemove,
        OperationType::StringSet,
        OperationType::NumberDelta,
        OperationType::NumberSet,
        OperationType::BooleanSet,
        OperationType::DateSet,
    ];

    /// The node type this kind of operation targets.
    pub fn node_type(self) -> NodeType {
        match self {
            OperationType::ArrayInsert
            | OperationType::ArrayRemove
            | OperationType::ArrayReplace
            | OperationType::ArrayMove
            | OperationType::ArraySet => NodeType::Array,
            OperationType::ObjectAddProperty
            | OperationType::ObjectSetProperty
            | OperationType::ObjectRemoveProperty
            | OperationType::ObjectSet => NodeType::Object,
            OperationType::StringInsert | OperationType::StringRemove | OperationType::StringSet => {
                NodeType::String
            }
            OperationType::NumberDelta | OperationType::NumberSet => NodeType::Number,
            OperationType::BooleanSet => NodeType::Boolean,
            OperationType::DateSet => NodeType::Date,
        }
    }

    /// All operation kinds that can target a node of `node_type`.
    pub fn for_node_type(node_type: NodeType) -> Vec<OperationType> {
        Self::ALL
            .into_iter()
            .filter(|kind| kind.node_type() == node_type)
            .collect()
    }
}

/// One mutation of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscreteOperation {
    id: NodeId,
    #[serde(default)]
    no_op: bool,
    #[serde(flatten)]
    mutation: Mutation,
}

impl DiscreteOperation {
    pub fn new(id: impl Into<NodeId>, mutation: impl Into<Mutation>) -> Self {
        Self {
            id: id.into(),
            no_op: false,
            mutation: mutation.into(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn is_no_op(&self) -> bool {
        self.no_op
    }

    pub fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    pub fn operation_type(&self) -> OperationType {
        self.mutation.operation_type()
    }

    /// Same target and flag, new payload.
    pub fn copy_with(&self, mutation: impl Into<Mutation>) -> Self {
        Self {
            id: self.id.clone(),
            no_op: self.no_op,
            mutation: mutation.into(),
        }
    }

    /// A placeholder with no remaining effect.
    pub fn as_no_op(&self) -> Self {
        Self {
            id: self.id.clone(),
            no_op: true,
            mutation: self.mutation.clone(),
        }
    }
}

/// An ordered, non-empty batch of discrete operations.
///
/// Decoding rejects an empty `ops` list; the concurrency control refuses to
/// send one built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCompound")]
pub struct CompoundOperation {
    ops: Vec<DiscreteOperation>,
}

#[derive(Deserialize)]
struct RawCompound {
    ops: Vec<DiscreteOperation>,
}

impl TryFrom<RawCompound> for CompoundOperation {
    type Error = &'static str;

    fn try_from(raw: RawCompound) -> Result<Self, Self::Error> {
        if raw.ops.is_empty() {
            return Err("compound operation has no ops");
        }
        Ok(Self { ops: raw.ops })
    }
}

impl CompoundOperation {
    pub fn new(ops: Vec<DiscreteOperation>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[DiscreteOperation] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<DiscreteOperation> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "operation", rename_all = "camelCase")]
pub enum Operation {
    Discrete(DiscreteOperation),
    Compound(CompoundOperation),
}

impl Operation {
    /// The discrete operations in application order.
    pub fn discrete_ops(&self) -> &[DiscreteOperation] {
        match self {
            Operation::Discrete(op) => std::slice::from_ref(op),
            Operation::Compound(compound) => compound.ops(),
        }
    }

    /// `true` when nothing in the operation has a remaining effect.
    pub fn is_no_op(&self) -> bool {
        self.discrete_ops().iter().all(DiscreteOperation::is_no_op)
    }
}

impl From<DiscreteOperation> for Operation {
    fn from(op: DiscreteOperation) -> Self {
        Operation::Discrete(op)
    }
}

impl From<CompoundOperation> for Operation {
    fn from(op: CompoundOperation) -> Self {
        Operation::Compound(op)
    }
}
