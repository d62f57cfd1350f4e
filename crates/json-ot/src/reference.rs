//! Cursor and selection references.
//!
//! A reference points into one node without being part of the document
//! state. It is reconciled against concurrent operations by the
//! [`ReferenceTransformer`](crate::transform::ReferenceTransformer).

use serde::{Deserialize, Serialize};

use crate::id::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceType {
    Index,
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ReferenceValue {
    Index(Vec<usize>),
    Range(Vec<IndexRange>),
}

impl ReferenceValue {
    pub fn reference_type(&self) -> ReferenceType {
        match self {
            ReferenceValue::Index(_) => ReferenceType::Index,
            ReferenceValue::Range(_) => ReferenceType::Range,
        }
    }

    /// Applies `f` to every index, range endpoints included.
    pub fn map_indices(&self, mut f: impl FnMut(usize) -> usize) -> ReferenceValue {
        match self {
            ReferenceValue::Index(indices) => {
                ReferenceValue::Index(indices.iter().map(|index| f(*index)).collect())
            }
            ReferenceValue::Range(ranges) => ReferenceValue::Range(
                ranges
                    .iter()
                    .map(|range| IndexRange {
                        start: f(range.start),
                        end: f(range.end),
                    })
                    .collect(),
            ),
        }
    }
}

/// A session's named reference into the node `value_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReference {
    pub value_id: NodeId,
    pub key: String,
    pub session_id: String,
    pub value: ReferenceValue,
}

impl ModelReference {
    pub fn reference_type(&self) -> ReferenceType {
        self.value.reference_type()
    }

    pub fn with_value(&self, value: ReferenceValue) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }
}
