use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::OperationType;
use crate::value::DataValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayInsert {
    pub index: usize,
    pub value: DataValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayRemove {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayReplace {
    pub index: usize,
    pub value: DataValue,
}

/// Moves the element at `from_index` so that it ends up at `to_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayMove {
    pub from_index: usize,
    pub to_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArraySet {
    pub value: Vec<DataValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectAddProperty {
    pub key: String,
    pub value: DataValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSetProperty {
    pub key: String,
    pub value: DataValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRemoveProperty {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSet {
    pub value: IndexMap<String, DataValue>,
}

/// Inserts `value` before the character at `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringInsert {
    pub index: usize,
    pub value: String,
}

/// Removes the characters `value` starting at `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringRemove {
    pub index: usize,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringSet {
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumberDelta {
    pub delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumberSet {
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanSet {
    pub value: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSet {
    pub value: DateTime<Utc>,
}

/// Payload of a discrete operation, one variant per [`OperationType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mutation {
    ArrayInsert(ArrayInsert),
    ArrayRemove(ArrayRemove),
    ArrayReplace(ArrayReplace),
    ArrayMove(ArrayMove),
    ArraySet(ArraySet),
    ObjectAddProperty(ObjectAddProperty),
    ObjectSetProperty(ObjectSetProperty),
    ObjectRemoveProperty(ObjectRemoveProperty),
    ObjectSet(ObjectSet),
    StringInsert(StringInsert),
    StringRemove(StringRemove),
    StringSet(StringSet),
    NumberDelta(NumberDelta),
    NumberSet(NumberSet),
    BooleanSet(BooleanSet),
    DateSet(DateSet),
}

macro_rules! mutation_kinds {
    ($($kind:ident),* $(,)?) => {
        impl Mutation {
            pub fn operation_type(&self) -> OperationType {
                match self {
                    $(Mutation::$kind(_) => OperationType::$kind,)*
                }
            }
        }

        $(
            impl From<$kind> for Mutation {
                fn from(payload: $kind) -> Self {
                    Mutation::$kind(payload)
                }
            }
        )*
    };
}

mutation_kinds!(
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
);
