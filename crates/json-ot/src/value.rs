//! Native values and id-carrying data value snapshots.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::{IdGenerator, NodeId};
use crate::model::NodeType;

/// A plain value as read from or written to the model.
///
/// This is JSON plus the two node kinds JSON cannot express: dates and
/// `undefined`.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelValue {
    Null,
    Undefined,
    Boolean(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<ModelValue>),
    Object(IndexMap<String, ModelValue>),
}

impl ModelValue {
    pub fn node_type(&self) -> NodeType {
        match self {
            ModelValue::Null => NodeType::Null,
            ModelValue::Undefined => NodeType::Undefined,
            ModelValue::Boolean(_) => NodeType::Boolean,
            ModelValue::Number(_) => NodeType::Number,
            ModelValue::String(_) => NodeType::String,
            ModelValue::Date(_) => NodeType::Date,
            ModelValue::Array(_) => NodeType::Array,
            ModelValue::Object(_) => NodeType::Object,
        }
    }

    /// Lossy JSON view: dates become RFC 3339 strings, `undefined` becomes
    /// `null`, integral numbers are emitted as integers.
    pub fn to_json(&self) -> Value {
        match self {
            ModelValue::Null | ModelValue::Undefined => Value::Null,
            ModelValue::Boolean(b) => Value::Bool(*b),
            ModelValue::Number(n) => number_to_json(*n),
            ModelValue::String(s) => Value::String(s.clone()),
            ModelValue::Date(d) => Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ModelValue::Array(items) => Value::Array(items.iter().map(ModelValue::to_json).collect()),
            ModelValue::Object(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_json());
                }
                Value::Object(map)
            }
        }
    }
}

pub(crate) fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

impl From<Value> for ModelValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ModelValue::Null,
            Value::Bool(b) => ModelValue::Boolean(b),
            Value::Number(n) => ModelValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => ModelValue::String(s),
            Value::Array(items) => ModelValue::Array(items.into_iter().map(ModelValue::from).collect()),
            Value::Object(map) => ModelValue::Object(
                map.into_iter()
                    .map(|(key, value)| (key, ModelValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ModelValue {
    fn from(value: &str) -> Self {
        ModelValue::String(value.to_string())
    }
}

impl From<String> for ModelValue {
    fn from(value: String) -> Self {
        ModelValue::String(value)
    }
}

impl From<f64> for ModelValue {
    fn from(value: f64) -> Self {
        ModelValue::Number(value)
    }
}

impl From<i64> for ModelValue {
    fn from(value: i64) -> Self {
        ModelValue::Number(value as f64)
    }
}

impl From<bool> for ModelValue {
    fn from(value: bool) -> Self {
        ModelValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for ModelValue {
    fn from(value: DateTime<Utc>) -> Self {
        ModelValue::Date(value)
    }
}

impl From<Vec<ModelValue>> for ModelValue {
    fn from(value: Vec<ModelValue>) -> Self {
        ModelValue::Array(value)
    }
}

impl From<IndexMap<String, ModelValue>> for ModelValue {
    fn from(value: IndexMap<String, ModelValue>) -> Self {
        ModelValue::Object(value)
    }
}

/// Serializable snapshot of a node subtree, ids included.
///
/// Operations carry values in this form so every replica attaches nodes with
/// the same ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DataValue {
    Null { id: NodeId },
    Undefined { id: NodeId },
    Boolean { id: NodeId, value: bool },
    Number { id: NodeId, value: f64 },
    String { id: NodeId, value: String },
    Date { id: NodeId, value: DateTime<Utc> },
    Array { id: NodeId, children: Vec<DataValue> },
    Object { id: NodeId, children: IndexMap<String, DataValue> },
}

impl DataValue {
    pub fn id(&self) -> &NodeId {
        match self {
            DataValue::Null { id }
            | DataValue::Undefined { id }
            | DataValue::Boolean { id, .. }
            | DataValue::Number { id, .. }
            | DataValue::String { id, .. }
            | DataValue::Date { id, .. }
            | DataValue::Array { id, .. }
            | DataValue::Object { id, .. } => id,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            DataValue::Null { .. } => NodeType::Null,
            DataValue::Undefined { .. } => NodeType::Undefined,
            DataValue::Boolean { .. } => NodeType::Boolean,
            DataValue::Number { .. } => NodeType::Number,
            DataValue::String { .. } => NodeType::String,
            DataValue::Date { .. } => NodeType::Date,
            DataValue::Array { .. } => NodeType::Array,
            DataValue::Object { .. } => NodeType::Object,
        }
    }

    /// Builds a snapshot for `value`, minting one id per node depth-first.
    pub fn from_model_value(value: &ModelValue, ids: &mut dyn IdGenerator) -> DataValue {
        let id = ids.next_id();
        match value {
            ModelValue::Null => DataValue::Null { id },
            ModelValue::Undefined => DataValue::Undefined { id },
            ModelValue::Boolean(b) => DataValue::Boolean { id, value: *b },
            ModelValue::Number(n) => DataValue::Number { id, value: *n },
            ModelValue::String(s) => DataValue::String {
                id,
                value: s.clone(),
            },
            ModelValue::Date(d) => DataValue::Date { id, value: *d },
            ModelValue::Array(items) => DataValue::Array {
                id,
                children: items
                    .iter()
                    .map(|item| DataValue::from_model_value(item, ids))
                    .collect(),
            },
            ModelValue::Object(entries) => DataValue::Object {
                id,
                children: entries
                    .iter()
                    .map(|(key, item)| (key.clone(), DataValue::from_model_value(item, ids)))
                    .collect(),
            },
        }
    }

    pub fn from_json(value: &Value, ids: &mut dyn IdGenerator) -> DataValue {
        DataValue::from_model_value(&ModelValue::from(value.clone()), ids)
    }

    /// Drops the ids.
    pub fn to_model_value(&self) -> ModelValue {
        match self {
            DataValue::Null { .. } => ModelValue::Null,
            DataValue::Undefined { .. } => ModelValue::Undefined,
            DataValue::Boolean { value, .. } => ModelValue::Boolean(*value),
            DataValue::Number { value, .. } => ModelValue::Number(*value),
            DataValue::String { value, .. } => ModelValue::String(value.clone()),
            DataValue::Date { value, .. } => ModelValue::Date(*value),
            DataValue::Array { children, .. } => {
                ModelValue::Array(children.iter().map(DataValue::to_model_value).collect())
            }
            DataValue::Object { children, .. } => ModelValue::Object(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), child.to_model_value()))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        self.to_model_value().to_json()
    }
}
