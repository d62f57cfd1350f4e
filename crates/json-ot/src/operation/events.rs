use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Operation;

/// A local operation on its way to the ordering server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOperationEvent {
    pub session_id: String,
    /// Correlates the server acknowledgement.
    pub seq_no: u64,
    /// Server version the operation was issued against.
    pub context_version: u64,
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
}

/// An operation placed in the linear history by the ordering server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerOperationEvent {
    pub session_id: String,
    pub user_id: Option<String>,
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
}

/// Emitted by the model after it applied a remote operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOperationEvent {
    pub session_id: String,
    pub user_id: Option<String>,
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
}

impl From<ServerOperationEvent> for ModelOperationEvent {
    fn from(event: ServerOperationEvent) -> Self {
        Self {
            session_id: event.session_id,
            user_id: event.user_id,
            version: event.version,
            timestamp: event.timestamp,
            operation: event.operation,
        }
    }
}
