use thiserror::Error;

use crate::id::NodeId;
use crate::model::NodeType;
use crate::operation::OperationType;
use crate::reference::ReferenceType;

/// Usage violations on the value tree.
///
/// These are reported to the caller synchronously; the model stays valid and
/// usable after any of them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("node {id} is {actual:?}, expected {expected:?}")]
    WrongType {
        id: NodeId,
        expected: NodeType,
        actual: NodeType,
    },
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("property not found: {0}")]
    KeyNotFound(String),
    #[error("property already exists: {0}")]
    KeyExists(String),
    #[error("{0:?} nodes accept no mutation")]
    Immutable(NodeType),
    #[error("invalid number: {0}")]
    InvalidNumber(f64),
    #[error("empty string edit")]
    EmptyEdit,
    #[error("duplicate node id: {0}")]
    DuplicateId(NodeId),
    #[error("root value must be an object")]
    RootNotObject,
    #[error("the root node cannot be detached")]
    RootImmutable,
    #[error("{operation:?} cannot target a {node:?} node")]
    OperationMismatch {
        operation: OperationType,
        node: NodeType,
    },
}

/// Failures raised by the transformation registries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// A gap in the matrix. This is a configuration error, never recoverable.
    #[error("no transformation function registered for ({server:?}, {client:?})")]
    Unregistered {
        server: OperationType,
        client: OperationType,
    },
    #[error("no reference transformation function registered for ({operation:?}, {reference:?})")]
    UnregisteredReference {
        operation: OperationType,
        reference: ReferenceType,
    },
    /// A property was concurrently added while the other side already saw it
    /// (or also added it). The ordering authority broke the protocol.
    #[error("conflicting concurrent {server:?}/{client:?} on property '{key}'")]
    PropertyConflict {
        key: String,
        server: OperationType,
        client: OperationType,
    },
    #[error("registered function for ({server:?}, {client:?}) received other operation kinds")]
    KindMismatch {
        server: OperationType,
        client: OperationType,
    },
}

/// Errors raised by the client concurrency control.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConcurrencyError {
    #[error("acknowledgement for seq {seq_no} received with no operation in flight")]
    NoInFlightOperation { seq_no: u64 },
    #[error("version mismatch: expected {expected}, received {actual}")]
    VersionMismatch { expected: u64, actual: u64 },
    #[error("sequence number mismatch: expected {expected}, received {actual}")]
    SequenceMismatch { expected: u64, actual: u64 },
    #[error("a batch is already in progress")]
    BatchInProgress,
    #[error("no batch is in progress")]
    NoBatchInProgress,
    #[error("a batch with pending operations cannot be cancelled")]
    BatchNotEmpty,
    #[error("cannot complete an empty batch")]
    BatchEmpty,
    #[error("compound operations cannot be added to a batch")]
    CompoundInBatch,
    #[error("compound operations must hold at least one operation")]
    EmptyCompound,
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),
}

impl ConcurrencyError {
    /// Returns `true` for errors that mean the ordering authority or the
    /// transport broke its contract. The session must stop on these.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            ConcurrencyError::NoInFlightOperation { .. }
                | ConcurrencyError::VersionMismatch { .. }
                | ConcurrencyError::SequenceMismatch { .. }
                | ConcurrencyError::Transform(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocumentError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("concurrency control error: {0}")]
    Concurrency(#[from] ConcurrencyError),
    #[error("document closed after a protocol violation: {0}")]
    Closed(String),
}
