//! Operational transformation core for collaborative JSON-like documents.
//!
//! The crate is organised leaves first:
//! - [`model`]: the versioned value tree (nodes, handles, change events),
//! - [`operation`]: the immutable operation algebra,
//! - [`range`]: index/range classification used by the transforms,
//! - [`transform`]: the transformation function registry, the operation
//!   transformer and the reference transformer,
//! - [`concurrency`]: the per-document client state machine,
//! - [`document`]: a model and its concurrency control wired together.

pub mod concurrency;
pub mod document;
pub mod error;
pub mod events;
pub mod id;
pub mod model;
pub mod operation;
pub mod options;
pub mod path;
pub mod range;
pub mod reference;
mod text;
pub mod transform;
pub mod value;

pub use concurrency::{ClientConcurrencyControl, CommitStateChanged};
pub use document::RealTimeDocument;
pub use error::{ConcurrencyError, DocumentError, ModelError, TransformError};
pub use id::{IdGenerator, NodeId, SessionIdGenerator};
pub use model::{Model, NodeType};
pub use operation::{
    ClientOperationEvent, CompoundOperation, DiscreteOperation, ModelOperationEvent, Mutation,
    Operation, OperationType, ServerOperationEvent,
};
pub use options::DocumentOptions;
pub use path::{Path, PathElement};
pub use reference::{IndexRange, ModelReference, ReferenceType, ReferenceValue};
pub use transform::{OperationPair, OperationTransformer, ReferenceTransformer};
pub use value::{DataValue, ModelValue};

use rand::Rng;

/// Length of randomly generated session ids.
pub const SESSION_ID_LEN: usize = 12;

/// Generates a random alphanumeric session id.
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SESSION_ID_LEN)
        .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
        .collect()
}

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
