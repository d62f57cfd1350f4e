use std::collections::HashMap;
use std::fmt;

use log::trace;

use super::{array, number, object, scalar, string};
use crate::error::TransformError;
use crate::operation::{DiscreteOperation, OperationType};

/// Transforms a `(server, client)` pair of discrete operations of one
/// registered kind pair.
pub type TransformFn =
    fn(&DiscreteOperation, &DiscreteOperation) -> Result<(DiscreteOperation, DiscreteOperation), TransformError>;

/// Lookup table keyed by `(server kind, client kind)`.
///
/// Registrations are asymmetric: `(ArrayInsert, ArrayRemove)` and
/// `(ArrayRemove, ArrayInsert)` are distinct entries.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    functions: HashMap<(OperationType, OperationType), TransformFn>,
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("entries", &self.functions.len())
            .finish()
    }
}

impl TransformRegistry {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full matrix for every node type.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        array::register(&mut registry);
        object::register(&mut registry);
        string::register(&mut registry);
        number::register(&mut registry);
        scalar::register(&mut registry);
        registry
    }

    /// Adds or replaces an entry, returning the previous function.
    pub fn register(
        &mut self,
        server: OperationType,
        client: OperationType,
        function: TransformFn,
    ) -> Option<TransformFn> {
        self.functions.insert((server, client), function)
    }

    pub fn get(&self, server: OperationType, client: OperationType) -> Option<TransformFn> {
        self.functions.get(&(server, client)).copied()
    }

    pub fn contains(&self, server: OperationType, client: OperationType) -> bool {
        self.functions.contains_key(&(server, client))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered `(server, client)` keys, in no particular order.
    pub fn pairs(&self) -> impl Iterator<Item = (OperationType, OperationType)> + '_ {
        self.functions.keys().copied()
    }

    /// Transforms two discrete operations.
    ///
    /// Operations on different nodes, and pairs where either side is already
    /// a no-op, pass through unchanged without a lookup.
    pub fn transform(
        &self,
        server: &DiscreteOperation,
        client: &DiscreteOperation,
    ) -> Result<(DiscreteOperation, DiscreteOperation), TransformError> {
        if server.id() != client.id() || server.is_no_op() || client.is_no_op() {
            return Ok((server.clone(), client.clone()));
        }
        let key = (server.operation_type(), client.operation_type());
        let function = self.get(key.0, key.1).ok_or(TransformError::Unregistered {
            server: key.0,
            client: key.1,
        })?;
        let (server_out, client_out) = function(server, client)?;
        trace!(
            "transformed {:?} x {:?} on {}: server no_op={} client no_op={}",
            key.0,
            key.1,
            server.id(),
            server_out.is_no_op(),
            client_out.is_no_op()
        );
        Ok((server_out, client_out))
    }
}
