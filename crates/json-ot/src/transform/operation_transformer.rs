use crate::error::TransformError;
use crate::operation::{CompoundOperation, DiscreteOperation, Operation};

use super::TransformRegistry;

/// A transformed `(server, client)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationPair {
    pub server: Operation,
    pub client: Operation,
}

/// Drives the registry over discrete and compound operations.
#[derive(Debug, Clone)]
pub struct OperationTransformer {
    registry: TransformRegistry,
}

impl Default for OperationTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationTransformer {
    pub fn new() -> Self {
        Self::with_registry(TransformRegistry::standard())
    }

    pub fn with_registry(registry: TransformRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    /// Transforms `client` against a concurrent `server` operation.
    ///
    /// A compound server operation is folded left over its parts, each part
    /// transformed against the client side as rewritten by the previous ones;
    /// a compound client operation is folded the same way with the server side
    /// threaded through.
    pub fn transform(&self, server: &Operation, client: &Operation) -> Result<OperationPair, TransformError> {
        match server {
            Operation::Discrete(server) => {
                let (server, client) = self.transform_discrete(server, client)?;
                Ok(OperationPair {
                    server: server.into(),
                    client,
                })
            }
            Operation::Compound(compound) => {
                let mut client = client.clone();
                let mut ops = Vec::with_capacity(compound.len());
                for server_op in compound.ops() {
                    let (server_op, next_client) = self.transform_discrete(server_op, &client)?;
                    ops.push(server_op);
                    client = next_client;
                }
                Ok(OperationPair {
                    server: CompoundOperation::new(ops).into(),
                    client,
                })
            }
        }
    }

    fn transform_discrete(
        &self,
        server: &DiscreteOperation,
        client: &Operation,
    ) -> Result<(DiscreteOperation, Operation), TransformError> {
        match client {
            Operation::Discrete(client) => {
                let (server, client) = self.registry.transform(server, client)?;
                Ok((server, client.into()))
            }
            Operation::Compound(compound) => {
                let mut server = server.clone();
                let mut ops = Vec::with_capacity(compound.len());
                for client_op in compound.ops() {
                    let (next_server, client_op) = self.registry.transform(&server, client_op)?;
                    ops.push(client_op);
                    server = next_server;
                }
                Ok((server, CompoundOperation::new(ops).into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{ArrayInsert, ArrayRemove, Mutation};
    use crate::value::DataValue;

    fn ins(index: usize, tag: &str) -> DiscreteOperation {
        DiscreteOperation::new(
            "list",
            ArrayInsert {
                index,
                value: DataValue::String {
                    id: tag.into(),
                    value: tag.into(),
                },
            },
        )
    }

    fn index_of(op: &DiscreteOperation) -> usize {
        match op.mutation() {
            Mutation::ArrayInsert(p) => p.index,
            Mutation::ArrayRemove(p) => p.index,
            other => panic!("unexpected mutation {other:?}"),
        }
    }

    #[test]
    fn compound_server_threads_the_client() {
        let transformer = OperationTransformer::new();
        let server = Operation::Compound(CompoundOperation::new(vec![ins(0, "a"), ins(0, "b")]));
        let client = Operation::Discrete(ins(0, "c"));
        let pair = transformer.transform(&server, &client).expect("transform must succeed");
        assert_eq!(pair.server, server);
        assert_eq!(index_of(&pair.client.discrete_ops()[0]), 2);
    }

    #[test]
    fn compound_client_threads_the_server() {
        let transformer = OperationTransformer::new();
        let server = Operation::Discrete(DiscreteOperation::new("list", ArrayRemove { index: 3 }));
        let client = Operation::Compound(CompoundOperation::new(vec![ins(0, "a"), ins(1, "b")]));
        let pair = transformer.transform(&server, &client).expect("transform must succeed");
        assert_eq!(index_of(&pair.server.discrete_ops()[0]), 5);
        assert_eq!(pair.client, client);
    }
}
