//! Transformation of concurrent operations.
//!
//! For a server-ordered operation `s` and a client-ordered operation `c`
//! targeting the same node, a transform yields `(s', c')` such that applying
//! `c` then `s'` leaves the node in the same state as applying `s` then `c'`.
//!
//! The per-kind rules live in [`array`], [`object`], [`string`], [`number`]
//! and [`scalar`] as typed functions over the payload structs; the registry
//! adapts them to [`DiscreteOperation`] pairs.

use crate::operation::{DiscreteOperation, Mutation};

/// Registers a typed payload transform under its `(server, client)` key.
///
/// The plain form wraps an infallible `fn(&S, &C) -> Outcome<S, C>`; the
/// `fallible` form wraps one returning `Result<Outcome<S, C>, TransformError>`.
macro_rules! register {
    ($registry:expr, $server:ident, $client:ident, $function:path) => {
        $registry.register(
            $crate::operation::OperationType::$server,
            $crate::operation::OperationType::$client,
            |s, c| match (s.mutation(), c.mutation()) {
                (
                    $crate::operation::Mutation::$server(server),
                    $crate::operation::Mutation::$client(client),
                ) => {
                    let (server_outcome, client_outcome) = $function(server, client);
                    Ok((
                        $crate::transform::resolve(s, server_outcome),
                        $crate::transform::resolve(c, client_outcome),
                    ))
                }
                _ => Err($crate::error::TransformError::KindMismatch {
                    server: s.operation_type(),
                    client: c.operation_type(),
                }),
            },
        )
    };
    (fallible $registry:expr, $server:ident, $client:ident, $function:path) => {
        $registry.register(
            $crate::operation::OperationType::$server,
            $crate::operation::OperationType::$client,
            |s, c| match (s.mutation(), c.mutation()) {
                (
                    $crate::operation::Mutation::$server(server),
                    $crate::operation::Mutation::$client(client),
                ) => {
                    let (server_outcome, client_outcome) = $function(server, client)?;
                    Ok((
                        $crate::transform::resolve(s, server_outcome),
                        $crate::transform::resolve(c, client_outcome),
                    ))
                }
                _ => Err($crate::error::TransformError::KindMismatch {
                    server: s.operation_type(),
                    client: c.operation_type(),
                }),
            },
        )
    };
}

pub mod array;
pub mod number;
pub mod object;
mod operation_transformer;
mod reference;
mod registry;
pub mod scalar;
pub mod string;

pub use operation_transformer::{OperationPair, OperationTransformer};
pub use reference::{ReferenceTransformFn, ReferenceTransformer};
pub use registry::{TransformFn, TransformRegistry};

/// What a transform did to one side of the pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed<T> {
    Unchanged,
    Updated(T),
    /// The operation has no remaining effect.
    NoOp,
}

/// Server and client outcomes of one typed transform.
pub type Outcome<S, C> = (Transformed<S>, Transformed<C>);

/// Builds the transformed operation for one side.
pub(crate) fn resolve<T: Into<Mutation>>(op: &DiscreteOperation, outcome: Transformed<T>) -> DiscreteOperation {
    match outcome {
        Transformed::Unchanged => op.clone(),
        Transformed::Updated(payload) => op.copy_with(payload),
        Transformed::NoOp => op.as_no_op(),
    }
}

pub(crate) fn unchanged<S, C>() -> Outcome<S, C> {
    (Transformed::Unchanged, Transformed::Unchanged)
}

/// Concurrent whole-value sets: equal values cancel out, otherwise the
/// server's value wins.
pub(crate) fn set_wins<S: PartialEq>(server: &S, client: &S) -> Outcome<S, S> {
    if server == client {
        (Transformed::NoOp, Transformed::NoOp)
    } else {
        (Transformed::Unchanged, Transformed::NoOp)
    }
}

/// The server side is overwritten by a concurrent client set.
pub(crate) fn server_overwritten<S, C>(_: &S, _: &C) -> Outcome<S, C> {
    (Transformed::NoOp, Transformed::Unchanged)
}

/// The client side is overwritten by a concurrent server set.
pub(crate) fn client_overwritten<S, C>(_: &S, _: &C) -> Outcome<S, C> {
    (Transformed::Unchanged, Transformed::NoOp)
}

/// Swaps the roles of a transform written for the opposite ordering.
pub(crate) fn flipped<S, C>((client, server): Outcome<C, S>) -> Outcome<S, C> {
    (server, client)
}
