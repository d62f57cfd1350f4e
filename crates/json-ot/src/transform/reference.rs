use std::collections::HashMap;
use std::fmt;

use crate::error::TransformError;
use crate::operation::{DiscreteOperation, Mutation, Operation, OperationType};
use crate::reference::{ModelReference, ReferenceType};
use crate::text;

/// Adjusts a reference for one operation; `None` means the reference no
/// longer points at anything meaningful.
pub type ReferenceTransformFn =
    fn(&DiscreteOperation, &ModelReference) -> Result<Option<ModelReference>, TransformError>;

/// Registry keyed by `(operation kind, reference kind)`.
///
/// Only string references are tracked; array and object operations have no
/// entries and fail as unregistered.
#[derive(Clone, Default)]
pub struct ReferenceTransformer {
    functions: HashMap<(OperationType, ReferenceType), ReferenceTransformFn>,
}

impl fmt::Debug for ReferenceTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceTransformer")
            .field("entries", &self.functions.len())
            .finish()
    }
}

impl ReferenceTransformer {
    pub fn new() -> Self {
        let mut transformer = Self::empty();
        for reference in [ReferenceType::Index, ReferenceType::Range] {
            transformer.register(OperationType::StringInsert, reference, string_insert);
            transformer.register(OperationType::StringRemove, reference, string_remove);
            transformer.register(OperationType::StringSet, reference, invalidate);
        }
        transformer
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        operation: OperationType,
        reference: ReferenceType,
        function: ReferenceTransformFn,
    ) -> Option<ReferenceTransformFn> {
        self.functions.insert((operation, reference), function)
    }

    pub fn contains(&self, operation: OperationType, reference: ReferenceType) -> bool {
        self.functions.contains_key(&(operation, reference))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Transforms `reference` against every discrete operation of
    /// `operation`, stopping at the first one that invalidates it.
    pub fn transform(
        &self,
        operation: &Operation,
        reference: &ModelReference,
    ) -> Result<Option<ModelReference>, TransformError> {
        let mut current = reference.clone();
        for op in operation.discrete_ops() {
            match self.transform_discrete(op, &current)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    pub fn transform_discrete(
        &self,
        op: &DiscreteOperation,
        reference: &ModelReference,
    ) -> Result<Option<ModelReference>, TransformError> {
        if op.is_no_op() || op.id() != &reference.value_id {
            return Ok(Some(reference.clone()));
        }
        let key = (op.operation_type(), reference.reference_type());
        let function = self
            .functions
            .get(&key)
            .ok_or(TransformError::UnregisteredReference {
                operation: key.0,
                reference: key.1,
            })?;
        function(op, reference)
    }
}

fn kind_mismatch(op: &DiscreteOperation, reference: &ModelReference) -> TransformError {
    TransformError::UnregisteredReference {
        operation: op.operation_type(),
        reference: reference.reference_type(),
    }
}

/// Positions at or after the insertion point move right.
fn string_insert(
    op: &DiscreteOperation,
    reference: &ModelReference,
) -> Result<Option<ModelReference>, TransformError> {
    let Mutation::StringInsert(insert) = op.mutation() else {
        return Err(kind_mismatch(op, reference));
    };
    let len = text::char_len(&insert.value);
    let value = reference.value.map_indices(|index| {
        if index >= insert.index {
            index.saturating_add(len)
        } else {
            index
        }
    });
    Ok(Some(reference.with_value(value)))
}

/// Positions after the removal point move left, clipped to its start.
fn string_remove(
    op: &DiscreteOperation,
    reference: &ModelReference,
) -> Result<Option<ModelReference>, TransformError> {
    let Mutation::StringRemove(remove) = op.mutation() else {
        return Err(kind_mismatch(op, reference));
    };
    let len = text::char_len(&remove.value);
    let value = reference.value.map_indices(|index| {
        if index > remove.index {
            index - (index - remove.index).min(len)
        } else {
            index
        }
    });
    Ok(Some(reference.with_value(value)))
}

fn invalidate(
    _: &DiscreteOperation,
    _: &ModelReference,
) -> Result<Option<ModelReference>, TransformError> {
    Ok(None)
}
