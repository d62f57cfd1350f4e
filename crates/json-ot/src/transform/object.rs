//! Object transforms.
//!
//! Adding a property concurrently with any other edit of the same key means
//! the two sides disagreed about whether the key existed, which the ordering
//! server must never allow. Those pairs fail with
//! [`TransformError::PropertyConflict`].

use super::{
    client_overwritten, server_overwritten, set_wins, unchanged, Outcome, Transformed,
    TransformRegistry,
};
use crate::error::TransformError;
use crate::operation::{
    ObjectAddProperty, ObjectRemoveProperty, ObjectSet, ObjectSetProperty, OperationType,
};

pub(super) fn register(registry: &mut TransformRegistry) {
    register!(fallible registry, ObjectAddProperty, ObjectAddProperty, add_add);
    register!(fallible registry, ObjectAddProperty, ObjectSetProperty, add_set);
    register!(fallible registry, ObjectAddProperty, ObjectRemoveProperty, add_remove);
    register!(registry, ObjectAddProperty, ObjectSet, server_overwritten);

    register!(fallible registry, ObjectSetProperty, ObjectAddProperty, set_add);
    register!(registry, ObjectSetProperty, ObjectSetProperty, set_set_property);
    register!(registry, ObjectSetProperty, ObjectRemoveProperty, set_remove);
    register!(registry, ObjectSetProperty, ObjectSet, server_overwritten);

    register!(fallible registry, ObjectRemoveProperty, ObjectAddProperty, remove_add);
    register!(registry, ObjectRemoveProperty, ObjectSetProperty, remove_set);
    register!(registry, ObjectRemoveProperty, ObjectRemoveProperty, remove_remove);
    register!(registry, ObjectRemoveProperty, ObjectSet, server_overwritten);

    register!(registry, ObjectSet, ObjectAddProperty, client_overwritten);
    register!(registry, ObjectSet, ObjectSetProperty, client_overwritten);
    register!(registry, ObjectSet, ObjectRemoveProperty, client_overwritten);
    register!(registry, ObjectSet, ObjectSet, set_set);
}

fn conflict_on<S, C>(
    server_key: &str,
    client_key: &str,
    server: OperationType,
    client: OperationType,
) -> Result<Outcome<S, C>, TransformError> {
    if server_key == client_key {
        return Err(TransformError::PropertyConflict {
            key: server_key.to_string(),
            server,
            client,
        });
    }
    Ok(unchanged())
}

pub fn add_add(
    s: &ObjectAddProperty,
    c: &ObjectAddProperty,
) -> Result<Outcome<ObjectAddProperty, ObjectAddProperty>, TransformError> {
    conflict_on(&s.key, &c.key, OperationType::ObjectAddProperty, OperationType::ObjectAddProperty)
}

pub fn add_set(
    s: &ObjectAddProperty,
    c: &ObjectSetProperty,
) -> Result<Outcome<ObjectAddProperty, ObjectSetProperty>, TransformError> {
    conflict_on(&s.key, &c.key, OperationType::ObjectAddProperty, OperationType::ObjectSetProperty)
}

pub fn add_remove(
    s: &ObjectAddProperty,
    c: &ObjectRemoveProperty,
) -> Result<Outcome<ObjectAddProperty, ObjectRemoveProperty>, TransformError> {
    conflict_on(&s.key, &c.key, OperationType::ObjectAddProperty, OperationType::ObjectRemoveProperty)
}

pub fn set_add(
    s: &ObjectSetProperty,
    c: &ObjectAddProperty,
) -> Result<Outcome<ObjectSetProperty, ObjectAddProperty>, TransformError> {
    conflict_on(&s.key, &c.key, OperationType::ObjectSetProperty, OperationType::ObjectAddProperty)
}

pub fn remove_add(
    s: &ObjectRemoveProperty,
    c: &ObjectAddProperty,
) -> Result<Outcome<ObjectRemoveProperty, ObjectAddProperty>, TransformError> {
    conflict_on(&s.key, &c.key, OperationType::ObjectRemoveProperty, OperationType::ObjectAddProperty)
}

pub fn set_set_property(
    s: &ObjectSetProperty,
    c: &ObjectSetProperty,
) -> Outcome<ObjectSetProperty, ObjectSetProperty> {
    match (s.key == c.key, s.value == c.value) {
        (false, _) => unchanged(),
        (true, true) => (Transformed::NoOp, Transformed::NoOp),
        (true, false) => (Transformed::Unchanged, Transformed::NoOp),
    }
}

/// A value written to a concurrently removed key is dropped.
pub fn set_remove(
    s: &ObjectSetProperty,
    c: &ObjectRemoveProperty,
) -> Outcome<ObjectSetProperty, ObjectRemoveProperty> {
    if s.key == c.key {
        (Transformed::NoOp, Transformed::Unchanged)
    } else {
        unchanged()
    }
}

pub fn remove_set(
    s: &ObjectRemoveProperty,
    c: &ObjectSetProperty,
) -> Outcome<ObjectRemoveProperty, ObjectSetProperty> {
    if s.key == c.key {
        (Transformed::Unchanged, Transformed::NoOp)
    } else {
        unchanged()
    }
}

pub fn remove_remove(
    s: &ObjectRemoveProperty,
    c: &ObjectRemoveProperty,
) -> Outcome<ObjectRemoveProperty, ObjectRemoveProperty> {
    if s.key == c.key {
        (Transformed::NoOp, Transformed::NoOp)
    } else {
        unchanged()
    }
}

fn set_set(s: &ObjectSet, c: &ObjectSet) -> Outcome<ObjectSet, ObjectSet> {
    set_wins(s, c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DataValue;

    fn text(id: &str, value: &str) -> DataValue {
        DataValue::String {
            id: id.into(),
            value: value.into(),
        }
    }

    #[test]
    fn concurrent_adds_of_one_key_conflict() {
        let s = ObjectAddProperty {
            key: "k".into(),
            value: text("a", "x"),
        };
        let c = ObjectAddProperty {
            key: "k".into(),
            value: text("b", "y"),
        };
        assert_eq!(
            add_add(&s, &c),
            Err(TransformError::PropertyConflict {
                key: "k".into(),
                server: OperationType::ObjectAddProperty,
                client: OperationType::ObjectAddProperty,
            })
        );
        let other = ObjectAddProperty {
            key: "j".into(),
            value: text("b", "y"),
        };
        assert_eq!(add_add(&s, &other), Ok(unchanged()));
    }

    #[test]
    fn property_sets_follow_the_set_rule() {
        let s = ObjectSetProperty {
            key: "k".into(),
            value: text("a", "x"),
        };
        let c = ObjectSetProperty {
            key: "k".into(),
            value: text("b", "x"),
        };
        assert_eq!(set_set_property(&s, &c), (Transformed::Unchanged, Transformed::NoOp));
        assert_eq!(set_set_property(&s, &s), (Transformed::NoOp, Transformed::NoOp));
    }

    #[test]
    fn removal_beats_property_sets() {
        let set = ObjectSetProperty {
            key: "k".into(),
            value: text("a", "x"),
        };
        let remove = ObjectRemoveProperty { key: "k".into() };
        assert_eq!(set_remove(&set, &remove), (Transformed::NoOp, Transformed::Unchanged));
        assert_eq!(remove_set(&remove, &set), (Transformed::Unchanged, Transformed::NoOp));
        assert_eq!(remove_remove(&remove, &remove), (Transformed::NoOp, Transformed::NoOp));
    }
}
