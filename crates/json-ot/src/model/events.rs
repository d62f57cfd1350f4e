use crate::id::NodeId;
use crate::path::Path;
use crate::value::ModelValue;

/// What happened to a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    ArrayInsert {
        index: usize,
        value: ModelValue,
    },
    ArrayRemove {
        index: usize,
        old_value: ModelValue,
    },
    ArrayReplace {
        index: usize,
        old_value: ModelValue,
        value: ModelValue,
    },
    ArrayReorder {
        from_index: usize,
        to_index: usize,
    },
    PropertySet {
        key: String,
        old_value: Option<ModelValue>,
        value: ModelValue,
    },
    PropertyRemove {
        key: String,
        old_value: ModelValue,
    },
    StringInsert {
        index: usize,
        value: String,
    },
    StringRemove {
        index: usize,
        value: String,
    },
    /// Whole-value set or number delta.
    ValueChanged {
        old_value: ModelValue,
        value: ModelValue,
    },
    /// The node left the tree; its id is no longer resolvable.
    Detached,
}

/// A change delivered to the changed node and then to each ancestor.
///
/// `path` is relative to the node whose listeners receive the event: empty on
/// the changed node itself, `[Key("a"), Index(2)]` on the grandparent of a node
/// reached through `a` then `2`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEvent {
    pub node_id: NodeId,
    pub path: Path,
    pub change: NodeChange,
    pub local: bool,
    pub session_id: String,
    pub user_id: Option<String>,
}
