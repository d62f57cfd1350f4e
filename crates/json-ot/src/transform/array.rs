//! Array transforms.
//!
//! Index ties favour the server: when both sides insert at the same position
//! the server's element ends up first. Moves are classified by direction and
//! by where the other index falls in the span the move crosses; two
//! overlapping moves are reconciled by treating each as a remove followed by
//! an insert.

use super::{
    client_overwritten, flipped, server_overwritten, set_wins, unchanged, Outcome, Transformed,
    TransformRegistry,
};
use crate::operation::{ArrayInsert, ArrayMove, ArrayRemove, ArrayReplace, ArraySet};
use crate::range::{
    index_range_relationship, move_direction, range_range_relationship, IndexRangeRelationship,
    MoveDirection, RangeRangeRelationship,
};
use crate::value::DataValue;

pub(super) fn register(registry: &mut TransformRegistry) {
    register!(registry, ArrayInsert, ArrayInsert, insert_insert);
    register!(registry, ArrayInsert, ArrayRemove, insert_remove);
    register!(registry, ArrayInsert, ArrayReplace, insert_replace);
    register!(registry, ArrayInsert, ArrayMove, insert_move);
    register!(registry, ArrayInsert, ArraySet, server_overwritten);

    register!(registry, ArrayRemove, ArrayInsert, remove_insert);
    register!(registry, ArrayRemove, ArrayRemove, remove_remove);
    register!(registry, ArrayRemove, ArrayReplace, remove_replace);
    register!(registry, ArrayRemove, ArrayMove, remove_move);
    register!(registry, ArrayRemove, ArraySet, server_overwritten);

    register!(registry, ArrayReplace, ArrayInsert, replace_insert);
    register!(registry, ArrayReplace, ArrayRemove, replace_remove);
    register!(registry, ArrayReplace, ArrayReplace, replace_replace);
    register!(registry, ArrayReplace, ArrayMove, replace_move);
    register!(registry, ArrayReplace, ArraySet, server_overwritten);

    register!(registry, ArrayMove, ArrayInsert, move_insert);
    register!(registry, ArrayMove, ArrayRemove, move_remove);
    register!(registry, ArrayMove, ArrayReplace, move_replace);
    register!(registry, ArrayMove, ArrayMove, move_move);
    register!(registry, ArrayMove, ArraySet, server_overwritten);

    register!(registry, ArraySet, ArrayInsert, client_overwritten);
    register!(registry, ArraySet, ArrayRemove, client_overwritten);
    register!(registry, ArraySet, ArrayReplace, client_overwritten);
    register!(registry, ArraySet, ArrayMove, client_overwritten);
    register!(registry, ArraySet, ArraySet, set_set);
}

fn insert_at(insert: &ArrayInsert, index: usize) -> Transformed<ArrayInsert> {
    Transformed::Updated(ArrayInsert {
        index,
        value: insert.value.clone(),
    })
}

fn replace_at(replace: &ArrayReplace, index: usize) -> Transformed<ArrayReplace> {
    Transformed::Updated(ArrayReplace {
        index,
        value: replace.value.clone(),
    })
}

fn remove_at(index: usize) -> Transformed<ArrayRemove> {
    Transformed::Updated(ArrayRemove { index })
}

fn move_to(from_index: usize, to_index: usize) -> Transformed<ArrayMove> {
    Transformed::Updated(ArrayMove {
        from_index,
        to_index,
    })
}

pub fn insert_insert(s: &ArrayInsert, c: &ArrayInsert) -> Outcome<ArrayInsert, ArrayInsert> {
    if s.index <= c.index {
        (Transformed::Unchanged, insert_at(c, c.index + 1))
    } else {
        (insert_at(s, s.index + 1), Transformed::Unchanged)
    }
}

pub fn insert_remove(s: &ArrayInsert, c: &ArrayRemove) -> Outcome<ArrayInsert, ArrayRemove> {
    if s.index <= c.index {
        (Transformed::Unchanged, remove_at(c.index + 1))
    } else {
        (insert_at(s, s.index - 1), Transformed::Unchanged)
    }
}

pub fn insert_replace(s: &ArrayInsert, c: &ArrayReplace) -> Outcome<ArrayInsert, ArrayReplace> {
    if s.index <= c.index {
        (Transformed::Unchanged, replace_at(c, c.index + 1))
    } else {
        unchanged()
    }
}

pub fn insert_move(s: &ArrayInsert, c: &ArrayMove) -> Outcome<ArrayInsert, ArrayMove> {
    let (from, to) = (c.from_index, c.to_index);
    match move_direction(from, to) {
        MoveDirection::Forward => match index_range_relationship(s.index, from, to) {
            IndexRangeRelationship::Before | IndexRangeRelationship::Start => {
                (Transformed::Unchanged, move_to(from + 1, to + 1))
            }
            IndexRangeRelationship::Within | IndexRangeRelationship::End => {
                (insert_at(s, s.index - 1), move_to(from, to + 1))
            }
            IndexRangeRelationship::After => unchanged(),
        },
        MoveDirection::Backward => match index_range_relationship(s.index, to, from) {
            IndexRangeRelationship::Before | IndexRangeRelationship::Start => {
                (Transformed::Unchanged, move_to(from + 1, to + 1))
            }
            IndexRangeRelationship::Within | IndexRangeRelationship::End => {
                (insert_at(s, s.index + 1), move_to(from + 1, to))
            }
            IndexRangeRelationship::After => unchanged(),
        },
        MoveDirection::Identity => {
            if s.index <= from {
                (Transformed::Unchanged, move_to(from + 1, to + 1))
            } else {
                unchanged()
            }
        }
    }
}

pub fn remove_insert(s: &ArrayRemove, c: &ArrayInsert) -> Outcome<ArrayRemove, ArrayInsert> {
    if s.index < c.index {
        (Transformed::Unchanged, insert_at(c, c.index - 1))
    } else {
        (remove_at(s.index + 1), Transformed::Unchanged)
    }
}

pub fn remove_remove(s: &ArrayRemove, c: &ArrayRemove) -> Outcome<ArrayRemove, ArrayRemove> {
    if s.index == c.index {
        (Transformed::NoOp, Transformed::NoOp)
    } else if s.index < c.index {
        (Transformed::Unchanged, remove_at(c.index - 1))
    } else {
        (remove_at(s.index - 1), Transformed::Unchanged)
    }
}

pub fn remove_replace(s: &ArrayRemove, c: &ArrayReplace) -> Outcome<ArrayRemove, ArrayReplace> {
    if s.index == c.index {
        (Transformed::Unchanged, Transformed::NoOp)
    } else if s.index < c.index {
        (Transformed::Unchanged, replace_at(c, c.index - 1))
    } else {
        unchanged()
    }
}

pub fn remove_move(s: &ArrayRemove, c: &ArrayMove) -> Outcome<ArrayRemove, ArrayMove> {
    let (from, to) = (c.from_index, c.to_index);
    if s.index == from {
        // The moved element is gone; remove it where the client put it.
        return (remove_at(to), Transformed::NoOp);
    }
    match move_direction(from, to) {
        MoveDirection::Forward => match index_range_relationship(s.index, from, to) {
            IndexRangeRelationship::Before => (Transformed::Unchanged, move_to(from - 1, to - 1)),
            IndexRangeRelationship::Within | IndexRangeRelationship::End => {
                (remove_at(s.index - 1), move_to(from, to - 1))
            }
            IndexRangeRelationship::Start | IndexRangeRelationship::After => unchanged(),
        },
        MoveDirection::Backward => match index_range_relationship(s.index, to, from) {
            IndexRangeRelationship::Before => (Transformed::Unchanged, move_to(from - 1, to - 1)),
            IndexRangeRelationship::Start | IndexRangeRelationship::Within => {
                (remove_at(s.index + 1), move_to(from - 1, to))
            }
            IndexRangeRelationship::End | IndexRangeRelationship::After => unchanged(),
        },
        MoveDirection::Identity => {
            if s.index < from {
                (Transformed::Unchanged, move_to(from - 1, to - 1))
            } else {
                unchanged()
            }
        }
    }
}

pub fn replace_insert(s: &ArrayReplace, c: &ArrayInsert) -> Outcome<ArrayReplace, ArrayInsert> {
    if c.index <= s.index {
        (replace_at(s, s.index + 1), Transformed::Unchanged)
    } else {
        unchanged()
    }
}

pub fn replace_remove(s: &ArrayReplace, c: &ArrayRemove) -> Outcome<ArrayReplace, ArrayRemove> {
    if s.index == c.index {
        (Transformed::NoOp, Transformed::Unchanged)
    } else if s.index > c.index {
        (replace_at(s, s.index - 1), Transformed::Unchanged)
    } else {
        unchanged()
    }
}

pub fn replace_replace(s: &ArrayReplace, c: &ArrayReplace) -> Outcome<ArrayReplace, ArrayReplace> {
    if s.index != c.index {
        return unchanged();
    }
    if s.value == c.value {
        (Transformed::NoOp, Transformed::NoOp)
    } else {
        (Transformed::Unchanged, Transformed::NoOp)
    }
}

pub fn replace_move(s: &ArrayReplace, c: &ArrayMove) -> Outcome<ArrayReplace, ArrayMove> {
    let (from, to) = (c.from_index, c.to_index);
    let index = s.index;
    let moved = if index == from {
        to
    } else if from < index && index <= to {
        index - 1
    } else if to <= index && index < from {
        index + 1
    } else {
        index
    };
    if moved == index {
        unchanged()
    } else {
        (replace_at(s, moved), Transformed::Unchanged)
    }
}

pub fn move_insert(s: &ArrayMove, c: &ArrayInsert) -> Outcome<ArrayMove, ArrayInsert> {
    flipped(insert_move(c, s))
}

pub fn move_remove(s: &ArrayMove, c: &ArrayRemove) -> Outcome<ArrayMove, ArrayRemove> {
    flipped(remove_move(c, s))
}

pub fn move_replace(s: &ArrayMove, c: &ArrayReplace) -> Outcome<ArrayMove, ArrayReplace> {
    flipped(replace_move(c, s))
}

pub fn move_move(s: &ArrayMove, c: &ArrayMove) -> Outcome<ArrayMove, ArrayMove> {
    if s.from_index == c.from_index {
        if s.to_index == c.to_index {
            return (Transformed::NoOp, Transformed::NoOp);
        }
        // Both moved the same element; the server's destination wins.
        return (move_to(c.to_index, s.to_index), Transformed::NoOp);
    }

    let span = |m: &ArrayMove| (m.from_index.min(m.to_index), m.from_index.max(m.to_index));
    let (s_start, s_end) = span(s);
    let (c_start, c_end) = span(c);
    if matches!(
        range_range_relationship(s_start, s_end, c_start, c_end),
        RangeRangeRelationship::Precedes | RangeRangeRelationship::PrecededBy
    ) {
        return unchanged();
    }

    // Run both moves as remove-then-insert sequences through the index rules.
    let placeholder = |index| ArrayInsert {
        index,
        value: DataValue::Null { id: String::new() },
    };
    let s_remove = ArrayRemove { index: s.from_index };
    let s_insert = placeholder(s.to_index);
    let c_remove = ArrayRemove { index: c.from_index };
    let c_insert = placeholder(c.to_index);

    let (s_remove, c_remove) = apply_pair(remove_remove(&s_remove, &c_remove), s_remove, c_remove);
    let (s_remove, c_insert) = apply_pair(remove_insert(&s_remove, &c_insert), s_remove, c_insert);
    let (s_insert, c_remove) = apply_pair(insert_remove(&s_insert, &c_remove), s_insert, c_remove);
    let (s_insert, c_insert) = apply_pair(insert_insert(&s_insert, &c_insert), s_insert, c_insert);

    let server = ArrayMove {
        from_index: s_remove.index,
        to_index: s_insert.index,
    };
    let client = ArrayMove {
        from_index: c_remove.index,
        to_index: c_insert.index,
    };
    (
        if server == *s { Transformed::Unchanged } else { Transformed::Updated(server) },
        if client == *c { Transformed::Unchanged } else { Transformed::Updated(client) },
    )
}

/// Applies an outcome to the operands of an intermediate step. Removes of
/// distinct elements never cancel, so `NoOp` cannot occur here.
fn apply_pair<S, C>((s_out, c_out): Outcome<S, C>, s: S, c: C) -> (S, C) {
    (settle(s_out, s), settle(c_out, c))
}

fn settle<T>(outcome: Transformed<T>, original: T) -> T {
    match outcome {
        Transformed::Updated(next) => next,
        Transformed::Unchanged | Transformed::NoOp => original,
    }
}

fn set_set(s: &ArraySet, c: &ArraySet) -> Outcome<ArraySet, ArraySet> {
    set_wins(s, c)
}
