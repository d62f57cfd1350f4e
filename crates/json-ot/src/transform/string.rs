//! String transforms.
//!
//! Offsets are char indices. A remove covers `[index, index + len)`; inserts
//! are classified against that span and overlapping removes against each
//! other by their Allen relation, each side keeping only the text the other
//! did not already delete. Offset sums saturate: an out-of-range operation
//! stays out of range and is rejected when the model applies it.

use super::{
    client_overwritten, server_overwritten, set_wins, Outcome, Transformed, TransformRegistry,
};
use crate::operation::{StringInsert, StringRemove, StringSet};
use crate::range::{
    index_range_relationship, range_range_relationship, IndexRangeRelationship,
    RangeRangeRelationship,
};
use crate::text;

pub(super) fn register(registry: &mut TransformRegistry) {
    register!(registry, StringInsert, StringInsert, insert_insert);
    register!(registry, StringInsert, StringRemove, insert_remove);
    register!(registry, StringInsert, StringSet, server_overwritten);

    register!(registry, StringRemove, StringInsert, remove_insert);
    register!(registry, StringRemove, StringRemove, remove_remove);
    register!(registry, StringRemove, StringSet, server_overwritten);

    register!(registry, StringSet, StringInsert, client_overwritten);
    register!(registry, StringSet, StringRemove, client_overwritten);
    register!(registry, StringSet, StringSet, set_set);
}

fn len(value: &str) -> usize {
    text::char_len(value)
}

fn insert_at(insert: &StringInsert, index: usize) -> Transformed<StringInsert> {
    Transformed::Updated(StringInsert {
        index,
        value: insert.value.clone(),
    })
}

fn remove(index: usize, value: String) -> Transformed<StringRemove> {
    Transformed::Updated(StringRemove { index, value })
}

pub fn insert_insert(s: &StringInsert, c: &StringInsert) -> Outcome<StringInsert, StringInsert> {
    if s.index <= c.index {
        (Transformed::Unchanged, insert_at(c, c.index.saturating_add(len(&s.value))))
    } else {
        (insert_at(s, s.index.saturating_add(len(&c.value))), Transformed::Unchanged)
    }
}

pub fn insert_remove(s: &StringInsert, c: &StringRemove) -> Outcome<StringInsert, StringRemove> {
    let c_len = len(&c.value);
    match index_range_relationship(s.index, c.index, c.index.saturating_add(c_len)) {
        IndexRangeRelationship::Before | IndexRangeRelationship::Start => (
            Transformed::Unchanged,
            remove(c.index.saturating_add(len(&s.value)), c.value.clone()),
        ),
        // The insert lands inside deleted text: the client removes it too.
        IndexRangeRelationship::Within => (
            Transformed::NoOp,
            remove(c.index, text::splice_in(&c.value, s.index - c.index, &s.value)),
        ),
        IndexRangeRelationship::End | IndexRangeRelationship::After => {
            (insert_at(s, s.index - c_len), Transformed::Unchanged)
        }
    }
}

pub fn remove_insert(s: &StringRemove, c: &StringInsert) -> Outcome<StringRemove, StringInsert> {
    let s_len = len(&s.value);
    match index_range_relationship(c.index, s.index, s.index.saturating_add(s_len)) {
        IndexRangeRelationship::Before | IndexRangeRelationship::Start => (
            remove(s.index.saturating_add(len(&c.value)), s.value.clone()),
            Transformed::Unchanged,
        ),
        IndexRangeRelationship::Within => (
            remove(s.index, text::splice_in(&s.value, c.index - s.index, &c.value)),
            Transformed::NoOp,
        ),
        IndexRangeRelationship::End | IndexRangeRelationship::After => {
            (Transformed::Unchanged, insert_at(c, c.index - s_len))
        }
    }
}

pub fn remove_remove(s: &StringRemove, c: &StringRemove) -> Outcome<StringRemove, StringRemove> {
    let (s_start, s_len) = (s.index, len(&s.value));
    let (c_start, c_len) = (c.index, len(&c.value));
    let (s_end, c_end) = (s_start.saturating_add(s_len), c_start.saturating_add(c_len));

    match range_range_relationship(s_start, s_end, c_start, c_end) {
        RangeRangeRelationship::Precedes | RangeRangeRelationship::Meets => {
            (Transformed::Unchanged, remove(c_start - s_len, c.value.clone()))
        }
        RangeRangeRelationship::PrecededBy | RangeRangeRelationship::MetBy => {
            (remove(s_start - c_len, s.value.clone()), Transformed::Unchanged)
        }
        RangeRangeRelationship::Overlaps => {
            let overlap = s_end - c_start;
            (
                remove(s_start, text::slice(&s.value, 0, c_start - s_start)),
                remove(s_start, text::slice_from(&c.value, overlap)),
            )
        }
        RangeRangeRelationship::OverlappedBy => {
            let overlap = c_end - s_start;
            (
                remove(c_start, text::slice_from(&s.value, overlap)),
                remove(c_start, text::slice(&c.value, 0, s_start - c_start)),
            )
        }
        RangeRangeRelationship::Starts => (
            Transformed::NoOp,
            remove(c_start, text::slice_from(&c.value, s_len)),
        ),
        RangeRangeRelationship::StartedBy => (
            remove(s_start, text::slice_from(&s.value, c_len)),
            Transformed::NoOp,
        ),
        RangeRangeRelationship::Contains => (
            remove(
                s_start,
                text::cut(&s.value, c_start - s_start, c_end - s_start),
            ),
            Transformed::NoOp,
        ),
        RangeRangeRelationship::ContainedBy => (
            Transformed::NoOp,
            remove(
                c_start,
                text::cut(&c.value, s_start - c_start, s_end - c_start),
            ),
        ),
        RangeRangeRelationship::Finishes => (
            Transformed::NoOp,
            remove(c_start, text::slice(&c.value, 0, s_start - c_start)),
        ),
        RangeRangeRelationship::FinishedBy => (
            remove(s_start, text::slice(&s.value, 0, c_start - s_start)),
            Transformed::NoOp,
        ),
        RangeRangeRelationship::EqualTo => (Transformed::NoOp, Transformed::NoOp),
    }
}

fn set_set(s: &StringSet, c: &StringSet) -> Outcome<StringSet, StringSet> {
    set_wins(s, c)
}
