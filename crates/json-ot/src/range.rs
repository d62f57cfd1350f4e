//! Index and interval classification.
//!
//! Ranges are given by inclusive `start` and `end` positions. Array and
//! string transforms pick their case from these classifications.

/// Where a point lies relative to a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexRangeRelationship {
    Before,
    Start,
    Within,
    End,
    After,
}

/// The 13 Allen relations of range `a` to range `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeRangeRelationship {
    /// `a` ends strictly before `b` starts.
    Precedes,
    PrecededBy,
    /// `a` ends exactly where `b` starts.
    Meets,
    MetBy,
    Overlaps,
    OverlappedBy,
    /// Same start, `a` ends first.
    Starts,
    StartedBy,
    Contains,
    ContainedBy,
    /// Same end, `a` starts later.
    Finishes,
    FinishedBy,
    EqualTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    Forward,
    Backward,
    Identity,
}

pub fn index_range_relationship(index: usize, start: usize, end: usize) -> IndexRangeRelationship {
    if index < start {
        IndexRangeRelationship::Before
    } else if index == start {
        IndexRangeRelationship::Start
    } else if index < end {
        IndexRangeRelationship::Within
    } else if index == end {
        IndexRangeRelationship::End
    } else {
        IndexRangeRelationship::After
    }
}

pub fn range_range_relationship(
    a_start: usize,
    a_end: usize,
    b_start: usize,
    b_end: usize,
) -> RangeRangeRelationship {
    use RangeRangeRelationship::*;

    if a_start == b_start && a_end == b_end {
        EqualTo
    } else if a_end < b_start {
        Precedes
    } else if a_end == b_start {
        Meets
    } else if a_start > b_end {
        PrecededBy
    } else if a_start == b_end {
        MetBy
    } else if a_start == b_start {
        if a_end < b_end {
            Starts
        } else {
            StartedBy
        }
    } else if a_end == b_end {
        if a_start > b_start {
            Finishes
        } else {
            FinishedBy
        }
    } else if a_start > b_start && a_end < b_end {
        ContainedBy
    } else if a_start < b_start && a_end > b_end {
        Contains
    } else if a_start < b_start {
        Overlaps
    } else {
        OverlappedBy
    }
}

pub fn move_direction(from_index: usize, to_index: usize) -> MoveDirection {
    match from_index.cmp(&to_index) {
        std::cmp::Ordering::Less => MoveDirection::Forward,
        std::cmp::Ordering::Greater => MoveDirection::Backward,
        std::cmp::Ordering::Equal => MoveDirection::Identity,
    }
}
