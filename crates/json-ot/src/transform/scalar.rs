//! Boolean and date transforms: only whole-value sets exist.

use super::{set_wins, Outcome, TransformRegistry};
use crate::operation::{BooleanSet, DateSet};

pub(super) fn register(registry: &mut TransformRegistry) {
    register!(registry, BooleanSet, BooleanSet, boolean_set);
    register!(registry, DateSet, DateSet, date_set);
}

pub fn boolean_set(s: &BooleanSet, c: &BooleanSet) -> Outcome<BooleanSet, BooleanSet> {
    set_wins(s, c)
}

pub fn date_set(s: &DateSet, c: &DateSet) -> Outcome<DateSet, DateSet> {
    set_wins(s, c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transformed;

    #[test]
    fn equal_sets_cancel_and_different_sets_favour_the_server() {
        let yes = BooleanSet { value: true };
        let no = BooleanSet { value: false };
        assert_eq!(boolean_set(&yes, &yes), (Transformed::NoOp, Transformed::NoOp));
        assert_eq!(boolean_set(&yes, &no), (Transformed::Unchanged, Transformed::NoOp));
    }
}
