//! Number transforms. Deltas commute; a set overrides a concurrent delta.

use super::{
    client_overwritten, server_overwritten, set_wins, unchanged, Outcome, TransformRegistry,
};
use crate::operation::{NumberDelta, NumberSet};

pub(super) fn register(registry: &mut TransformRegistry) {
    register!(registry, NumberDelta, NumberDelta, delta_delta);
    register!(registry, NumberDelta, NumberSet, server_overwritten);
    register!(registry, NumberSet, NumberDelta, client_overwritten);
    register!(registry, NumberSet, NumberSet, set_set);
}

pub fn delta_delta(_: &NumberDelta, _: &NumberDelta) -> Outcome<NumberDelta, NumberDelta> {
    unchanged()
}

fn set_set(s: &NumberSet, c: &NumberSet) -> Outcome<NumberSet, NumberSet> {
    set_wins(s, c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transformed;

    #[test]
    fn a_set_swallows_a_concurrent_delta() {
        let delta = NumberDelta { delta: 2.0 };
        let set = NumberSet { value: 10.0 };
        assert_eq!(
            server_overwritten(&delta, &set),
            (Transformed::NoOp, Transformed::Unchanged)
        );
        assert_eq!(
            client_overwritten(&set, &delta),
            (Transformed::Unchanged, Transformed::NoOp)
        );
        assert_eq!(delta_delta(&delta, &delta), unchanged());
    }
}
