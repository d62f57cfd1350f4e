use chrono::Utc;
use json_ot::operation::{NumberDelta, StringInsert};
use json_ot::{
    ClientConcurrencyControl, ConcurrencyError, DiscreteOperation, Operation, ServerOperationEvent,
};
use proptest::prelude::*;

fn remote(version: u64) -> ServerOperationEvent {
    ServerOperationEvent {
        session_id: "peer".into(),
        user_id: None,
        version,
        timestamp: Utc::now(),
        operation: DiscreteOperation::new("count", NumberDelta { delta: 1.0 }).into(),
    }
}

fn local(index: usize) -> Operation {
    DiscreteOperation::new(
        "text",
        StringInsert {
            index,
            value: "x".into(),
        },
    )
    .into()
}

#[derive(Debug, Clone)]
enum Step {
    Local,
    Remote { skew: i64 },
    Ack { skew: i64 },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Local),
        prop_oneof![3 => Just(0i64), 1 => -2i64..=2].prop_map(|skew| Step::Remote { skew }),
        prop_oneof![3 => Just(0i64), 1 => -2i64..=2].prop_map(|skew| Step::Ack { skew }),
    ]
}

fn shifted(base: u64, skew: i64) -> Option<u64> {
    base.checked_add_signed(skew)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Only the exact next version is accepted; anything else is rejected
    /// without touching the state.
    #[test]
    fn versions_are_gap_free(steps in prop::collection::vec(step(), 1..40), start in 0u64..5) {
        let mut control = ClientConcurrencyControl::new("me", start);
        let mut expected_version = start;
        let mut in_flight: Vec<u64> = Vec::new();
        let mut next_seq = 0u64;

        for step in steps {
            match step {
                Step::Local => {
                    let event = control
                        .process_outgoing_operation(local(0))
                        .expect("outgoing never fails outside a batch")
                        .expect("events are produced outside a batch");
                    prop_assert_eq!(event.seq_no, next_seq);
                    prop_assert_eq!(event.context_version, expected_version);
                    in_flight.push(next_seq);
                    next_seq += 1;
                }
                Step::Remote { skew } => {
                    let Some(version) = shifted(expected_version, skew) else { continue };
                    let result = control.process_remote_operation(remote(version));
                    if skew == 0 {
                        prop_assert!(result.is_ok());
                        expected_version += 1;
                    } else {
                        prop_assert_eq!(
                            result,
                            Err(ConcurrencyError::VersionMismatch { expected: expected_version, actual: version })
                        );
                    }
                }
                Step::Ack { skew } => {
                    let Some(version) = shifted(expected_version, skew) else { continue };
                    let seq_no = in_flight.first().copied().unwrap_or(0);
                    let result = control.process_acknowledgement(version, seq_no);
                    if in_flight.is_empty() {
                        prop_assert_eq!(result, Err(ConcurrencyError::NoInFlightOperation { seq_no }));
                    } else if skew != 0 {
                        prop_assert_eq!(
                            result,
                            Err(ConcurrencyError::VersionMismatch { expected: expected_version, actual: version })
                        );
                    } else {
                        prop_assert!(result.is_ok());
                        in_flight.remove(0);
                        expected_version += 1;
                    }
                }
            }
            prop_assert_eq!(control.context_version(), expected_version);
            prop_assert_eq!(control.in_flight_count(), in_flight.len());
            prop_assert_eq!(control.is_committed(), in_flight.is_empty());
        }
    }

    /// Acknowledgements must name the oldest in-flight operation.
    #[test]
    fn acknowledgements_are_fifo(count in 1usize..6, wrong in 1u64..4) {
        let mut control = ClientConcurrencyControl::new("me", 0);
        for index in 0..count {
            control.process_outgoing_operation(local(index)).expect("outgoing must succeed");
        }
        let err = control
            .process_acknowledgement(0, wrong)
            .expect_err("only seq 0 may be acknowledged first");
        prop_assert_eq!(err.clone(), ConcurrencyError::SequenceMismatch { expected: 0, actual: wrong });
        prop_assert!(err.is_protocol_violation());
        for seq_no in 0..count as u64 {
            prop_assert!(control.process_acknowledgement(seq_no, seq_no).is_ok());
        }
        prop_assert!(control.is_committed());
    }
}
