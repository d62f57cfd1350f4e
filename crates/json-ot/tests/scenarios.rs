mod common;

use std::sync::{Arc, Mutex};

use chrono::Utc;
use common::{child_id, exchange, snapshot, Network};
use json_ot::operation::{ArrayInsert, ArrayRemove, StringSet};
use json_ot::{
    ClientConcurrencyControl, ClientOperationEvent, CompoundOperation, DataValue, DiscreteOperation,
    Model, Operation, OperationTransformer, ServerOperationEvent,
};
use serde_json::json;

fn letter(id: &str, value: &str) -> DataValue {
    DataValue::String {
        id: id.into(),
        value: value.into(),
    }
}

#[test]
fn concurrent_array_inserts() {
    let server = DiscreteOperation::new(
        "list",
        ArrayInsert {
            index: 1,
            value: letter("x", "X"),
        },
    );
    let client = DiscreteOperation::new(
        "list",
        ArrayInsert {
            index: 1,
            value: letter("y", "Y"),
        },
    );
    let pair = OperationTransformer::new()
        .transform(&server.clone().into(), &client.clone().into())
        .expect("inserts always transform");
    assert_eq!(pair.server, Operation::from(server));
    assert_eq!(
        pair.client,
        Operation::from(client.copy_with(ArrayInsert {
            index: 2,
            value: letter("y", "Y"),
        }))
    );

    let base = snapshot(&json!({ "list": ["A", "B", "C"] }));
    let insert = |value: &'static str| {
        move |m: &mut Model| {
            let id = child_id(m, "list");
            m.node(&id)?.as_array()?.insert(1, value)
        }
    };
    let (server_state, client_state) = exchange(&base, insert("X"), insert("Y")).expect("inserts always transform");
    assert_eq!(server_state, json!({ "list": ["A", "X", "Y", "B", "C"] }));
    assert_eq!(client_state, server_state);
}

#[test]
fn conflicting_string_sets_keep_the_server_value() {
    let server = DiscreteOperation::new("s", StringSet { value: "bar".into() });
    let client = DiscreteOperation::new("s", StringSet { value: "baz".into() });
    let pair = OperationTransformer::new()
        .transform(&server.clone().into(), &client.clone().into())
        .expect("sets always transform");
    assert_eq!(pair.server, Operation::from(server));
    assert_eq!(pair.client, Operation::from(client.as_no_op()));

    let base = snapshot(&json!({ "name": "foo" }));
    let set = |value: &'static str| {
        move |m: &mut Model| {
            let id = child_id(m, "name");
            m.node(&id)?.as_string()?.set(value)
        }
    };
    let (server_state, client_state) = exchange(&base, set("bar"), set("baz")).expect("sets always transform");
    assert_eq!(server_state, json!({ "name": "bar" }));
    assert_eq!(client_state, server_state);
}

#[test]
fn removing_the_same_index_removes_once() {
    let remove = DiscreteOperation::new("list", ArrayRemove { index: 1 });
    let pair = OperationTransformer::new()
        .transform(&remove.clone().into(), &remove.clone().into())
        .expect("removes always transform");
    assert!(pair.server.is_no_op());
    assert!(pair.client.is_no_op());

    let base = snapshot(&json!({ "list": ["A", "B", "C"] }));
    let remove = |m: &mut Model| {
        let id = child_id(m, "list");
        m.node(&id)?.as_array()?.remove(1)
    };
    let (server_state, client_state) = exchange(&base, remove, remove).expect("removes always transform");
    assert_eq!(server_state, json!({ "list": ["A", "C"] }));
    assert_eq!(client_state, server_state);
}

#[test]
fn commit_state_edges_fire_once_per_transition() {
    let mut control = ClientConcurrencyControl::new("me", 0);
    let edges = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&edges);
    control.on_commit_state_changed(move |event| sink.lock().unwrap().push(event.committed));

    let op = |index| -> Operation { DiscreteOperation::new("list", ArrayRemove { index }).into() };
    let mut sent: Vec<ClientOperationEvent> = Vec::new();
    for round in 0..3u64 {
        for index in 0..3 {
            sent.extend(control.process_outgoing_operation(op(index)).expect("outgoing must succeed"));
        }
        // A remote operation in between never changes the commit state.
        control
            .process_remote_operation(ServerOperationEvent {
                session_id: "peer".into(),
                user_id: None,
                version: control.context_version(),
                timestamp: Utc::now(),
                operation: DiscreteOperation::new("other", ArrayRemove { index: 0 }).into(),
            })
            .expect("remote must succeed");
        for event in sent.drain(..) {
            let version = control.context_version();
            control
                .process_acknowledgement(version, event.seq_no)
                .expect("ack must succeed");
        }
        assert_eq!(edges.lock().unwrap().len() as u64, 2 * (round + 1));
    }
    assert_eq!(edges.lock().unwrap().as_slice(), &[false, true, false, true, false, true]);
}

#[test]
fn empty_batches_never_change_the_commit_state() {
    let mut control = ClientConcurrencyControl::new("me", 0);
    let edges = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&edges);
    let listener = control.on_commit_state_changed(move |_| *sink.lock().unwrap() += 1);
    control.start_batch().expect("start must succeed");
    assert!(control.is_committed());
    control.cancel_batch().expect("cancel must succeed");
    assert_eq!(*edges.lock().unwrap(), 0);

    assert!(control.off_commit_state_changed(listener));
    control
        .process_outgoing_operation(DiscreteOperation::new("list", ArrayRemove { index: 0 }).into())
        .expect("outgoing must succeed");
    assert_eq!(*edges.lock().unwrap(), 0);
}

#[test]
fn operations_round_trip_through_serde() {
    let op: Operation = CompoundOperation::new(vec![
        DiscreteOperation::new(
            "list",
            ArrayInsert {
                index: 0,
                value: DataValue::Object {
                    id: "o".into(),
                    children: [("k".to_string(), letter("k1", "v"))].into_iter().collect(),
                },
            },
        ),
        DiscreteOperation::new("s", StringSet { value: "x".into() }).as_no_op(),
    ])
    .into();
    let event = ClientOperationEvent {
        session_id: "me".into(),
        seq_no: 4,
        context_version: 9,
        timestamp: Utc::now(),
        operation: op,
    };
    let encoded = serde_json::to_string(&event).expect("event must encode");
    let decoded: ClientOperationEvent = serde_json::from_str(&encoded).expect("event must decode");
    assert_eq!(decoded, event);

    let wire = serde_json::to_value(&event.operation).expect("operation must encode");
    assert_eq!(wire["kind"], "compound");
    assert_eq!(wire["operation"]["ops"][0]["type"], "arrayInsert");
    assert_eq!(wire["operation"]["ops"][0]["value"]["type"], "object");
    assert_eq!(wire["operation"]["ops"][1]["noOp"], true);
}

#[test]
fn two_clients_converge_through_the_server() {
    let base = snapshot(&json!({ "list": ["A", "B", "C"], "title": "doc" }));
    let mut net = Network::new(&base, 2);
    let list = child_id(net.client(0).model_mut(), "list");
    let title = child_id(net.client(0).model_mut(), "title");

    net.client(0)
        .edit(|m| m.node(&list)?.as_array()?.insert(1, "X"))
        .expect("edit must apply");
    net.client(0)
        .edit(|m| m.node(&title)?.as_string()?.insert(3, "!"))
        .expect("edit must apply");
    net.client(1)
        .edit(|m| m.node(&list)?.as_array()?.insert(1, "Y"))
        .expect("edit must apply");
    net.client(1)
        .edit(|m| m.node(&list)?.as_array()?.remove(2))
        .expect("edit must apply");

    net.send(0);
    net.send(1);
    assert!(net.upload(1));
    assert!(net.upload(0));
    assert!(net.deliver(0));
    assert!(!net.client(0).is_committed());
    net.flush();
    net.assert_converged();
    assert_eq!(
        net.server.model().to_json(),
        json!({ "list": ["A", "Y", "X", "C"], "title": "doc!" })
    );
}
