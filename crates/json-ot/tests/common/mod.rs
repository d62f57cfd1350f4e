#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use json_ot::{
    ClientOperationEvent, DataValue, DiscreteOperation, DocumentOptions, Model, ModelError,
    ModelOperationEvent, Operation, OperationTransformer, RealTimeDocument, ServerOperationEvent,
    SessionIdGenerator, TransformError,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use serde_json::Value;

/// Seeded random source for reproducible sweeps.
pub struct Fuzzer {
    pub seed: u64,
    rng: Xoshiro256StarStar,
}

impl Fuzzer {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        }
    }

    /// Random integer in `[min, max]`.
    pub fn random_int(&mut self, min: i64, max: i64) -> i64 {
        self.rng.gen_range(min..=max)
    }

    /// Index of an existing element, `len` must be positive.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Insertion point in `[0, len]`.
    pub fn position(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..=len)
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability)
    }

    pub fn pick<'a, T>(&mut self, elements: &'a [T]) -> &'a T {
        let idx = self.rng.gen_range(0..elements.len());
        &elements[idx]
    }

    /// Lowercase word of 1 to `max_len` letters.
    pub fn word(&mut self, max_len: usize) -> String {
        let len = self.rng.gen_range(1..=max_len);
        (0..len)
            .map(|_| char::from(b'a' + self.rng.gen_range(0..26u8)))
            .collect()
    }
}

pub fn snapshot(json: &Value) -> DataValue {
    let mut ids = SessionIdGenerator::new("seed");
    DataValue::from_json(json, &mut ids)
}

pub fn model(snapshot: &DataValue, session_id: &str) -> Model {
    Model::from_data_value(
        snapshot,
        session_id,
        Box::new(SessionIdGenerator::new(session_id)),
    )
    .expect("snapshot must load")
}

pub fn remote(session_id: &str, version: u64, operation: impl Into<Operation>) -> ModelOperationEvent {
    ModelOperationEvent {
        session_id: session_id.to_string(),
        user_id: None,
        version,
        timestamp: Utc::now(),
        operation: operation.into(),
    }
}

pub fn child_id(model: &mut Model, key: &str) -> String {
    model.root().child_id(key).expect("child must exist")
}

/// Runs one server edit and one client edit against replicas of the same
/// snapshot, exchanges the transformed operations, and returns both final
/// states as JSON.
pub fn exchange<S, C>(snapshot: &DataValue, server_edit: S, client_edit: C) -> Result<(Value, Value), TransformError>
where
    S: FnOnce(&mut Model) -> Result<DiscreteOperation, ModelError>,
    C: FnOnce(&mut Model) -> Result<DiscreteOperation, ModelError>,
{
    let mut server = model(snapshot, "srv");
    let mut client = model(snapshot, "cli");
    let s = server_edit(&mut server).expect("server edit must apply");
    let c = client_edit(&mut client).expect("client edit must apply");

    let pair = OperationTransformer::new().transform(&s.into(), &c.into())?;
    server
        .apply_operation(&remote("cli", 1, pair.client))
        .expect("transformed client operation must apply");
    client
        .apply_operation(&remote("srv", 0, pair.server))
        .expect("transformed server operation must apply");
    Ok((server.to_json(), client.to_json()))
}

/// An operation the ordering server accepted, with the sequence number the
/// issuing client used for it.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub event: ServerOperationEvent,
    pub seq_no: u64,
}

/// In-memory ordering authority.
///
/// For every session it keeps the accepted operations of other sessions that
/// the session had not seen yet, rewritten to follow the session's own
/// accepted operations. An incoming operation is transformed past that
/// queue, so any number of operations may be in flight per client.
pub struct OrderingServer {
    transformer: OperationTransformer,
    history: Vec<Accepted>,
    bridges: HashMap<String, VecDeque<(u64, Operation)>>,
    model: Model,
}

impl OrderingServer {
    pub fn new(snapshot: &DataValue) -> Self {
        Self {
            transformer: OperationTransformer::new(),
            history: Vec::new(),
            bridges: HashMap::new(),
            model: model(snapshot, "server"),
        }
    }

    pub fn connect(&mut self, session_id: &str) {
        self.bridges.entry(session_id.to_string()).or_default();
    }

    pub fn version(&self) -> u64 {
        self.history.len() as u64
    }

    pub fn history(&self) -> &[Accepted] {
        &self.history
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn submit(&mut self, event: ClientOperationEvent) -> Result<u64, TransformError> {
        let version = self.version();
        let bridge = self
            .bridges
            .get_mut(&event.session_id)
            .expect("session must be connected");
        while bridge
            .front()
            .is_some_and(|(seen, _)| *seen < event.context_version)
        {
            bridge.pop_front();
        }

        let mut client = event.operation;
        let mut rewritten = VecDeque::with_capacity(bridge.len());
        for (seen, server) in bridge.iter() {
            let pair = self.transformer.transform(server, &client)?;
            rewritten.push_back((*seen, pair.server));
            client = pair.client;
        }
        *bridge = rewritten;

        for (session_id, queue) in self.bridges.iter_mut() {
            if *session_id != event.session_id {
                queue.push_back((version, client.clone()));
            }
        }

        let accepted = ServerOperationEvent {
            session_id: event.session_id,
            user_id: None,
            version,
            timestamp: event.timestamp,
            operation: client,
        };
        self.model
            .apply_operation(&accepted.clone().into())
            .expect("ordered operations must apply on the server");
        self.history.push(Accepted {
            event: accepted,
            seq_no: event.seq_no,
        });
        Ok(version)
    }
}

/// Clients connected to one ordering server through FIFO links.
pub struct Network {
    pub server: OrderingServer,
    clients: Vec<RealTimeDocument>,
    uplinks: Vec<VecDeque<ClientOperationEvent>>,
    delivered: Vec<usize>,
}

impl Network {
    pub fn new(snapshot: &DataValue, clients: usize) -> Self {
        let mut server = OrderingServer::new(snapshot);
        let clients: Vec<_> = (0..clients)
            .map(|n| {
                let session_id = format!("c{n}");
                server.connect(&session_id);
                let options = DocumentOptions::new("doc").with_session_id(session_id);
                RealTimeDocument::new(options, snapshot).expect("snapshot must load")
            })
            .collect();
        let count = clients.len();
        Self {
            server,
            clients,
            uplinks: vec![VecDeque::new(); count],
            delivered: vec![0; count],
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn client(&mut self, n: usize) -> &mut RealTimeDocument {
        &mut self.clients[n]
    }

    /// Moves client `n`'s outbox onto its uplink.
    pub fn send(&mut self, n: usize) {
        let events = self.clients[n].take_outgoing();
        self.uplinks[n].extend(events);
    }

    /// Lets the server accept the oldest event on client `n`'s uplink.
    pub fn upload(&mut self, n: usize) -> bool {
        match self.uplinks[n].pop_front() {
            Some(event) => {
                self.server.submit(event).expect("server transform must succeed");
                true
            }
            None => false,
        }
    }

    /// Delivers the next history entry to client `n`: an acknowledgement for
    /// its own operations, the operation itself otherwise.
    pub fn deliver(&mut self, n: usize) -> bool {
        let Some(accepted) = self.server.history().get(self.delivered[n]).cloned() else {
            return false;
        };
        self.delivered[n] += 1;
        let client = &mut self.clients[n];
        if accepted.event.session_id == client.options().session_id {
            client
                .receive_acknowledgement(accepted.event.version, accepted.seq_no)
                .expect("acknowledgement must match");
        } else {
            client
                .receive_operation(accepted.event)
                .expect("remote operation must apply");
        }
        true
    }

    /// Sends, uploads and delivers everything still pending.
    pub fn flush(&mut self) {
        loop {
            let mut progressed = false;
            for n in 0..self.len() {
                self.send(n);
                while self.upload(n) {
                    progressed = true;
                }
            }
            for n in 0..self.len() {
                while self.deliver(n) {
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
    }

    pub fn assert_converged(&self) {
        let expected = self.server.model().to_json();
        for client in &self.clients {
            assert_eq!(
                client.model().to_json(),
                expected,
                "session {} diverged",
                client.options().session_id
            );
            assert!(client.is_committed());
            assert_eq!(client.context_version(), self.server.version());
        }
    }
}
