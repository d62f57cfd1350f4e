//! Per-document client state machine.
//!
//! Local operations are transformed past server operations that arrived but
//! are not applied yet, then tracked as in flight until acknowledged. Remote
//! operations are transformed past every in-flight operation and the open
//! batch, then queued for the model to apply.
//!
//! The document is *committed* while nothing is in flight and no open batch
//! holds operations. Listeners hear each edge between the two states once.

use std::collections::VecDeque;

use chrono::Utc;
use log::debug;

use crate::error::ConcurrencyError;
use crate::events::{ListenerId, Listeners};
use crate::operation::{
    ClientOperationEvent, CompoundOperation, DiscreteOperation, Operation, ServerOperationEvent,
};
use crate::reference::ModelReference;
use crate::transform::{OperationTransformer, ReferenceTransformer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitStateChanged {
    pub committed: bool,
}

#[derive(Debug)]
pub struct ClientConcurrencyControl {
    session_id: String,
    context_version: u64,
    next_seq_no: u64,
    in_flight: VecDeque<ClientOperationEvent>,
    unapplied: VecDeque<ServerOperationEvent>,
    batch: Option<Vec<DiscreteOperation>>,
    transformer: OperationTransformer,
    reference_transformer: ReferenceTransformer,
    commit_listeners: Listeners<CommitStateChanged>,
}

impl ClientConcurrencyControl {
    pub fn new(session_id: impl Into<String>, context_version: u64) -> Self {
        Self::with_transformers(
            session_id,
            context_version,
            OperationTransformer::new(),
            ReferenceTransformer::new(),
        )
    }

    pub fn with_transformers(
        session_id: impl Into<String>,
        context_version: u64,
        transformer: OperationTransformer,
        reference_transformer: ReferenceTransformer,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            context_version,
            next_seq_no: 0,
            in_flight: VecDeque::new(),
            unapplied: VecDeque::new(),
            batch: None,
            transformer,
            reference_transformer,
            commit_listeners: Listeners::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The next server version this client expects.
    pub fn context_version(&self) -> u64 {
        self.context_version
    }

    pub fn is_committed(&self) -> bool {
        self.in_flight.is_empty() && self.batch.as_ref().map_or(true, Vec::is_empty)
    }

    pub fn is_batch_in_progress(&self) -> bool {
        self.batch.is_some()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn unapplied_count(&self) -> usize {
        self.unapplied.len()
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &ClientOperationEvent> {
        self.in_flight.iter()
    }

    pub fn on_commit_state_changed<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&CommitStateChanged) + Send + 'static,
    {
        self.commit_listeners.add(listener)
    }

    pub fn off_commit_state_changed(&mut self, listener_id: ListenerId) -> bool {
        self.commit_listeners.remove(listener_id)
    }

    /// Accepts a locally applied operation.
    ///
    /// Returns the event to send, or `None` while a batch is collecting.
    pub fn process_outgoing_operation(
        &mut self,
        operation: Operation,
    ) -> Result<Option<ClientOperationEvent>, ConcurrencyError> {
        if matches!(&operation, Operation::Compound(compound) if compound.is_empty()) {
            return Err(ConcurrencyError::EmptyCompound);
        }
        if self.batch.is_some() && matches!(operation, Operation::Compound(_)) {
            return Err(ConcurrencyError::CompoundInBatch);
        }
        let was_committed = self.is_committed();

        let mut client = operation;
        let mut rewritten = Vec::with_capacity(self.unapplied.len());
        for server in &self.unapplied {
            let pair = self.transformer.transform(&server.operation, &client)?;
            rewritten.push(pair.server);
            client = pair.client;
        }
        for (server, operation) in self.unapplied.iter_mut().zip(rewritten) {
            server.operation = operation;
        }

        if let Some(batch) = self.batch.as_mut() {
            batch.extend(client.discrete_ops().iter().cloned());
            self.notify_commit_state(was_committed);
            return Ok(None);
        }

        let event = self.enqueue(client);
        self.notify_commit_state(was_committed);
        Ok(Some(event))
    }

    /// Matches a server acknowledgement against the oldest in-flight operation.
    pub fn process_acknowledgement(&mut self, version: u64, seq_no: u64) -> Result<(), ConcurrencyError> {
        let Some(oldest) = self.in_flight.front() else {
            return Err(ConcurrencyError::NoInFlightOperation { seq_no });
        };
        if version != self.context_version {
            return Err(ConcurrencyError::VersionMismatch {
                expected: self.context_version,
                actual: version,
            });
        }
        if oldest.seq_no != seq_no {
            return Err(ConcurrencyError::SequenceMismatch {
                expected: oldest.seq_no,
                actual: seq_no,
            });
        }

        let was_committed = self.is_committed();
        self.in_flight.pop_front();
        self.context_version += 1;
        debug!(
            "session {} acknowledged seq {} at version {}",
            self.session_id, seq_no, version
        );
        self.notify_commit_state(was_committed);
        Ok(())
    }

    /// Accepts the next operation of the server history.
    pub fn process_remote_operation(&mut self, event: ServerOperationEvent) -> Result<(), ConcurrencyError> {
        if event.version != self.context_version {
            return Err(ConcurrencyError::VersionMismatch {
                expected: self.context_version,
                actual: event.version,
            });
        }

        let mut server = event.operation.clone();
        let mut rewritten = Vec::with_capacity(self.in_flight.len());
        for client in &self.in_flight {
            let pair = self.transformer.transform(&server, &client.operation)?;
            rewritten.push(pair.client);
            server = pair.server;
        }
        let batch = match &self.batch {
            Some(ops) if !ops.is_empty() => {
                let pending = Operation::Compound(CompoundOperation::new(ops.clone()));
                let pair = self.transformer.transform(&server, &pending)?;
                server = pair.server;
                Some(pair.client.discrete_ops().to_vec())
            }
            Some(_) => Some(Vec::new()),
            None => None,
        };

        for (client, operation) in self.in_flight.iter_mut().zip(rewritten) {
            client.operation = operation;
        }
        self.batch = batch;
        self.context_version += 1;
        debug!(
            "session {} received version {} from session {}",
            self.session_id, event.version, event.session_id
        );
        self.unapplied.push_back(ServerOperationEvent {
            operation: server,
            ..event
        });
        Ok(())
    }

    pub fn has_next_incoming_operation(&self) -> bool {
        !self.unapplied.is_empty()
    }

    /// Pops the oldest transformed server operation for the model to apply.
    pub fn next_incoming_operation(&mut self) -> Option<ServerOperationEvent> {
        self.unapplied.pop_front()
    }

    pub fn start_batch(&mut self) -> Result<(), ConcurrencyError> {
        if self.batch.is_some() {
            return Err(ConcurrencyError::BatchInProgress);
        }
        self.batch = Some(Vec::new());
        debug!("session {} started a batch", self.session_id);
        Ok(())
    }

    /// Drops an open batch. Only an empty batch can be cancelled.
    pub fn cancel_batch(&mut self) -> Result<(), ConcurrencyError> {
        match &self.batch {
            None => Err(ConcurrencyError::NoBatchInProgress),
            Some(ops) if !ops.is_empty() => Err(ConcurrencyError::BatchNotEmpty),
            Some(_) => {
                self.batch = None;
                debug!("session {} cancelled its batch", self.session_id);
                Ok(())
            }
        }
    }

    /// Sends the collected operations as one compound operation.
    pub fn complete_batch(&mut self) -> Result<ClientOperationEvent, ConcurrencyError> {
        match &self.batch {
            None => return Err(ConcurrencyError::NoBatchInProgress),
            Some(ops) if ops.is_empty() => return Err(ConcurrencyError::BatchEmpty),
            Some(_) => {}
        }
        let was_committed = self.is_committed();
        let ops = self.batch.take().unwrap_or_default();
        debug!(
            "session {} completed a batch of {} operations",
            self.session_id,
            ops.len()
        );
        let event = self.enqueue(CompoundOperation::new(ops).into());
        self.notify_commit_state(was_committed);
        Ok(event)
    }

    /// Rebases a reference received from another session onto local state
    /// by transforming it past the operations the sender has not seen.
    pub fn process_remote_reference_set(
        &self,
        reference: &ModelReference,
    ) -> Result<Option<ModelReference>, ConcurrencyError> {
        let mut current = reference.clone();
        let batch = self
            .batch
            .iter()
            .flatten()
            .cloned()
            .map(Operation::Discrete);
        let pending = self.in_flight.iter().map(|event| event.operation.clone());
        for operation in pending.chain(batch) {
            match self.reference_transformer.transform(&operation, &current)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Rebases a local reference onto the server history by transforming it
    /// past received operations that are not applied yet.
    pub fn process_outgoing_reference_set(
        &self,
        reference: &ModelReference,
    ) -> Result<Option<ModelReference>, ConcurrencyError> {
        let mut current = reference.clone();
        for server in &self.unapplied {
            match self.reference_transformer.transform(&server.operation, &current)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn enqueue(&mut self, operation: Operation) -> ClientOperationEvent {
        let event = ClientOperationEvent {
            session_id: self.session_id.clone(),
            seq_no: self.next_seq_no,
            context_version: self.context_version,
            timestamp: Utc::now(),
            operation,
        };
        self.next_seq_no += 1;
        self.in_flight.push_back(event.clone());
        event
    }

    fn notify_commit_state(&mut self, was_committed: bool) {
        let committed = self.is_committed();
        if committed != was_committed {
            self.commit_listeners.emit(&CommitStateChanged { committed });
        }
    }
}
