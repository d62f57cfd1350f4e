//! A [`Model`] and its [`ClientConcurrencyControl`] wired together.
//!
//! Local edits are applied to the model first and then handed to the control;
//! the resulting client events collect in an outbox for the transport. Remote
//! operations are transformed and applied immediately, so the model never
//! lags behind the control's context version.

use std::collections::VecDeque;

use log::warn;

use crate::concurrency::{ClientConcurrencyControl, CommitStateChanged};
use crate::error::{ConcurrencyError, DocumentError, ModelError};
use crate::events::ListenerId;
use crate::id::SessionIdGenerator;
use crate::model::Model;
use crate::operation::{ClientOperationEvent, DiscreteOperation, ServerOperationEvent};
use crate::options::DocumentOptions;
use crate::reference::ModelReference;
use crate::value::DataValue;

#[derive(Debug)]
pub struct RealTimeDocument {
    options: DocumentOptions,
    model: Model,
    concurrency: ClientConcurrencyControl,
    outgoing: VecDeque<ClientOperationEvent>,
    closed: Option<String>,
}

impl RealTimeDocument {
    /// Opens a document on `snapshot`, taken at `options.version`.
    pub fn new(options: DocumentOptions, snapshot: &DataValue) -> Result<Self, DocumentError> {
        let ids = Box::new(SessionIdGenerator::new(options.session_id.clone()));
        let mut model = Model::from_data_value(snapshot, options.session_id.clone(), ids)?;
        if let Some(user_id) = &options.user_id {
            model = model.with_user_id(user_id.clone());
        }
        let concurrency = ClientConcurrencyControl::new(options.session_id.clone(), options.version);
        Ok(Self {
            options,
            model,
            concurrency,
            outgoing: VecDeque::new(),
            closed: None,
        })
    }

    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Mutable access for reads that need a handle and for listener
    /// registration. Operations built here without [`edit`](Self::edit) are
    /// not sent.
    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    pub fn is_committed(&self) -> bool {
        self.concurrency.is_committed()
    }

    pub fn is_batch_in_progress(&self) -> bool {
        self.concurrency.is_batch_in_progress()
    }

    pub fn context_version(&self) -> u64 {
        self.concurrency.context_version()
    }

    pub fn on_commit_state_changed<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&CommitStateChanged) + Send + 'static,
    {
        self.concurrency.on_commit_state_changed(listener)
    }

    pub fn off_commit_state_changed(&mut self, listener_id: ListenerId) -> bool {
        self.concurrency.off_commit_state_changed(listener_id)
    }

    /// Runs one local mutation and submits the operation it returns.
    ///
    /// ```ignore
    /// doc.edit(|model| model.root().set("title", "draft"))?;
    /// ```
    pub fn edit<F>(&mut self, f: F) -> Result<DiscreteOperation, DocumentError>
    where
        F: FnOnce(&mut Model) -> Result<DiscreteOperation, ModelError>,
    {
        self.ensure_open()?;
        let op = f(&mut self.model)?;
        let event = self.guard(|control| control.process_outgoing_operation(op.clone().into()))?;
        self.outgoing.extend(event);
        Ok(op)
    }

    pub fn start_batch(&mut self) -> Result<(), DocumentError> {
        self.ensure_open()?;
        self.guard(ClientConcurrencyControl::start_batch)
    }

    pub fn cancel_batch(&mut self) -> Result<(), DocumentError> {
        self.ensure_open()?;
        self.guard(ClientConcurrencyControl::cancel_batch)
    }

    pub fn complete_batch(&mut self) -> Result<(), DocumentError> {
        self.ensure_open()?;
        let event = self.guard(ClientConcurrencyControl::complete_batch)?;
        self.outgoing.push_back(event);
        Ok(())
    }

    /// Drains the client events waiting to be sent, oldest first.
    pub fn take_outgoing(&mut self) -> Vec<ClientOperationEvent> {
        self.outgoing.drain(..).collect()
    }

    /// Transforms a server operation past local state and applies it.
    pub fn receive_operation(&mut self, event: ServerOperationEvent) -> Result<(), DocumentError> {
        self.ensure_open()?;
        self.guard(|control| control.process_remote_operation(event))?;
        while let Some(incoming) = self.concurrency.next_incoming_operation() {
            if let Err(err) = self.model.apply_operation(&incoming.into()) {
                self.close(err.to_string());
                return Err(err.into());
            }
        }
        Ok(())
    }

    pub fn receive_acknowledgement(&mut self, version: u64, seq_no: u64) -> Result<(), DocumentError> {
        self.ensure_open()?;
        self.guard(|control| control.process_acknowledgement(version, seq_no))
    }

    /// Rebases a reference set by another session onto the local model.
    pub fn transform_remote_reference(
        &mut self,
        reference: &ModelReference,
    ) -> Result<Option<ModelReference>, DocumentError> {
        self.ensure_open()?;
        Ok(self.concurrency.process_remote_reference_set(reference)?)
    }

    /// Rebases a local reference onto the server history before sending it.
    pub fn transform_outgoing_reference(
        &mut self,
        reference: &ModelReference,
    ) -> Result<Option<ModelReference>, DocumentError> {
        self.ensure_open()?;
        Ok(self.concurrency.process_outgoing_reference_set(reference)?)
    }

    fn ensure_open(&self) -> Result<(), DocumentError> {
        match &self.closed {
            Some(reason) => Err(DocumentError::Closed(reason.clone())),
            None => Ok(()),
        }
    }

    fn guard<T>(
        &mut self,
        f: impl FnOnce(&mut ClientConcurrencyControl) -> Result<T, ConcurrencyError>,
    ) -> Result<T, DocumentError> {
        f(&mut self.concurrency).map_err(|err| {
            if err.is_protocol_violation() {
                self.close(err.to_string());
            }
            err.into()
        })
    }

    fn close(&mut self, reason: String) {
        warn!(
            "closing document {} (session {}): {}",
            self.options.model_id, self.options.session_id, reason
        );
        self.closed = Some(reason);
    }
}
