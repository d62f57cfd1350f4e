//! Listener registries.
//!
//! Every emitter in the crate (model nodes, the document, the concurrency
//! control) keeps its subscribers in a [`Listeners`] set keyed by a
//! monotonically increasing id, so unsubscribing never disturbs the delivery
//! order of the remaining listeners.

use std::collections::BTreeMap;
use std::fmt;

pub type ListenerId = u64;

pub struct Listeners<E> {
    next_id: ListenerId,
    entries: BTreeMap<ListenerId, Box<dyn FnMut(&E) + Send>>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }

    pub fn add<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&E) + Send + 'static,
    {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.entries.insert(id, Box::new(listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Delivers `event` synchronously to every listener, in subscription order.
    pub fn emit(&mut self, event: &E) {
        for listener in self.entries.values_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}
