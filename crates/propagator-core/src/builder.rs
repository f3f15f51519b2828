//! Builder for Propagator

use crate::error::{PropagationError, Result};
use crate::events::{EventEmitter, DEFAULT_EVENT_CAPACITY};
use crate::orchestrator::Propagator;
use propagator_store::ObjectStore;
use std::sync::Arc;

/// Builder wiring a Propagator to its store and event channel
pub struct PropagatorBuilder {
    store: Option<Arc<dyn ObjectStore>>,
    events: Option<EventEmitter>,
    event_capacity: usize,
}

impl PropagatorBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            events: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Set the object store
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Capacity of the event channel created when no emitter is supplied
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Share an existing event emitter
    pub fn with_event_emitter(mut self, events: EventEmitter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> Result<Propagator> {
        let store = self
            .store
            .ok_or_else(|| PropagationError::InvalidConfiguration("store required".into()))?;
        if self.events.is_none() && self.event_capacity == 0 {
            return Err(PropagationError::InvalidConfiguration(
                "event capacity must be positive".into(),
            ));
        }
        let events = self
            .events
            .unwrap_or_else(|| EventEmitter::new(self.event_capacity));

        Ok(Propagator::new(store, events))
    }
}

impl Default for PropagatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
