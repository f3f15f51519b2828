//! Event emission
//!
//! Events go out on a broadcast channel. Sending never blocks and never
//! fails a reconcile: with no subscribers, or a lagging one, events are
//! simply dropped.

use propagator_types::{EventSeverity, PropagationEvent, PropagationEventEnvelope};
use tokio::sync::broadcast;
use tracing::trace;

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Cloneable handle publishing propagation events
#[derive(Debug, Clone)]
pub struct EventEmitter {
    event_tx: broadcast::Sender<PropagationEventEnvelope>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self { event_tx }
    }

    /// Receive events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<PropagationEventEnvelope> {
        self.event_tx.subscribe()
    }

    pub fn emit(&self, event: PropagationEvent) {
        self.emit_with_severity(event, EventSeverity::Normal);
    }

    pub fn emit_with_severity(&self, event: PropagationEvent, severity: EventSeverity) {
        let envelope = PropagationEventEnvelope::new(event).with_severity(severity);
        if self.event_tx.send(envelope).is_err() {
            trace!("no event subscribers");
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
