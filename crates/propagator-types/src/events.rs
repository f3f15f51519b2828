//! Propagation events
//!
//! Events are informational audit records. Reconciliation correctness never
//! depends on them being delivered.

use crate::ids::{ClusterRef, ObjectKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reason attached to every propagation event
pub const PROPAGATION_REASON: &str = "PolicyPropagation";

/// Envelope wrapping all propagation events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Event severity
    pub severity: EventSeverity,

    /// Short machine-readable reason
    pub reason: String,

    /// The actual event
    pub event: PropagationEvent,
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Routine progress
    Normal,
    /// Something an operator should look at
    Warning,
}

/// Propagation events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropagationEvent {
    /// Root was disabled and its replicas removed
    PolicyDisabled { root: ObjectKey },

    /// A replica was created on a cluster
    PolicyPropagated { root: ObjectKey, cluster: ClusterRef },

    /// A drifted replica was brought back in line with its root
    PolicyUpdated { root: ObjectKey, cluster: ClusterRef },

    /// Root cannot be replicated until its definition is fixed
    PolicyRejected { root: ObjectKey, reason: String },
}

impl PropagationEvent {
    /// Root policy the event is about
    pub fn root(&self) -> &ObjectKey {
        match self {
            PropagationEvent::PolicyDisabled { root }
            | PropagationEvent::PolicyPropagated { root, .. }
            | PropagationEvent::PolicyUpdated { root, .. }
            | PropagationEvent::PolicyRejected { root, .. } => root,
        }
    }

    /// Target cluster, if the event concerns one
    pub fn cluster(&self) -> Option<&ClusterRef> {
        match self {
            PropagationEvent::PolicyDisabled { .. }
            | PropagationEvent::PolicyRejected { .. } => None,
            PropagationEvent::PolicyPropagated { cluster, .. }
            | PropagationEvent::PolicyUpdated { cluster, .. } => Some(cluster),
        }
    }

    /// Human-readable description
    pub fn message(&self) -> String {
        match self {
            PropagationEvent::PolicyDisabled { root } => {
                format!("Policy {} was disabled", root)
            }
            PropagationEvent::PolicyPropagated { root, cluster } => {
                format!("Policy {} was propagated to cluster {}", root, cluster)
            }
            PropagationEvent::PolicyUpdated { root, cluster } => {
                format!("Policy {} was updated for cluster {}", root, cluster)
            }
            PropagationEvent::PolicyRejected { root, reason } => {
                format!("Policy {} cannot be propagated: {}", root, reason)
            }
        }
    }
}

impl PropagationEventEnvelope {
    /// Create a new event envelope
    pub fn new(event: PropagationEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            severity: EventSeverity::Normal,
            reason: PROPAGATION_REASON.to_string(),
            event,
        }
    }

    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn message(&self) -> String {
        self.event.message()
    }
}
