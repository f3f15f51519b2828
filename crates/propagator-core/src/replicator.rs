//! Single-target replication
//!
//! Converges the replica of one root on one placement decision: create it
//! when absent, overwrite spec and annotations when they drifted, and leave
//! it alone otherwise.

use crate::comparator::specs_equal;
use crate::error::Result;
use crate::events::EventEmitter;
use crate::replica::ReplicaBuilder;
use propagator_store::ObjectStore;
use propagator_types::{PlacementDecision, Policy, PropagationEvent};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// What replicating to one target did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Writes replicas for individual placement decisions
#[derive(Clone)]
pub struct DecisionReplicator {
    store: Arc<dyn ObjectStore>,
    events: EventEmitter,
}

impl DecisionReplicator {
    pub fn new(store: Arc<dyn ObjectStore>, events: EventEmitter) -> Self {
        Self { store, events }
    }

    /// Bring the replica of `root` for `decision` in line with the root
    #[instrument(
        skip(self, root, decision),
        fields(
            policy_namespace = %root.namespace(),
            policy_name = %root.name(),
            cluster = %decision.cluster_name,
        )
    )]
    pub async fn replicate(
        &self,
        root: &Policy,
        decision: &PlacementDecision,
    ) -> Result<ReplicaOutcome> {
        let builder = ReplicaBuilder::new(root, decision);
        let key = builder.key()?;

        let existing = match self.store.get_policy(&key).await {
            Ok(existing) => existing,
            Err(err) if err.is_not_found() => {
                debug!(replica = %key, "replica not found, creating");
                let replica = builder.build()?;
                if let Err(err) = self.store.create_policy(replica).await {
                    error!(replica = %key, error = %err, "failed to create replica");
                    return Err(err.into());
                }
                info!(replica = %key, "policy propagated");
                self.events.emit(PropagationEvent::PolicyPropagated {
                    root: root.key(),
                    cluster: decision.cluster(),
                });
                return Ok(ReplicaOutcome::Created);
            }
            Err(err) => {
                error!(replica = %key, error = %err, "failed to get replica");
                return Err(err.into());
            }
        };

        if specs_equal(root, &existing) {
            debug!(replica = %key, "replica up to date");
            return Ok(ReplicaOutcome::Unchanged);
        }

        let mut replica = existing;
        replica.metadata.annotations = root.metadata.annotations.clone();
        replica.spec = root.spec.clone();
        if let Err(err) = self.store.update_policy(replica).await {
            error!(replica = %key, error = %err, "failed to update replica");
            return Err(err.into());
        }

        info!(replica = %key, "replica updated");
        self.events.emit(PropagationEvent::PolicyUpdated {
            root: root.key(),
            cluster: decision.cluster(),
        });
        Ok(ReplicaOutcome::Updated)
    }
}
