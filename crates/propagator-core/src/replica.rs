//! Replica construction
//!
//! Replicas are built field by field from the root rather than cloned from
//! it, so root-only state (status, resource version, uid) never leaks onto a
//! cluster namespace.

use crate::error::Result;
use propagator_types::{
    full_name_for_policy, ObjectKey, ObjectMeta, OwnershipLabels, PlacementDecision, Policy,
    PolicyStatus,
};

/// Builds the replica of one root for one placement decision
pub struct ReplicaBuilder<'a> {
    root: &'a Policy,
    decision: &'a PlacementDecision,
}

impl<'a> ReplicaBuilder<'a> {
    pub fn new(root: &'a Policy, decision: &'a PlacementDecision) -> Self {
        Self { root, decision }
    }

    /// Where the replica lives: the cluster namespace, under the root's full name
    pub fn key(&self) -> Result<ObjectKey> {
        let name = full_name_for_policy(&self.root.key())?;
        Ok(ObjectKey::new(self.decision.cluster_namespace.clone(), name))
    }

    /// Ownership labels tying the replica back to its root and cluster
    pub fn ownership(&self) -> Result<OwnershipLabels> {
        Ok(OwnershipLabels::new(
            self.decision.cluster_name.clone(),
            self.decision.cluster_namespace.clone(),
            self.root.key(),
        )?)
    }

    /// Assemble an unsaved replica
    pub fn build(&self) -> Result<Policy> {
        let key = self.key()?;

        let mut labels = self.root.metadata.labels.clone();
        labels.set_ownership(self.ownership()?);

        let metadata = ObjectMeta {
            labels,
            annotations: self.root.metadata.annotations.clone(),
            ..ObjectMeta::new(key.namespace, key.name)
        };

        Ok(Policy {
            metadata,
            spec: self.root.spec.clone(),
            status: PolicyStatus::default(),
        })
    }
}
