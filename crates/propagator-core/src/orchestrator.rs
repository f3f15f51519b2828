//! Root reconciliation
//!
//! `Propagator` is the entry point of the core. A pass over one root either
//! tears down every replica (disabled root) or resolves the root's placement
//! bindings and replicates it to every decided cluster.

use crate::error::Result;
use crate::events::EventEmitter;
use crate::replicator::{DecisionReplicator, ReplicaOutcome};
use crate::summary::ReconcileSummary;
use propagator_store::{ListFilter, ObjectStore};
use propagator_types::{
    EventSeverity, ObjectKey, OwnershipLabels, PlacementBinding, PlacementDecision,
    PlacementRule, PlacementStatus, Policy, PolicyStatus, PropagationEvent,
    PropagationEventEnvelope,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

/// Reconciles root policies into per-cluster replicas
#[derive(Clone)]
pub struct Propagator {
    store: Arc<dyn ObjectStore>,
    replicator: DecisionReplicator,
    events: EventEmitter,
}

impl Propagator {
    pub fn new(store: Arc<dyn ObjectStore>, events: EventEmitter) -> Self {
        let replicator = DecisionReplicator::new(store.clone(), events.clone());
        Self {
            store,
            replicator,
            events,
        }
    }

    pub fn builder() -> crate::builder::PropagatorBuilder {
        crate::builder::PropagatorBuilder::new()
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Subscribe to propagation events
    pub fn subscribe(&self) -> broadcast::Receiver<PropagationEventEnvelope> {
        self.events.subscribe()
    }

    /// Reconcile whatever currently lives at `key`
    ///
    /// Replicas are skipped. A root that no longer exists has its remaining
    /// replicas removed, since nothing else cleans them up.
    #[instrument(
        skip(self),
        fields(policy_namespace = %key.namespace, policy_name = %key.name)
    )]
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileSummary> {
        let policy = match self.store.get_policy(key).await {
            Ok(policy) => policy,
            Err(err) if err.is_not_found() => {
                debug!("root policy not found, removing orphaned replicas");
                let mut summary = ReconcileSummary::new(key.clone());
                self.delete_replicas(key, &mut summary).await?;
                return Ok(summary);
            }
            Err(err) => {
                error!(error = %err, "failed to get policy");
                return Err(err.into());
            }
        };

        if policy.is_replica() {
            debug!("policy is a replica, nothing to do");
            return Ok(ReconcileSummary::new(key.clone()));
        }

        self.reconcile_root(&policy).await
    }

    /// Run one pass for a root policy
    #[instrument(
        skip(self, root),
        fields(policy_namespace = %root.namespace(), policy_name = %root.name())
    )]
    pub async fn reconcile_root(&self, root: &Policy) -> Result<ReconcileSummary> {
        let summary = if root.is_disabled() {
            self.disable(root).await?
        } else {
            self.propagate(root).await?
        };

        info!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            deleted = summary.deleted,
            "reconcile complete"
        );
        Ok(summary)
    }

    /// Converge the replica of `root` on a single decision
    pub async fn replicate_to_target(
        &self,
        root: &Policy,
        decision: &PlacementDecision,
    ) -> Result<ReplicaOutcome> {
        self.replicator.replicate(root, decision).await
    }

    async fn disable(&self, root: &Policy) -> Result<ReconcileSummary> {
        info!("policy disabled, removing replicas");
        let mut summary = ReconcileSummary::new(root.key());
        summary.disabled = true;

        self.delete_replicas(&root.key(), &mut summary).await?;

        let mut cleared = root.clone();
        cleared.status = PolicyStatus::default();
        match self.store.update_policy_status(cleared).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                debug!("root deleted before its status could be cleared");
            }
            Err(err) => {
                error!(error = %err, "failed to clear root status");
                return Err(err.into());
            }
        }

        self.events
            .emit(PropagationEvent::PolicyDisabled { root: root.key() });
        Ok(summary)
    }

    async fn delete_replicas(&self, root: &ObjectKey, summary: &mut ReconcileSummary) -> Result<()> {
        let filter = ListFilter::all().with_labels(OwnershipLabels::selector_for_root(root));
        let replicas = self.store.list_policies(&filter).await.map_err(|err| {
            error!(error = %err, "failed to list replicas");
            err
        })?;

        for replica in replicas {
            let key = replica.key();
            match self.store.delete_policy(&key).await {
                Ok(()) => {
                    debug!(replica = %key, "replica deleted");
                    summary.deleted += 1;
                }
                Err(err) if err.is_not_found() => {
                    debug!(replica = %key, "replica already gone");
                }
                Err(err) => {
                    error!(replica = %key, error = %err, "failed to delete replica");
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    async fn propagate(&self, root: &Policy) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::new(root.key());

        let bindings = self
            .store
            .list_placement_bindings(&ListFilter::in_namespace(root.namespace()))
            .await
            .map_err(|err| {
                error!(error = %err, "failed to list placement bindings");
                err
            })?;

        for binding in bindings.iter().filter(|b| b.first_matching_subject(root).is_some()) {
            let Some(rule) = self.resolve_rule(binding, &mut summary).await? else {
                continue;
            };

            summary.placements.push(PlacementStatus {
                placement_binding: binding.metadata.name.clone(),
                placement_rule: rule.metadata.name.clone(),
            });

            for decision in rule.decisions() {
                let outcome = match self.replicator.replicate(root, decision).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        if !err.is_retryable() {
                            warn!(error = %err, "root cannot be propagated");
                            self.events.emit_with_severity(
                                PropagationEvent::PolicyRejected {
                                    root: root.key(),
                                    reason: err.to_string(),
                                },
                                EventSeverity::Warning,
                            );
                        }
                        return Err(err);
                    }
                };
                match outcome {
                    ReplicaOutcome::Created => summary.created += 1,
                    ReplicaOutcome::Updated => summary.updated += 1,
                    ReplicaOutcome::Unchanged => summary.unchanged += 1,
                }
            }
        }

        Ok(summary)
    }

    /// Placement rule behind `binding`, `None` when it does not exist
    async fn resolve_rule(
        &self,
        binding: &PlacementBinding,
        summary: &mut ReconcileSummary,
    ) -> Result<Option<PlacementRule>> {
        let rule_key = binding.rule_key();
        match self.store.get_placement_rule(&rule_key).await {
            Ok(rule) => Ok(Some(rule)),
            Err(err) if err.is_not_found() => {
                warn!(
                    binding = %binding.key(),
                    rule = %rule_key,
                    "placement rule not found, skipping binding"
                );
                summary.missing_rules.push(rule_key);
                Ok(None)
            }
            Err(err) => {
                error!(rule = %rule_key, error = %err, "failed to get placement rule");
                Err(err.into())
            }
        }
    }
}
