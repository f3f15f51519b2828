//! Mapping store changes to the roots they affect

use propagator_store::{ListFilter, ObjectStore, Result, WatchEvent, WatchObject};
use propagator_types::{ObjectKey, PlacementRule, Policy};
use std::collections::BTreeSet;

/// Root policies to reconcile after `event`
pub async fn roots_for_event(
    store: &dyn ObjectStore,
    event: &WatchEvent,
) -> Result<Vec<ObjectKey>> {
    let roots: BTreeSet<ObjectKey> = match &event.object {
        WatchObject::Policy(policy) => BTreeSet::from([root_of(policy)]),
        WatchObject::PlacementBinding(binding) => binding.policy_subjects().collect(),
        WatchObject::PlacementRule(rule) => roots_for_rule(store, rule).await?,
    };
    Ok(roots.into_iter().collect())
}

/// Every root policy currently in the store
pub async fn all_roots(store: &dyn ObjectStore) -> Result<Vec<ObjectKey>> {
    let policies = store.list_policies(&ListFilter::all()).await?;
    Ok(policies
        .iter()
        .filter(|policy| !policy.is_replica())
        .map(Policy::key)
        .collect())
}

fn root_of(policy: &Policy) -> ObjectKey {
    policy.root_key().cloned().unwrap_or_else(|| policy.key())
}

async fn roots_for_rule(
    store: &dyn ObjectStore,
    rule: &PlacementRule,
) -> Result<BTreeSet<ObjectKey>> {
    let rule_key = rule.key();
    let bindings = store
        .list_placement_bindings(&ListFilter::in_namespace(rule.metadata.namespace.clone()))
        .await?;
    Ok(bindings
        .iter()
        .filter(|binding| binding.rule_key() == rule_key)
        .flat_map(|binding| binding.policy_subjects())
        .collect())
}
