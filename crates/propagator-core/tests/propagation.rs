//! End-to-end reconciliation passes against the in-memory store

use propagator_core::{specs_equal, Propagator, ReplicaOutcome};
use propagator_store::{
    InMemoryObjectStore, ListFilter, PlacementBindingStore, PlacementRuleStore, PolicyStore,
    ResourceKind, StoreError, StoreOperation,
};
use propagator_types::{
    ComplianceState, EventSeverity, ObjectKey, OwnershipLabels, PlacementBinding,
    PlacementDecision, PlacementRule, Policy, PolicySpec, PolicyStatus, PropagationEvent,
    RemediationAction, Subject,
};
use std::collections::BTreeMap;
use std::sync::Arc;

fn setup() -> (Arc<InMemoryObjectStore>, Propagator) {
    let store = Arc::new(InMemoryObjectStore::new());
    let propagator = Propagator::builder()
        .with_store(store.clone())
        .build()
        .unwrap();
    (store, propagator)
}

fn root_spec() -> PolicySpec {
    PolicySpec {
        remediation_action: Some(RemediationAction::Inform),
        policy_templates: vec![serde_json::json!({
            "kind": "ConfigurationPolicy",
            "spec": {"severity": "low"}
        })],
        ..Default::default()
    }
}

async fn seed_root(store: &InMemoryObjectStore, namespace: &str, name: &str) -> Policy {
    let root = Policy::new(namespace, name, root_spec()).with_annotation("category", "CM");
    store.create_policy(root).await.unwrap()
}

async fn seed_placement(
    store: &InMemoryObjectStore,
    binding: &str,
    rule: &str,
    subjects: Vec<Subject>,
    decisions: Vec<PlacementDecision>,
) {
    store
        .apply_placement_binding(PlacementBinding::new("ns1", binding, rule, subjects))
        .await
        .unwrap();
    store
        .apply_placement_rule(PlacementRule::new("ns1", rule, decisions))
        .await
        .unwrap();
}

async fn replicas_of(store: &InMemoryObjectStore, root: &ObjectKey) -> Vec<Policy> {
    let filter = ListFilter::all().with_labels(OwnershipLabels::selector_for_root(root));
    store.list_policies(&filter).await.unwrap()
}

async fn disable(store: &InMemoryObjectStore, key: &ObjectKey) {
    let mut root = store.get_policy(key).await.unwrap();
    root.spec.disabled = true;
    store.update_policy(root).await.unwrap();
}

#[tokio::test]
async fn test_propagates_to_decided_cluster() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a")],
        vec![PlacementDecision::new("c1", "c1")],
    )
    .await;

    let summary = propagator.reconcile(&root.key()).await.unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.placements.len(), 1);

    let replica = store
        .get_policy(&ObjectKey::new("c1", "pol-a-ns1"))
        .await
        .unwrap();
    let expected = BTreeMap::from([
        ("cluster-name".to_string(), "c1".to_string()),
        ("cluster-namespace".to_string(), "c1".to_string()),
        ("root".to_string(), "ns1/pol-a".to_string()),
    ]);
    assert_eq!(replica.metadata.labels.to_map(), expected);
    assert!(specs_equal(&root, &replica));
}

#[tokio::test]
async fn test_disabling_removes_replicas_and_clears_status() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a")],
        vec![
            PlacementDecision::new("c1", "c1"),
            PlacementDecision::new("c2", "c2"),
        ],
    )
    .await;
    propagator.reconcile(&root.key()).await.unwrap();
    assert_eq!(replicas_of(&store, &root.key()).await.len(), 2);

    let mut with_status = store.get_policy(&root.key()).await.unwrap();
    with_status.status.compliant = Some(ComplianceState::Compliant);
    store.update_policy_status(with_status).await.unwrap();
    disable(&store, &root.key()).await;

    let mut events = propagator.subscribe();
    let summary = propagator.reconcile(&root.key()).await.unwrap();
    assert!(summary.disabled);
    assert_eq!(summary.deleted, 2);

    assert!(replicas_of(&store, &root.key()).await.is_empty());
    let stored = store.get_policy(&root.key()).await.unwrap();
    assert_eq!(stored.status, PolicyStatus::default());
    assert_eq!(
        events.recv().await.unwrap().message(),
        "Policy ns1/pol-a was disabled"
    );
}

#[tokio::test]
async fn test_disabled_root_is_never_replicated() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    disable(&store, &root.key()).await;
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a")],
        vec![PlacementDecision::new("c1", "c1")],
    )
    .await;

    propagator.reconcile(&root.key()).await.unwrap();
    assert_eq!(store.policy_count(), 1);
    assert_eq!(
        store.operation_count(ResourceKind::Policy, StoreOperation::Create),
        1
    );
}

#[tokio::test]
async fn test_one_replica_per_distinct_target() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    // Two bindings whose rules overlap on c2
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a")],
        vec![
            PlacementDecision::new("c1", "c1"),
            PlacementDecision::new("c2", "c2"),
        ],
    )
    .await;
    seed_placement(
        &store,
        "pb-2",
        "rule-2",
        vec![Subject::policy("pol-a")],
        vec![
            PlacementDecision::new("c2", "c2"),
            PlacementDecision::new("c3", "c3"),
        ],
    )
    .await;

    let summary = propagator.reconcile(&root.key()).await.unwrap();
    assert_eq!(summary.created, 3);
    assert_eq!(summary.unchanged, 1);

    let replicas = replicas_of(&store, &root.key()).await;
    let namespaces: Vec<_> = replicas.iter().map(|r| r.namespace().to_string()).collect();
    assert_eq!(namespaces, vec!["c1", "c2", "c3"]);
    assert!(replicas.iter().all(|replica| specs_equal(&root, replica)));
    assert!(replicas.iter().all(|replica| replica.name() == "pol-a-ns1"));
}

#[tokio::test]
async fn test_second_replication_issues_no_update() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    let decision = PlacementDecision::new("c1", "c1");

    let first = propagator.replicate_to_target(&root, &decision).await.unwrap();
    let second = propagator.replicate_to_target(&root, &decision).await.unwrap();

    assert_eq!(first, ReplicaOutcome::Created);
    assert_eq!(second, ReplicaOutcome::Unchanged);
    assert_eq!(
        store.operation_count(ResourceKind::Policy, StoreOperation::Update),
        0
    );
}

#[tokio::test]
async fn test_drift_is_restored_once() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a")],
        vec![PlacementDecision::new("c1", "c1")],
    )
    .await;
    propagator.reconcile(&root.key()).await.unwrap();

    let replica_key = ObjectKey::new("c1", "pol-a-ns1");
    let mut drifted = store.get_policy(&replica_key).await.unwrap();
    drifted.spec.remediation_action = Some(RemediationAction::Enforce);
    drifted
        .metadata
        .annotations
        .insert("category".into(), "edited".into());
    store.update_policy(drifted).await.unwrap();
    store.reset_operation_counts();

    let first = propagator.reconcile(&root.key()).await.unwrap();
    let second = propagator.reconcile(&root.key()).await.unwrap();

    assert_eq!(first.updated, 1);
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 1);
    assert_eq!(
        store.operation_count(ResourceKind::Policy, StoreOperation::Update),
        1
    );
    let restored = store.get_policy(&replica_key).await.unwrap();
    assert!(specs_equal(&root, &restored));
}

#[tokio::test]
async fn test_only_first_matching_subject_is_honored() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a"), Subject::policy("pol-a")],
        vec![PlacementDecision::new("c1", "c1")],
    )
    .await;
    store.reset_operation_counts();

    let summary = propagator.reconcile(&root.key()).await.unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.unchanged, 0);
    assert_eq!(
        store.operation_count(ResourceKind::PlacementRule, StoreOperation::Get),
        1
    );
}

#[tokio::test]
async fn test_non_matching_bindings_are_ignored() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-b")],
        vec![PlacementDecision::new("c1", "c1")],
    )
    .await;
    store.reset_operation_counts();

    let summary = propagator.reconcile(&root.key()).await.unwrap();
    assert_eq!(summary.targets(), 0);
    assert_eq!(
        store.operation_count(ResourceKind::PlacementRule, StoreOperation::Get),
        0
    );
}

#[tokio::test]
async fn test_missing_rule_skips_binding() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    store
        .apply_placement_binding(PlacementBinding::new(
            "ns1",
            "pb-0",
            "gone",
            vec![Subject::policy("pol-a")],
        ))
        .await
        .unwrap();
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a")],
        vec![PlacementDecision::new("c1", "c1")],
    )
    .await;

    let summary = propagator.reconcile(&root.key()).await.unwrap();
    assert_eq!(summary.missing_rules, vec![ObjectKey::new("ns1", "gone")]);
    assert_eq!(summary.created, 1);
}

#[tokio::test]
async fn test_rule_lookup_failure_aborts_pass() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a")],
        vec![PlacementDecision::new("c1", "c1")],
    )
    .await;
    store.inject_failure(
        ResourceKind::PlacementRule,
        StoreOperation::Get,
        StoreError::Unavailable("etcd leader lost".into()),
    );

    let err = propagator.reconcile(&root.key()).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(store.policy_count(), 1);
}

#[tokio::test]
async fn test_create_conflict_propagates_and_retry_converges() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a")],
        vec![
            PlacementDecision::new("c1", "c1"),
            PlacementDecision::new("c2", "c2"),
        ],
    )
    .await;
    store.inject_failure(
        ResourceKind::Policy,
        StoreOperation::Create,
        StoreError::AlreadyExists {
            kind: ResourceKind::Policy,
            key: ObjectKey::new("c1", "pol-a-ns1"),
        },
    );

    let err = propagator.reconcile(&root.key()).await.unwrap_err();
    assert!(err.is_conflict());
    // First error wins: the second decision was never attempted
    assert!(replicas_of(&store, &root.key()).await.is_empty());

    let summary = propagator.reconcile(&root.key()).await.unwrap();
    assert_eq!(summary.created, 2);
}

#[tokio::test]
async fn test_delete_race_is_swallowed() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a")],
        vec![PlacementDecision::new("c1", "c1")],
    )
    .await;
    propagator.reconcile(&root.key()).await.unwrap();
    disable(&store, &root.key()).await;

    store.inject_failure(
        ResourceKind::Policy,
        StoreOperation::Delete,
        StoreError::not_found(ResourceKind::Policy, &ObjectKey::new("c1", "pol-a-ns1")),
    );
    store.inject_failure(
        ResourceKind::Policy,
        StoreOperation::UpdateStatus,
        StoreError::not_found(ResourceKind::Policy, &root.key()),
    );

    let summary = propagator.reconcile(&root.key()).await.unwrap();
    assert!(summary.disabled);
    assert_eq!(summary.deleted, 0);
}

#[tokio::test]
async fn test_delete_failure_aborts_cleanup() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a")],
        vec![PlacementDecision::new("c1", "c1")],
    )
    .await;
    propagator.reconcile(&root.key()).await.unwrap();
    disable(&store, &root.key()).await;

    store.inject_failure(
        ResourceKind::Policy,
        StoreOperation::Delete,
        StoreError::Unavailable("connection refused".into()),
    );

    let err = propagator.reconcile(&root.key()).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(replicas_of(&store, &root.key()).await.len(), 1);
}

#[tokio::test]
async fn test_unnameable_root_is_not_retryable() {
    let (store, propagator) = setup();
    let root = store
        .create_policy(Policy::new("team-a", "pol", root_spec()))
        .await
        .unwrap();
    store
        .apply_placement_binding(PlacementBinding::new(
            "team-a",
            "pb-1",
            "rule-1",
            vec![Subject::policy("pol")],
        ))
        .await
        .unwrap();
    store
        .apply_placement_rule(PlacementRule::new(
            "team-a",
            "rule-1",
            vec![PlacementDecision::new("c1", "c1")],
        ))
        .await
        .unwrap();

    let mut events = propagator.subscribe();
    let err = propagator.reconcile(&root.key()).await.unwrap_err();
    assert!(!err.is_retryable());
    assert_eq!(store.policy_count(), 1);

    let warning = events.recv().await.unwrap();
    assert_eq!(warning.severity, EventSeverity::Warning);
    assert!(matches!(
        warning.event,
        PropagationEvent::PolicyRejected { ref root, .. } if root == &ObjectKey::new("team-a", "pol")
    ));
}

#[tokio::test]
async fn test_deleted_root_leaves_no_replicas() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    seed_placement(
        &store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a")],
        vec![PlacementDecision::new("c1", "c1")],
    )
    .await;
    propagator.reconcile(&root.key()).await.unwrap();
    store.delete_policy(&root.key()).await.unwrap();

    let summary = propagator.reconcile(&root.key()).await.unwrap();
    assert_eq!(summary.deleted, 1);
    assert_eq!(store.policy_count(), 0);
}

#[tokio::test]
async fn test_replica_keys_are_skipped() {
    let (store, propagator) = setup();
    let root = seed_root(&store, "ns1", "pol-a").await;
    propagator
        .replicate_to_target(&root, &PlacementDecision::new("c1", "c1"))
        .await
        .unwrap();
    store.reset_operation_counts();

    let summary = propagator
        .reconcile(&ObjectKey::new("c1", "pol-a-ns1"))
        .await
        .unwrap();
    assert_eq!(summary.writes(), 0);
    assert_eq!(
        store.operation_count(ResourceKind::PlacementBinding, StoreOperation::List),
        0
    );
}

async fn seed_single_target(store: &InMemoryObjectStore) -> Policy {
    let root = seed_root(store, "ns1", "pol-a").await;
    seed_placement(
        store,
        "pb-1",
        "rule-1",
        vec![Subject::policy("pol-a")],
        vec![PlacementDecision::new("c1", "c1")],
    )
    .await;
    root
}

#[tokio::test]
async fn test_update_conflict_propagates_and_retry_restores() {
    let (store, propagator) = setup();
    let root = seed_single_target(&store).await;
    propagator.reconcile(&root.key()).await.unwrap();

    let replica_key = ObjectKey::new("c1", "pol-a-ns1");
    let mut drifted = store.get_policy(&replica_key).await.unwrap();
    drifted.spec.remediation_action = Some(RemediationAction::Enforce);
    let drifted = store.update_policy(drifted).await.unwrap();

    store.inject_failure(
        ResourceKind::Policy,
        StoreOperation::Update,
        StoreError::Conflict {
            kind: ResourceKind::Policy,
            key: replica_key.clone(),
            expected: drifted.metadata.resource_version.unwrap_or_default(),
            actual: drifted.metadata.resource_version.unwrap_or_default() + 1,
        },
    );

    let mut events = propagator.subscribe();
    let err = propagator.reconcile(&root.key()).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(events.try_recv().is_err());
    assert!(!specs_equal(&root, &store.get_policy(&replica_key).await.unwrap()));

    let summary = propagator.reconcile(&root.key()).await.unwrap();
    assert_eq!(summary.updated, 1);
    assert!(matches!(
        events.recv().await.unwrap().event,
        PropagationEvent::PolicyUpdated { .. }
    ));
}

#[tokio::test]
async fn test_status_clear_failure_aborts_disable() {
    let (store, propagator) = setup();
    let root = seed_single_target(&store).await;
    propagator.reconcile(&root.key()).await.unwrap();
    disable(&store, &root.key()).await;

    store.inject_failure(
        ResourceKind::Policy,
        StoreOperation::UpdateStatus,
        StoreError::Unavailable("apiserver unavailable".into()),
    );

    let mut events = propagator.subscribe();
    let err = propagator.reconcile(&root.key()).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(!err.is_not_found());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_replica_list_failure_aborts_cleanup() {
    let (store, propagator) = setup();
    let root = seed_single_target(&store).await;
    propagator.reconcile(&root.key()).await.unwrap();
    disable(&store, &root.key()).await;

    store.inject_failure(
        ResourceKind::Policy,
        StoreOperation::List,
        StoreError::Unavailable("list timed out".into()),
    );

    let mut events = propagator.subscribe();
    let err = propagator.reconcile(&root.key()).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(events.try_recv().is_err());
    assert_eq!(replicas_of(&store, &root.key()).await.len(), 1);
}

#[tokio::test]
async fn test_binding_list_failure_aborts_pass() {
    let (store, propagator) = setup();
    let root = seed_single_target(&store).await;

    store.inject_failure(
        ResourceKind::PlacementBinding,
        StoreOperation::List,
        StoreError::Unavailable("list timed out".into()),
    );

    let err = propagator.reconcile(&root.key()).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(store.policy_count(), 1);
    assert_eq!(
        store.operation_count(ResourceKind::PlacementRule, StoreOperation::Get),
        0
    );
}

#[tokio::test]
async fn test_removed_rule_is_reported_missing() {
    let (store, propagator) = setup();
    let root = seed_single_target(&store).await;
    propagator.reconcile(&root.key()).await.unwrap();

    let rule_key = ObjectKey::new("ns1", "rule-1");
    store.delete_placement_rule(&rule_key).await.unwrap();
    assert!(store
        .list_placement_rules(&ListFilter::in_namespace("ns1"))
        .await
        .unwrap()
        .is_empty());

    let summary = propagator.reconcile(&root.key()).await.unwrap();
    assert_eq!(summary.missing_rules, vec![rule_key]);
    assert_eq!(summary.targets(), 0);
    // Existing replicas are left in place
    assert_eq!(replicas_of(&store, &root.key()).await.len(), 1);
}

#[tokio::test]
async fn test_removed_binding_stops_placement() {
    let (store, propagator) = setup();
    let root = seed_single_target(&store).await;

    let binding_key = ObjectKey::new("ns1", "pb-1");
    let binding = store.get_placement_binding(&binding_key).await.unwrap();
    assert_eq!(binding.rule_key(), ObjectKey::new("ns1", "rule-1"));
    store.delete_placement_binding(&binding_key).await.unwrap();

    let summary = propagator.reconcile(&root.key()).await.unwrap();
    assert!(summary.placements.is_empty());
    assert_eq!(summary.targets(), 0);
    assert!(replicas_of(&store, &root.key()).await.is_empty());
}
