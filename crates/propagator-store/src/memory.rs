//! In-memory object store
//!
//! Suitable for development and testing. Each write is atomic per object:
//! DashMap holds the shard lock for the duration of the check-and-write, so a
//! concurrent create of the same key surfaces as `AlreadyExists` and a write
//! carrying a stale resource version surfaces as `Conflict`.

use crate::error::{Result, StoreError};
use crate::filter::ListFilter;
use crate::kind::{ResourceKind, StoreOperation};
use crate::traits::{PlacementBindingStore, PlacementRuleStore, PolicyStore};
use crate::watch::{WatchAction, WatchEvent, WatchObject};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use propagator_types::{ObjectKey, ObjectMeta, PlacementBinding, PlacementRule, Policy};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

#[cfg(feature = "test-utils")]
use std::collections::VecDeque;

const WATCH_CHANNEL_CAPACITY: usize = 1024;

/// Objects the in-memory store knows how to persist
trait StoredObject: Clone + PartialEq + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn metadata(&self) -> &ObjectMeta;
    fn metadata_mut(&mut self) -> &mut ObjectMeta;
    fn into_watch(self) -> WatchObject;
}

impl StoredObject for Policy {
    const KIND: ResourceKind = ResourceKind::Policy;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn into_watch(self) -> WatchObject {
        WatchObject::Policy(self)
    }
}

impl StoredObject for PlacementBinding {
    const KIND: ResourceKind = ResourceKind::PlacementBinding;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn into_watch(self) -> WatchObject {
        WatchObject::PlacementBinding(self)
    }
}

impl StoredObject for PlacementRule {
    const KIND: ResourceKind = ResourceKind::PlacementRule;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn into_watch(self) -> WatchObject {
        WatchObject::PlacementRule(self)
    }
}

/// In-memory object store for development and testing
pub struct InMemoryObjectStore {
    policies: DashMap<ObjectKey, Policy>,
    bindings: DashMap<ObjectKey, PlacementBinding>,
    rules: DashMap<ObjectKey, PlacementRule>,
    resource_version: AtomicU64,
    calls: DashMap<(ResourceKind, StoreOperation), u64>,
    #[cfg(feature = "test-utils")]
    faults: DashMap<(ResourceKind, StoreOperation), VecDeque<StoreError>>,
    watch_tx: broadcast::Sender<WatchEvent>,
}

impl InMemoryObjectStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        let (watch_tx, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            policies: DashMap::new(),
            bindings: DashMap::new(),
            rules: DashMap::new(),
            resource_version: AtomicU64::new(0),
            calls: DashMap::new(),
            #[cfg(feature = "test-utils")]
            faults: DashMap::new(),
            watch_tx,
        }
    }

    /// Subscribe to changes made after this call
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.watch_tx.subscribe()
    }

    /// Number of calls made for an operation on a kind
    pub fn operation_count(&self, kind: ResourceKind, operation: StoreOperation) -> u64 {
        self.calls
            .get(&(kind, operation))
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn reset_operation_counts(&self) {
        self.calls.clear();
    }

    /// Make the next call of `operation` on `kind` fail with `error`
    ///
    /// Injected failures queue up and are consumed one per call.
    #[cfg(feature = "test-utils")]
    pub fn inject_failure(&self, kind: ResourceKind, operation: StoreOperation, error: StoreError) {
        self.faults
            .entry((kind, operation))
            .or_default()
            .push_back(error);
    }

    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }

    fn begin(&self, kind: ResourceKind, operation: StoreOperation) -> Result<()> {
        *self.calls.entry((kind, operation)).or_insert(0) += 1;
        trace!(%kind, ?operation, "store call");

        #[cfg(feature = "test-utils")]
        {
            if let Some(mut queue) = self.faults.get_mut(&(kind, operation)) {
                if let Some(error) = queue.pop_front() {
                    return Err(error);
                }
            }
        }

        Ok(())
    }

    fn next_version(&self) -> u64 {
        self.resource_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn notify<T: StoredObject>(&self, action: WatchAction, object: T) {
        // No receivers is fine; nobody is watching
        let _ = self.watch_tx.send(WatchEvent::new(action, object.into_watch()));
    }

    fn validate<T: StoredObject>(object: &T) -> Result<()> {
        let metadata = object.metadata();
        let reason = if metadata.namespace.is_empty() {
            "namespace must not be empty"
        } else if metadata.name.is_empty() {
            "name must not be empty"
        } else {
            return Ok(());
        };
        Err(StoreError::Invalid {
            kind: T::KIND,
            key: metadata.key(),
            reason: reason.to_string(),
        })
    }

    fn get_in<T: StoredObject>(&self, map: &DashMap<ObjectKey, T>, key: &ObjectKey) -> Result<T> {
        self.begin(T::KIND, StoreOperation::Get)?;
        map.get(key)
            .map(|object| object.clone())
            .ok_or_else(|| StoreError::not_found(T::KIND, key))
    }

    fn list_in<T: StoredObject>(
        &self,
        map: &DashMap<ObjectKey, T>,
        filter: &ListFilter,
    ) -> Result<Vec<T>> {
        self.begin(T::KIND, StoreOperation::List)?;
        let mut objects: Vec<T> = map
            .iter()
            .filter(|entry| filter.matches(entry.value().metadata()))
            .map(|entry| entry.value().clone())
            .collect();
        objects.sort_by_key(|object| object.metadata().key());
        Ok(objects)
    }

    fn create_in<T: StoredObject>(&self, map: &DashMap<ObjectKey, T>, mut object: T) -> Result<T> {
        self.begin(T::KIND, StoreOperation::Create)?;
        Self::validate(&object)?;

        let key = object.metadata().key();
        let created = match map.entry(key.clone()) {
            Entry::Occupied(_) => return Err(StoreError::AlreadyExists { kind: T::KIND, key }),
            Entry::Vacant(slot) => {
                let metadata = object.metadata_mut();
                metadata.resource_version = Some(self.next_version());
                metadata.uid = Some(uuid::Uuid::new_v4());
                metadata.creation_timestamp = Some(chrono::Utc::now());
                slot.insert(object.clone());
                object
            }
        };

        self.notify(WatchAction::Added, created.clone());
        Ok(created)
    }

    /// Check the caller's resource version and write `merge(stored, incoming)`
    fn replace_in<T: StoredObject>(
        &self,
        map: &DashMap<ObjectKey, T>,
        operation: StoreOperation,
        incoming: T,
        merge: impl FnOnce(&T, T) -> T,
    ) -> Result<T> {
        self.begin(T::KIND, operation)?;
        Self::validate(&incoming)?;

        let key = incoming.metadata().key();
        let mut stored = map
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found(T::KIND, &key))?;

        let actual = stored.metadata().resource_version.unwrap_or_default();
        if let Some(expected) = incoming.metadata().resource_version {
            if expected != actual {
                return Err(StoreError::Conflict {
                    kind: T::KIND,
                    key,
                    expected,
                    actual,
                });
            }
        }

        let mut next = merge(&*stored, incoming);
        let metadata = next.metadata_mut();
        metadata.uid = stored.metadata().uid;
        metadata.creation_timestamp = stored.metadata().creation_timestamp;
        metadata.resource_version = stored.metadata().resource_version;

        // Writes that change nothing keep the version and stay off the watch
        if next == *stored {
            return Ok(next);
        }

        next.metadata_mut().resource_version = Some(self.next_version());
        *stored = next.clone();
        drop(stored);

        self.notify(WatchAction::Modified, next.clone());
        Ok(next)
    }

    fn apply_in<T: StoredObject>(&self, map: &DashMap<ObjectKey, T>, object: T) -> Result<T> {
        if map.contains_key(&object.metadata().key()) {
            self.replace_in(map, StoreOperation::Update, object, |_, incoming| incoming)
        } else {
            self.create_in(map, object)
        }
    }

    fn delete_in<T: StoredObject>(
        &self,
        map: &DashMap<ObjectKey, T>,
        key: &ObjectKey,
    ) -> Result<()> {
        self.begin(T::KIND, StoreOperation::Delete)?;
        let (_, removed) = map
            .remove(key)
            .ok_or_else(|| StoreError::not_found(T::KIND, key))?;
        self.notify(WatchAction::Deleted, removed);
        Ok(())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyStore for InMemoryObjectStore {
    async fn get_policy(&self, key: &ObjectKey) -> Result<Policy> {
        self.get_in(&self.policies, key)
    }

    async fn list_policies(&self, filter: &ListFilter) -> Result<Vec<Policy>> {
        self.list_in(&self.policies, filter)
    }

    async fn create_policy(&self, policy: Policy) -> Result<Policy> {
        self.create_in(&self.policies, policy)
    }

    async fn update_policy(&self, policy: Policy) -> Result<Policy> {
        self.replace_in(
            &self.policies,
            StoreOperation::Update,
            policy,
            |stored, mut incoming| {
                incoming.status = stored.status.clone();
                incoming
            },
        )
    }

    async fn update_policy_status(&self, policy: Policy) -> Result<Policy> {
        self.replace_in(
            &self.policies,
            StoreOperation::UpdateStatus,
            policy,
            |stored, incoming| {
                let mut next = stored.clone();
                next.status = incoming.status;
                next
            },
        )
    }

    async fn delete_policy(&self, key: &ObjectKey) -> Result<()> {
        self.delete_in(&self.policies, key)
    }
}

#[async_trait]
impl PlacementBindingStore for InMemoryObjectStore {
    async fn get_placement_binding(&self, key: &ObjectKey) -> Result<PlacementBinding> {
        self.get_in(&self.bindings, key)
    }

    async fn list_placement_bindings(&self, filter: &ListFilter) -> Result<Vec<PlacementBinding>> {
        self.list_in(&self.bindings, filter)
    }

    async fn apply_placement_binding(&self, binding: PlacementBinding) -> Result<PlacementBinding> {
        self.apply_in(&self.bindings, binding)
    }

    async fn delete_placement_binding(&self, key: &ObjectKey) -> Result<()> {
        self.delete_in(&self.bindings, key)
    }
}

#[async_trait]
impl PlacementRuleStore for InMemoryObjectStore {
    async fn get_placement_rule(&self, key: &ObjectKey) -> Result<PlacementRule> {
        self.get_in(&self.rules, key)
    }

    async fn list_placement_rules(&self, filter: &ListFilter) -> Result<Vec<PlacementRule>> {
        self.list_in(&self.rules, filter)
    }

    async fn apply_placement_rule(&self, rule: PlacementRule) -> Result<PlacementRule> {
        self.apply_in(&self.rules, rule)
    }

    async fn delete_placement_rule(&self, key: &ObjectKey) -> Result<()> {
        self.delete_in(&self.rules, key)
    }
}
