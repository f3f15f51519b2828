//! Store trait definitions

use crate::error::Result;
use crate::filter::ListFilter;
use async_trait::async_trait;
use propagator_types::{ObjectKey, PlacementBinding, PlacementRule, Policy};

/// Storage for root policies and their replicas
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Get a policy, `NotFound` if absent
    async fn get_policy(&self, key: &ObjectKey) -> Result<Policy>;

    /// List policies matching the filter
    async fn list_policies(&self, filter: &ListFilter) -> Result<Vec<Policy>>;

    /// Create a policy; `AlreadyExists` if the key is taken
    async fn create_policy(&self, policy: Policy) -> Result<Policy>;

    /// Replace metadata and spec; the stored status is kept
    ///
    /// A set `resource_version` must equal the stored one or the write fails
    /// with `Conflict`.
    async fn update_policy(&self, policy: Policy) -> Result<Policy>;

    /// Replace only the status
    async fn update_policy_status(&self, policy: Policy) -> Result<Policy>;

    /// Delete a policy, `NotFound` if absent
    async fn delete_policy(&self, key: &ObjectKey) -> Result<()>;
}

/// Storage for placement bindings
#[async_trait]
pub trait PlacementBindingStore: Send + Sync {
    /// Get a binding, `NotFound` if absent
    async fn get_placement_binding(&self, key: &ObjectKey) -> Result<PlacementBinding>;

    /// List bindings matching the filter
    async fn list_placement_bindings(&self, filter: &ListFilter) -> Result<Vec<PlacementBinding>>;

    /// Create or replace a binding
    async fn apply_placement_binding(&self, binding: PlacementBinding) -> Result<PlacementBinding>;

    /// Delete a binding, `NotFound` if absent
    async fn delete_placement_binding(&self, key: &ObjectKey) -> Result<()>;
}

/// Storage for placement rules
#[async_trait]
pub trait PlacementRuleStore: Send + Sync {
    /// Get a rule, `NotFound` if absent
    async fn get_placement_rule(&self, key: &ObjectKey) -> Result<PlacementRule>;

    /// List rules matching the filter
    async fn list_placement_rules(&self, filter: &ListFilter) -> Result<Vec<PlacementRule>>;

    /// Create or replace a rule
    async fn apply_placement_rule(&self, rule: PlacementRule) -> Result<PlacementRule>;

    /// Delete a rule, `NotFound` if absent
    async fn delete_placement_rule(&self, key: &ObjectKey) -> Result<()>;
}

/// Combined store trait
pub trait ObjectStore: PolicyStore + PlacementBindingStore + PlacementRuleStore {}

impl<T> ObjectStore for T where T: PolicyStore + PlacementBindingStore + PlacementRuleStore {}
