//! Policy objects
//!
//! The same `Policy` type represents the root object an operator authors and
//! the replicas the propagator writes into cluster namespaces. A policy whose
//! labels carry [`OwnershipLabels`](crate::OwnershipLabels) is a replica.

use crate::ids::ObjectKey;
use crate::labels::Labels;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// API group matched against placement binding subjects
pub const POLICY_API_GROUP: &str = "policy.open-cluster-management.io";

/// Kind matched against placement binding subjects
pub const POLICY_KIND: &str = "Policy";

/// Metadata shared by every stored object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Store-assigned version used for optimistic concurrency; `None` on
    /// objects that have not been persisted yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<u64>,

    /// Store-assigned unique id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

/// Remediation requested from the cluster-side agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemediationAction {
    Inform,
    Enforce,
}

/// Desired state of a policy, copied verbatim onto replicas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    /// A disabled root has all of its replicas removed
    #[serde(default)]
    pub disabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_action: Option<RemediationAction>,

    /// Opaque templates evaluated on the target clusters
    #[serde(default)]
    pub policy_templates: Vec<serde_json::Value>,
}

/// Aggregated compliance of a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceState {
    Compliant,
    NonCompliant,
}

/// Placement that contributed to a root policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementStatus {
    pub placement_binding: String,
    pub placement_rule: String,
}

/// Compliance reported for one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterComplianceStatus {
    pub cluster_name: String,
    pub cluster_namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliant: Option<ComplianceState>,
}

/// Observed state of a policy, owned by the root; the zero value is
/// `PolicyStatus::default()`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliant: Option<ComplianceState>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placement: Vec<PlacementStatus>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<ClusterComplianceStatus>,
}

impl PolicyStatus {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// A root policy or one of its replicas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: PolicySpec,

    #[serde(default)]
    pub status: PolicyStatus,
}

impl Policy {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, spec: PolicySpec) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec,
            status: PolicyStatus::default(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn is_disabled(&self) -> bool {
        self.spec.disabled
    }

    /// Whether this policy was written by the propagator for some root
    pub fn is_replica(&self) -> bool {
        self.metadata.labels.ownership().is_some()
    }

    /// Root this replica belongs to, `None` for roots
    pub fn root_key(&self) -> Option<&ObjectKey> {
        self.metadata
            .labels
            .ownership()
            .map(|ownership| &ownership.root_policy)
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.annotations.insert(key.into(), value.into());
        self
    }
}
