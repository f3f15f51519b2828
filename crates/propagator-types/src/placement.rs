//! Placement objects
//!
//! A `PlacementBinding` names a set of subjects (policies) and the
//! `PlacementRule` that decides where they go. Decisions are computed
//! elsewhere; the propagator only reads them.

use crate::ids::{ClusterRef, ObjectKey};
use crate::policy::{ObjectMeta, Policy, POLICY_API_GROUP, POLICY_KIND};
use serde::{Deserialize, Serialize};

/// Object a placement binding applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub api_group: String,
    pub kind: String,
    pub name: String,
}

impl Subject {
    /// Subject referring to a policy by name
    pub fn policy(name: impl Into<String>) -> Self {
        Self {
            api_group: POLICY_API_GROUP.to_string(),
            kind: POLICY_KIND.to_string(),
            name: name.into(),
        }
    }

    pub fn is_policy(&self) -> bool {
        self.api_group == POLICY_API_GROUP && self.kind == POLICY_KIND
    }

    /// API group, kind and name all match `policy`
    pub fn matches(&self, policy: &Policy) -> bool {
        self.is_policy() && self.name == policy.name()
    }
}

/// Reference from a binding to its placement rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl PlacementRef {
    pub fn rule(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_group: None,
            kind: None,
        }
    }
}

/// Binds subjects to a placement rule in the same namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementBinding {
    pub metadata: ObjectMeta,
    pub placement_ref: PlacementRef,

    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl PlacementBinding {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        rule: impl Into<String>,
        subjects: Vec<Subject>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            placement_ref: PlacementRef::rule(rule),
            subjects,
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Key of the referenced placement rule
    pub fn rule_key(&self) -> ObjectKey {
        ObjectKey::new(self.metadata.namespace.clone(), self.placement_ref.name.clone())
    }

    /// First subject matching `policy`; later matches are never consulted
    pub fn first_matching_subject(&self, policy: &Policy) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.matches(policy))
    }

    /// Root policies named by this binding's policy subjects
    pub fn policy_subjects(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.subjects
            .iter()
            .filter(|subject| subject.is_policy())
            .map(|subject| ObjectKey::new(self.metadata.namespace.clone(), subject.name.clone()))
    }
}

/// One selected target cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementDecision {
    pub cluster_name: String,
    pub cluster_namespace: String,
}

impl PlacementDecision {
    pub fn new(cluster_name: impl Into<String>, cluster_namespace: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            cluster_namespace: cluster_namespace.into(),
        }
    }

    pub fn cluster(&self) -> ClusterRef {
        ClusterRef::new(self.cluster_name.clone(), self.cluster_namespace.clone())
    }
}

/// Computed decisions of a placement rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementRuleStatus {
    #[serde(default)]
    pub decisions: Vec<PlacementDecision>,
}

/// Placement rule whose status lists the selected clusters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRule {
    pub metadata: ObjectMeta,

    /// Selection criteria, opaque to the propagator
    #[serde(default)]
    pub spec: serde_json::Value,

    #[serde(default)]
    pub status: PlacementRuleStatus,
}

impl PlacementRule {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        decisions: Vec<PlacementDecision>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: serde_json::Value::Null,
            status: PlacementRuleStatus { decisions },
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    pub fn decisions(&self) -> &[PlacementDecision] {
        &self.status.decisions
    }
}
