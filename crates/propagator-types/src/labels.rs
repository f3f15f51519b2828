//! Object labels
//!
//! Labels are a flat string map on the wire. In memory the three ownership
//! keys a replica carries are lifted into [`OwnershipLabels`] so the reconciler
//! never has to spell them out; everything else stays in an escape-hatch map of
//! extra labels. Both halves are validated when labels enter the system.

use crate::ids::ObjectKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label naming the cluster a replica was placed on
pub const CLUSTER_NAME_LABEL: &str = "cluster-name";

/// Label naming the namespace of the cluster a replica was placed on
pub const CLUSTER_NAMESPACE_LABEL: &str = "cluster-namespace";

/// Label naming the owning root policy as `<namespace>/<name>`
pub const ROOT_POLICY_LABEL: &str = "root";

const RESERVED_KEYS: [&str; 3] = [
    CLUSTER_NAME_LABEL,
    CLUSTER_NAMESPACE_LABEL,
    ROOT_POLICY_LABEL,
];

const MAX_KEY_NAME_LEN: usize = 63;
const MAX_KEY_PREFIX_LEN: usize = 253;
const MAX_VALUE_LEN: usize = 253;

/// Label validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelError {
    #[error("invalid label key {0:?}")]
    InvalidKey(String),

    #[error("invalid value {value:?} for label {key:?}")]
    InvalidValue { key: String, value: String },

    #[error("label {0:?} is reserved for ownership tracking")]
    ReservedKey(String),

    #[error("ownership labels are incomplete, missing {0:?}")]
    IncompleteOwnership(&'static str),

    #[error("root label {0:?} is not a <namespace>/<name> reference")]
    InvalidRootReference(String),
}

/// Ownership labels attached to every replica
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnershipLabels {
    /// Cluster the replica was placed on
    pub cluster_name: String,
    /// Namespace of that cluster (also the replica's namespace)
    pub cluster_namespace: String,
    /// Root policy the replica was copied from
    pub root_policy: ObjectKey,
}

impl OwnershipLabels {
    pub fn new(
        cluster_name: impl Into<String>,
        cluster_namespace: impl Into<String>,
        root_policy: ObjectKey,
    ) -> Result<Self, LabelError> {
        let labels = Self {
            cluster_name: cluster_name.into(),
            cluster_namespace: cluster_namespace.into(),
            root_policy,
        };
        labels.validate()?;
        Ok(labels)
    }

    /// Label selector matching every replica of `root`
    pub fn selector_for_root(root: &ObjectKey) -> BTreeMap<String, String> {
        BTreeMap::from([(ROOT_POLICY_LABEL.to_string(), root.to_string())])
    }

    fn validate(&self) -> Result<(), LabelError> {
        validate_value(CLUSTER_NAME_LABEL, &self.cluster_name)?;
        validate_value(CLUSTER_NAMESPACE_LABEL, &self.cluster_namespace)?;
        validate_value(ROOT_POLICY_LABEL, &self.root_policy.to_string())
    }

    fn entries(&self) -> [(&'static str, String); 3] {
        [
            (CLUSTER_NAME_LABEL, self.cluster_name.clone()),
            (CLUSTER_NAMESPACE_LABEL, self.cluster_namespace.clone()),
            (ROOT_POLICY_LABEL, self.root_policy.to_string()),
        ]
    }
}

/// Validated label set of an object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct Labels {
    ownership: Option<OwnershipLabels>,
    extra: BTreeMap<String, String>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ownership labels, present only on replicas
    pub fn ownership(&self) -> Option<&OwnershipLabels> {
        self.ownership.as_ref()
    }

    pub fn set_ownership(&mut self, ownership: OwnershipLabels) {
        self.ownership = Some(ownership);
    }

    /// Labels outside the ownership keys
    pub fn extras(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    /// Add an extra label
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), LabelError> {
        let key = key.into();
        let value = value.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(LabelError::ReservedKey(key));
        }
        validate_key(&key)?;
        validate_value(&key, &value)?;
        self.extra.insert(key, value);
        Ok(())
    }

    /// Builder-style [`Labels::insert`]
    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, LabelError> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Look up a label by its flat key
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(ownership) = &self.ownership {
            if let Some((_, value)) = ownership.entries().into_iter().find(|(k, _)| *k == key) {
                return Some(value);
            }
        }
        self.extra.get(key).cloned()
    }

    /// Equality-based selector match; an empty selector matches everything
    pub fn matches(&self, selector: &BTreeMap<String, String>) -> bool {
        selector
            .iter()
            .all(|(key, value)| self.get(key).as_deref() == Some(value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.ownership.is_none() && self.extra.is_empty()
    }

    /// Flatten into the wire representation
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = self.extra.clone();
        if let Some(ownership) = &self.ownership {
            for (key, value) in ownership.entries() {
                map.insert(key.to_string(), value);
            }
        }
        map
    }
}

impl TryFrom<BTreeMap<String, String>> for Labels {
    type Error = LabelError;

    fn try_from(mut map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let cluster_name = map.remove(CLUSTER_NAME_LABEL);
        let cluster_namespace = map.remove(CLUSTER_NAMESPACE_LABEL);
        let root = map.remove(ROOT_POLICY_LABEL);

        let ownership = match (cluster_name, cluster_namespace, root) {
            (None, None, None) => None,
            (Some(name), Some(namespace), Some(root)) => {
                let root_policy = root
                    .parse::<ObjectKey>()
                    .map_err(|_| LabelError::InvalidRootReference(root.clone()))?;
                Some(OwnershipLabels::new(name, namespace, root_policy)?)
            }
            (None, _, _) => return Err(LabelError::IncompleteOwnership(CLUSTER_NAME_LABEL)),
            (_, None, _) => {
                return Err(LabelError::IncompleteOwnership(CLUSTER_NAMESPACE_LABEL))
            }
            (_, _, None) => return Err(LabelError::IncompleteOwnership(ROOT_POLICY_LABEL)),
        };

        let mut labels = Labels {
            ownership,
            extra: BTreeMap::new(),
        };
        for (key, value) in map {
            labels.insert(key, value)?;
        }
        Ok(labels)
    }
}

impl From<Labels> for BTreeMap<String, String> {
    fn from(labels: Labels) -> Self {
        labels.to_map()
    }
}

fn validate_key(key: &str) -> Result<(), LabelError> {
    let invalid = || LabelError::InvalidKey(key.to_string());
    let (prefix, name) = match key.rsplit_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty()
            || prefix.len() > MAX_KEY_PREFIX_LEN
            || !prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        {
            return Err(invalid());
        }
    }

    let well_formed = !name.is_empty()
        && name.len() <= MAX_KEY_NAME_LEN
        && name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if well_formed {
        Ok(())
    } else {
        Err(invalid())
    }
}

fn validate_value(key: &str, value: &str) -> Result<(), LabelError> {
    let well_formed = value.len() <= MAX_VALUE_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    if well_formed {
        Ok(())
    } else {
        Err(LabelError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}
