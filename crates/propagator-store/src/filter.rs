//! List filtering

use propagator_types::ObjectMeta;
use std::collections::BTreeMap;

/// Namespace scope plus label-equality selector for list calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Restrict to one namespace; `None` lists across all namespaces
    pub namespace: Option<String>,

    /// Every entry must be present with an equal value
    pub labels: BTreeMap<String, String>,
}

impl ListFilter {
    /// Match everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels.extend(labels);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, metadata: &ObjectMeta) -> bool {
        let namespace_ok = self
            .namespace
            .as_deref()
            .map_or(true, |namespace| namespace == metadata.namespace);
        namespace_ok && metadata.labels.matches(&self.labels)
    }
}
