//! Seed manifests
//!
//! A seed file is a multi-document YAML stream of `kind`-tagged objects,
//! loaded into the store before the controller starts.

use crate::error::{DaemonError, DaemonResult};
use propagator_store::ObjectStore;
use propagator_types::{PlacementBinding, PlacementRule, Policy};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// One object in a seed file
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum Manifest {
    Policy(Policy),
    PlacementBinding(PlacementBinding),
    PlacementRule(PlacementRule),
}

/// Counts of objects loaded from a seed file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub policies: usize,
    pub bindings: usize,
    pub rules: usize,
}

/// Parse every document of a YAML stream, skipping empty ones
pub fn parse_manifests(source: &str) -> Result<Vec<Manifest>, serde_yaml::Error> {
    let mut manifests = Vec::new();
    for document in serde_yaml::Deserializer::from_str(source) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        manifests.push(serde_yaml::from_value(value)?);
    }
    Ok(manifests)
}

/// Load a seed file into `store`
pub async fn load_seed(store: &dyn ObjectStore, path: &Path) -> DaemonResult<SeedReport> {
    let source = tokio::fs::read_to_string(path).await?;
    let manifests = parse_manifests(&source).map_err(|e| DaemonError::Seed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let report = apply_manifests(store, manifests).await?;
    info!(
        path = %path.display(),
        policies = report.policies,
        bindings = report.bindings,
        rules = report.rules,
        "Seed manifests loaded"
    );
    Ok(report)
}

/// Write manifests into `store`, creating or replacing each object
pub async fn apply_manifests(
    store: &dyn ObjectStore,
    manifests: Vec<Manifest>,
) -> DaemonResult<SeedReport> {
    let mut report = SeedReport::default();
    for manifest in manifests {
        match manifest {
            Manifest::Policy(policy) => {
                debug!(policy = %policy.key(), "Seeding policy");
                match store.get_policy(&policy.key()).await {
                    Ok(existing) => {
                        let mut policy = policy;
                        policy.metadata.resource_version = existing.metadata.resource_version;
                        store.update_policy(policy).await?;
                    }
                    Err(e) if e.is_not_found() => {
                        store.create_policy(policy).await?;
                    }
                    Err(e) => return Err(e.into()),
                }
                report.policies += 1;
            }
            Manifest::PlacementBinding(binding) => {
                debug!(binding = %binding.key(), "Seeding placement binding");
                store.apply_placement_binding(binding).await?;
                report.bindings += 1;
            }
            Manifest::PlacementRule(rule) => {
                debug!(rule = %rule.key(), "Seeding placement rule");
                store.apply_placement_rule(rule).await?;
                report.rules += 1;
            }
        }
    }
    Ok(report)
}
