//! Watch notifications emitted by the store

use crate::kind::ResourceKind;
use propagator_types::{ObjectKey, PlacementBinding, PlacementRule, Policy};

/// What happened to an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    Added,
    Modified,
    Deleted,
}

/// Object carried by a watch event; for deletions, the last stored state
#[derive(Debug, Clone, PartialEq)]
pub enum WatchObject {
    Policy(Policy),
    PlacementBinding(PlacementBinding),
    PlacementRule(PlacementRule),
}

/// A single change observed on the store
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent {
    pub action: WatchAction,
    pub object: WatchObject,
}

impl WatchEvent {
    pub fn new(action: WatchAction, object: WatchObject) -> Self {
        Self { action, object }
    }

    pub fn kind(&self) -> ResourceKind {
        match &self.object {
            WatchObject::Policy(_) => ResourceKind::Policy,
            WatchObject::PlacementBinding(_) => ResourceKind::PlacementBinding,
            WatchObject::PlacementRule(_) => ResourceKind::PlacementRule,
        }
    }

    pub fn key(&self) -> ObjectKey {
        match &self.object {
            WatchObject::Policy(policy) => policy.key(),
            WatchObject::PlacementBinding(binding) => binding.key(),
            WatchObject::PlacementRule(rule) => rule.key(),
        }
    }
}
