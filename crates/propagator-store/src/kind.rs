//! Resource kinds and store operations

use std::fmt;

/// Kinds of objects held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Policy,
    PlacementBinding,
    PlacementRule,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Policy => "Policy",
            ResourceKind::PlacementBinding => "PlacementBinding",
            ResourceKind::PlacementRule => "PlacementRule",
        };
        f.write_str(name)
    }
}

/// Store operations, used for call accounting and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Get,
    List,
    Create,
    Update,
    UpdateStatus,
    Delete,
}
