//! Outcome of one reconciliation pass

use propagator_types::{ObjectKey, PlacementStatus};

/// What a pass over one root did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Root the pass ran for
    pub root: ObjectKey,

    /// The root was disabled and its replicas torn down
    pub disabled: bool,

    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,

    /// Placement rules referenced by a matching binding but not found
    pub missing_rules: Vec<ObjectKey>,

    /// Binding/rule pairs that selected clusters for the root
    pub placements: Vec<PlacementStatus>,
}

impl ReconcileSummary {
    pub fn new(root: ObjectKey) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    /// Replicas written during the pass
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// Targets visited, including ones already in sync
    pub fn targets(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}
