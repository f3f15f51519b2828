//! Propagator Types - Core object types for policy propagation
//!
//! The propagator replicates a *root* policy onto every cluster selected by
//! its placement. This crate holds the objects that flow between the store
//! and the reconciler.
//!
//! ## Key Concepts
//!
//! - **Policy**: both the root object and its per-cluster replicas; a replica
//!   is a policy carrying ownership labels
//! - **PlacementBinding**: links policies (subjects) to a placement rule
//! - **PlacementRule**: carries the computed placement decisions
//! - **OwnershipLabels**: typed labels recording which root owns a replica
//! - **Events**: human-readable propagation notifications

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod events;
pub mod ids;
pub mod labels;
pub mod naming;
pub mod placement;
pub mod policy;

// Re-export main types
pub use events::{EventSeverity, PropagationEvent, PropagationEventEnvelope, PROPAGATION_REASON};
pub use ids::{ClusterRef, ObjectKey, ParseObjectKeyError};
pub use labels::{
    LabelError, Labels, OwnershipLabels, CLUSTER_NAME_LABEL, CLUSTER_NAMESPACE_LABEL,
    ROOT_POLICY_LABEL,
};
pub use naming::{full_name_for_policy, NameError};
pub use placement::{
    PlacementBinding, PlacementDecision, PlacementRef, PlacementRule, PlacementRuleStatus,
    Subject,
};
pub use policy::{
    ClusterComplianceStatus, ComplianceState, ObjectMeta, PlacementStatus, Policy, PolicySpec,
    PolicyStatus, RemediationAction, POLICY_API_GROUP, POLICY_KIND,
};
