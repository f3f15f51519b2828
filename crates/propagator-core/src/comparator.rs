//! Replica staleness check

use propagator_types::Policy;

/// Whether `replica` carries the same spec and annotations as `root`
///
/// Labels, status and store metadata are ignored. Annotations are an ordered
/// map that defaults to empty, so "no annotations" and "empty annotations"
/// compare equal.
pub fn specs_equal(root: &Policy, replica: &Policy) -> bool {
    root.spec == replica.spec && root.metadata.annotations == replica.metadata.annotations
}
