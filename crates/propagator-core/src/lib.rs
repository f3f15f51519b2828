//! Propagator Core - Root policy reconciliation
//!
//! Given a root policy and the placement decisions that select clusters for
//! it, the propagator keeps exactly one up-to-date replica in each selected
//! cluster namespace, and removes every replica when the root is disabled.
//!
//! ## Components
//!
//! - **comparator**: decides whether a replica is stale
//! - **replica**: builds a fresh replica from a root and a decision
//! - **replicator**: converges one (root, decision) pair
//! - **orchestrator**: resolves bindings and rules for a root and fans out
//!
//! The store is the only shared state. A pass aborts on the first unexpected
//! error and relies on the caller to retry; every step is idempotent so a
//! retried pass completes whatever the failed one left behind.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod builder;
pub mod comparator;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod replica;
pub mod replicator;
pub mod summary;

pub use builder::PropagatorBuilder;
pub use comparator::specs_equal;
pub use error::{PropagationError, Result};
pub use events::EventEmitter;
pub use orchestrator::Propagator;
pub use replica::ReplicaBuilder;
pub use replicator::{DecisionReplicator, ReplicaOutcome};
pub use summary::ReconcileSummary;
