//! Propagator Store - Object store traits and implementations
//!
//! The reconciler talks to the declarative object store only through the
//! traits in this crate:
//!
//! - **PolicyStore**: root policies and replicas, including the separate
//!   status write
//! - **PlacementBindingStore**: bindings linking policies to placement rules
//! - **PlacementRuleStore**: placement rules and their decisions
//!
//! ## In-Memory Store
//!
//! [`InMemoryObjectStore`] provides per-object atomic writes, optimistic
//! concurrency through resource versions, label/namespace filtering and a
//! watch stream. It backs development runs and tests; production deployments
//! implement the same traits against a real API server.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod filter;
pub mod kind;
pub mod memory;
pub mod traits;
pub mod watch;

// Re-exports
pub use error::{Result, StoreError};
pub use filter::ListFilter;
pub use kind::{ResourceKind, StoreOperation};
pub use memory::InMemoryObjectStore;
pub use traits::{ObjectStore, PlacementBindingStore, PlacementRuleStore, PolicyStore};
pub use watch::{WatchAction, WatchEvent, WatchObject};
