//! Controller runtime: work queue, change triggers and workers

pub mod queue;
pub mod reconciler;
pub mod triggers;

pub use queue::WorkQueue;
pub use reconciler::Reconciler;
