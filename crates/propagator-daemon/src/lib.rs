//! Policy propagator daemon library
//!
//! This module provides the runtime around the propagation core:
//! - Configuration loading
//! - Seed manifests for the in-memory store
//! - Work queue, change triggers and reconcile workers
//! - Controller lifecycle management

pub mod config;
pub mod error;
pub mod scheduler;
pub mod seed;
pub mod server;

pub use config::{ControllerConfig, DaemonConfig, LoggingConfig};
pub use error::{DaemonError, DaemonResult};
pub use scheduler::{Reconciler, WorkQueue};
pub use server::Controller;
