//! Reconciliation workers and loops
//!
//! Store watch events and periodic resyncs feed root keys into the work
//! queue; workers drain it through the propagator. Failed roots are retried
//! with backoff when the error is retryable and dropped otherwise.

use crate::config::ControllerConfig;
use crate::scheduler::queue::WorkQueue;
use crate::scheduler::triggers;
use propagator_core::Propagator;
use propagator_store::{ObjectStore, WatchEvent};
use propagator_types::EventSeverity;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// Drives the propagator from store changes
pub struct Reconciler {
    config: ControllerConfig,
    propagator: Propagator,
    queue: Arc<WorkQueue>,
}

impl Reconciler {
    pub fn new(config: ControllerConfig, propagator: Propagator) -> Arc<Self> {
        let queue = Arc::new(WorkQueue::new(config.base_backoff(), config.max_backoff()));
        Arc::new(Self {
            config,
            propagator,
            queue,
        })
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    fn store(&self) -> &dyn ObjectStore {
        self.propagator.store().as_ref()
    }

    /// Run workers until the queue is shut down
    pub async fn run_workers(self: Arc<Self>) {
        let workers = (0..self.config.max_concurrent_reconciles).map(|worker| {
            let reconciler = self.clone();
            tokio::spawn(async move { reconciler.worker(worker).await })
        });

        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                error!(error = %e, "Reconcile worker panicked");
            }
        }
        info!("Reconcile workers stopped");
    }

    async fn worker(&self, worker: usize) {
        debug!(worker, "Reconcile worker started");
        while let Some(key) = self.queue.get().await {
            match self.propagator.reconcile(&key).await {
                Ok(summary) => {
                    self.queue.forget(&key).await;
                    debug!(worker, root = %key, writes = summary.writes(), "Reconciled root");
                }
                Err(e) if e.is_retryable() => {
                    let delay = self.queue.add_rate_limited(key.clone()).await;
                    warn!(
                        worker,
                        root = %key,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Reconcile failed, retrying"
                    );
                }
                Err(e) => {
                    self.queue.forget(&key).await;
                    error!(worker, root = %key, error = %e, "Reconcile failed, dropping root");
                }
            }
            self.queue.done(&key).await;
        }
    }

    /// Enqueue roots affected by store changes
    pub async fn watch_loop(
        self: Arc<Self>,
        mut changes: broadcast::Receiver<WatchEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Ok(event) => self.enqueue_for(&event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Watch stream lagged, resyncing");
                        self.resync().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.changed() => break,
            }
        }
        debug!("Watch loop stopped");
    }

    /// Enqueue every root on a fixed interval
    pub async fn resync_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.resync_interval());
        loop {
            tokio::select! {
                _ = ticker.tick() => self.resync().await,
                _ = shutdown.changed() => break,
            }
        }
        debug!("Resync loop stopped");
    }

    /// Log every propagation event
    pub async fn event_log_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut events = self.propagator.subscribe();
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(envelope) => match envelope.severity {
                        EventSeverity::Normal => info!(
                            reason = %envelope.reason,
                            root = %envelope.event.root(),
                            "{}",
                            envelope.message()
                        ),
                        EventSeverity::Warning => warn!(
                            reason = %envelope.reason,
                            root = %envelope.event.root(),
                            "{}",
                            envelope.message()
                        ),
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event log lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.changed() => break,
            }
        }
    }

    /// Enqueue every root policy
    pub async fn resync(&self) {
        match triggers::all_roots(self.store()).await {
            Ok(roots) => {
                debug!(count = roots.len(), "Resyncing roots");
                for root in roots {
                    self.queue.add(root).await;
                }
            }
            Err(e) => error!(error = %e, "Resync failed to list policies"),
        }
    }

    async fn enqueue_for(&self, event: &WatchEvent) {
        match triggers::roots_for_event(self.store(), event).await {
            Ok(roots) => {
                for root in roots {
                    self.queue.add(root).await;
                }
            }
            Err(e) => {
                // The next resync picks these roots up
                error!(
                    kind = %event.kind(),
                    key = %event.key(),
                    error = %e,
                    "Failed to resolve affected roots"
                );
            }
        }
    }
}
