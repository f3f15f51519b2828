//! Controller setup and lifecycle management

use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::scheduler::Reconciler;
use crate::seed;
use propagator_core::Propagator;
use propagator_store::InMemoryObjectStore;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Policy propagation controller
pub struct Controller {
    config: DaemonConfig,
    store: Arc<InMemoryObjectStore>,
    reconciler: Arc<Reconciler>,
}

impl Controller {
    /// Create a controller backed by a fresh in-memory store
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        Self::with_store(config, Arc::new(InMemoryObjectStore::new())).await
    }

    /// Create a controller over an existing store, loading the seed file if configured
    pub async fn with_store(
        config: DaemonConfig,
        store: Arc<InMemoryObjectStore>,
    ) -> DaemonResult<Self> {
        config.controller.validate().map_err(DaemonError::Config)?;

        if let Some(path) = &config.seed {
            seed::load_seed(store.as_ref(), path).await?;
        }

        let propagator = Propagator::builder()
            .with_store(store.clone())
            .with_event_capacity(config.controller.event_capacity)
            .build()?;
        let reconciler = Reconciler::new(config.controller.clone(), propagator);

        Ok(Self {
            config,
            store,
            reconciler,
        })
    }

    pub fn store(&self) -> &Arc<InMemoryObjectStore> {
        &self.store
    }

    /// Run until Ctrl+C or SIGTERM
    pub async fn run(self) -> DaemonResult<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> DaemonResult<()> {
        tracing::info!(
            workers = self.config.controller.max_concurrent_reconciles,
            resync_secs = self.config.controller.resync_interval_secs,
            "Policy propagator starting"
        );

        let (stop_tx, stop_rx) = watch::channel(false);

        // Subscribe before the first resync so no change falls between them
        let changes = self.store.subscribe();
        let loops = vec![
            tokio::spawn(self.reconciler.clone().event_log_loop(stop_rx.clone())),
            tokio::spawn(self.reconciler.clone().watch_loop(changes, stop_rx.clone())),
            tokio::spawn(self.reconciler.clone().resync_loop(stop_rx)),
        ];
        let workers = tokio::spawn(self.reconciler.clone().run_workers());

        shutdown.await;
        tracing::info!("Policy propagator shutting down");

        let _ = stop_tx.send(true);
        self.reconciler.queue().shut_down().await;

        for handle in loops {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Controller loop panicked");
            }
        }
        if let Err(e) = workers.await {
            tracing::error!(error = %e, "Worker pool panicked");
        }

        tracing::info!("Policy propagator stopped");
        Ok(())
    }
}

/// Graceful shutdown signal handler
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
