//! Relayer lifecycle
//!
//! [`Relayer`] owns the registry, the coordinator, one watcher task per chain
//! and the set of in-flight relays. `main` registers the shutdown signal once
//! and hands it to [`Relayer::run_until`].

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::RelayerConfig;
use crate::coordinator::{RelayCoordinator, RelayTasks};
use crate::error::{RelayError, RelayResult};
use crate::metrics;
use crate::registry::ChainRegistry;
use crate::watcher::EventWatcher;

/// Result of one watcher task, tagged with its chain
type WatcherExit = (u64, RelayResult<()>);

pub struct Relayer {
    registry: Arc<ChainRegistry>,
    coordinator: Arc<RelayCoordinator>,
    settings: RelayerConfig,
    tasks: RelayTasks,
    running: AtomicBool,
    watchers: Mutex<JoinSet<WatcherExit>>,
    started_at: Instant,
}

impl Relayer {
    pub fn new(registry: ChainRegistry, settings: RelayerConfig) -> Self {
        let registry = Arc::new(registry);
        Self {
            coordinator: Arc::new(RelayCoordinator::new(registry.clone())),
            registry,
            settings,
            tasks: RelayTasks::new(),
            running: AtomicBool::new(false),
            watchers: Mutex::new(JoinSet::new()),
            started_at: Instant::now(),
        }
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    pub fn coordinator(&self) -> &Arc<RelayCoordinator> {
        &self.coordinator
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub async fn in_flight(&self) -> usize {
        self.tasks.in_flight().await
    }

    /// Start one watcher per chain. Returns false, and does nothing, if
    /// already running.
    pub async fn start(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Relayer already running, ignoring start");
            return false;
        }

        let mut watchers = self.watchers.lock().await;
        for endpoint in self.registry.all() {
            let chain_id = endpoint.chain_id();
            let watcher = EventWatcher::new(
                endpoint.clone(),
                self.coordinator.clone(),
                self.tasks.clone(),
                &self.settings,
            );

            watchers.spawn(async move {
                let result = AssertUnwindSafe(watcher.run())
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(RelayError::SubscriptionLost {
                            chain_id,
                            reason: "watcher panicked".to_string(),
                        })
                    });
                (chain_id, result)
            });
        }

        metrics::set_up(true);
        info!(chains = ?self.registry.chain_ids(), "Relayer started");
        true
    }

    /// Run until `signal` fires or a watcher stops, then shut down.
    ///
    /// A stopped watcher is fatal: the error is returned after shutdown so
    /// the process exits non-zero and its supervisor restarts it.
    pub async fn run_until<F>(&self, signal: F) -> RelayResult<()>
    where
        F: Future<Output = ()>,
    {
        let result = {
            let mut watchers = self.watchers.lock().await;
            tokio::select! {
                _ = signal => {
                    info!("Shutdown signal received");
                    Ok(())
                }
                Some(joined) = watchers.join_next(), if !watchers.is_empty() => {
                    match joined {
                        Ok((_, Err(e))) => Err(e),
                        Ok((chain_id, Ok(()))) => Err(RelayError::SubscriptionLost {
                            chain_id,
                            reason: "watcher exited".to_string(),
                        }),
                        Err(e) => Err(RelayError::SubscriptionLost {
                            chain_id: 0,
                            reason: e.to_string(),
                        }),
                    }
                }
            }
        };

        if let Err(e) = &result {
            error!(error = %e, "Watcher stopped, shutting down");
        }

        self.shutdown().await;
        result
    }

    /// Stop all watchers, give in-flight relays the grace period, release
    /// both chains. Safe to call more than once.
    pub async fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Relayer not running, nothing to shut down");
            return;
        }

        info!("Shutting down relayer");

        {
            let mut watchers = self.watchers.lock().await;
            watchers.abort_all();
            while watchers.join_next().await.is_some() {}
        }
        for endpoint in self.registry.all() {
            metrics::set_watcher_up(endpoint.chain_id(), false);
            info!(chain_id = endpoint.chain_id(), "Watcher stopped");
        }

        let grace = Duration::from_millis(self.settings.shutdown_grace_ms);
        let aborted = self.tasks.drain(grace).await;

        for endpoint in self.registry.all() {
            info!(chain_id = endpoint.chain_id(), "Released chain connection");
        }

        metrics::set_up(false);
        info!(aborted_relays = aborted, "Relayer stopped");
    }
}
