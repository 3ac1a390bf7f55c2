//! Relay coordinator
//!
//! One detected event, one attempt: resolve the paired chain, ask its bridge
//! whether the message is already processed, otherwise submit
//! `receiveMessage` and wait for the receipt. Every error is converted into a
//! [`RelayOutcome`] here and never reaches the watcher.
//!
//! There is no lock between the processed check and the submission. Two
//! overlapping attempts for one message can both submit; the destination
//! contract reverts the second.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::{RelayError, RelayResult};
use crate::metrics;
use crate::registry::ChainRegistry;
use crate::types::{RelayEvent, RelayOutcome, SkipReason};

pub struct RelayCoordinator {
    registry: Arc<ChainRegistry>,
}

impl RelayCoordinator {
    pub fn new(registry: Arc<ChainRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    /// Perform one relay attempt for `event`
    pub async fn relay(&self, event: RelayEvent) -> RelayOutcome {
        let started = Instant::now();
        let dest_chain_id = self
            .registry
            .resolve_pair(event.source_chain_id)
            .ok()
            .map(|e| e.chain_id());

        let outcome = match self.try_relay(&event).await {
            Ok(outcome) => outcome,
            Err(e) => RelayOutcome::Failed(e),
        };

        self.report(&event, dest_chain_id, &outcome);
        metrics::record_relay(
            event.source_chain_id,
            dest_chain_id,
            outcome.label(),
            started.elapsed().as_secs_f64(),
        );
        outcome
    }

    async fn try_relay(&self, event: &RelayEvent) -> RelayResult<RelayOutcome> {
        let dest = self.registry.resolve_pair(event.source_chain_id)?;
        let source = self.registry.endpoint(event.source_chain_id)?;

        if dest.client().is_message_processed(event.message_id).await? {
            return Ok(RelayOutcome::Skipped(SkipReason::AlreadyProcessed));
        }

        info!(
            message_id = %event.message_id,
            source_chain_id = source.chain_id(),
            dest_chain_id = dest.chain_id(),
            "Relaying message"
        );

        // The destination bridge trusts the source bridge address we pass
        let receipt = dest
            .client()
            .receive_message(
                event.message_id,
                source.bridge_address(),
                event.target,
                event.payload.clone(),
            )
            .await?;

        if !receipt.success {
            return Err(RelayError::TxReverted {
                tx_hash: receipt.tx_hash,
            });
        }
        Ok(RelayOutcome::Delivered(receipt.tx_hash))
    }

    fn report(&self, event: &RelayEvent, dest_chain_id: Option<u64>, outcome: &RelayOutcome) {
        match outcome {
            RelayOutcome::Delivered(tx_hash) => info!(
                message_id = %event.message_id,
                source_chain_id = event.source_chain_id,
                dest_chain_id = ?dest_chain_id,
                tx_hash = %tx_hash,
                "Message relayed"
            ),
            RelayOutcome::Skipped(reason) => info!(
                message_id = %event.message_id,
                source_chain_id = event.source_chain_id,
                dest_chain_id = ?dest_chain_id,
                reason = %reason,
                "Message already processed, skipping"
            ),
            RelayOutcome::Failed(e) => error!(
                message_id = %event.message_id,
                source_chain_id = event.source_chain_id,
                dest_chain_id = ?dest_chain_id,
                kind = e.kind(),
                error = %e,
                "Relay failed"
            ),
        }
    }
}

/// Tracked set of running relay tasks
///
/// Watchers spawn into it without waiting; shutdown drains it with a grace
/// period. Finished tasks are reaped on every spawn.
#[derive(Clone, Default)]
pub struct RelayTasks {
    set: Arc<Mutex<JoinSet<RelayOutcome>>>,
}

impl RelayTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `coordinator.relay(event)` as an independent task
    pub async fn spawn(&self, coordinator: Arc<RelayCoordinator>, event: RelayEvent) {
        let mut set = self.set.lock().await;
        reap(&mut set);
        set.spawn(async move { coordinator.relay(event).await });
        metrics::set_in_flight(set.len());
    }

    pub async fn in_flight(&self) -> usize {
        let mut set = self.set.lock().await;
        reap(&mut set);
        metrics::set_in_flight(set.len());
        set.len()
    }

    /// Wait up to `grace` for running relays, then abort the rest.
    /// Returns the number of aborted tasks.
    pub async fn drain(&self, grace: Duration) -> usize {
        // Waits without holding the lock
        let mut set = std::mem::take(&mut *self.set.lock().await);
        if set.is_empty() {
            return 0;
        }

        info!(in_flight = set.len(), grace_ms = grace.as_millis() as u64, "Waiting for in-flight relays");

        let finished = tokio::time::timeout(grace, async {
            while let Some(result) = set.join_next().await {
                log_join_error(result);
            }
        })
        .await;

        let aborted = match finished {
            Ok(()) => 0,
            Err(_) => {
                let remaining = set.len();
                warn!(remaining, "Grace period elapsed, aborting in-flight relays");
                set.abort_all();
                while set.join_next().await.is_some() {}
                remaining
            }
        };

        metrics::set_in_flight(0);
        aborted
    }
}

fn reap(set: &mut JoinSet<RelayOutcome>) {
    while let Some(result) = set.try_join_next() {
        log_join_error(result);
    }
}

fn log_join_error(result: Result<RelayOutcome, tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!(error = %e, "Relay task panicked");
        }
    }
}
