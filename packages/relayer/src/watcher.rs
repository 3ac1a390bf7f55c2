//! Per-chain `MessageSent` watcher
//!
//! Polls the bridge contract's logs with a block cursor. Each tick scans
//! `[next_block, head - finality_blocks]` in chunks of at most
//! `max_block_range` blocks and hands every new event to the coordinator as
//! a detached task. A range is only marked scanned once its query succeeded,
//! so a failed poll is retried from the same block on the next tick.
//!
//! Consecutive poll failures past `max_poll_failures` mean the subscription
//! is gone: the watcher returns [`RelayError::SubscriptionLost`] and the
//! lifecycle takes the process down.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::chain::ChainEndpoint;
use crate::config::RelayerConfig;
use crate::coordinator::{RelayCoordinator, RelayTasks};
use crate::error::{RelayError, RelayResult};
use crate::metrics;
use crate::types::RelayEvent;

pub struct EventWatcher {
    endpoint: ChainEndpoint,
    coordinator: Arc<RelayCoordinator>,
    tasks: RelayTasks,
    poll_interval: Duration,
    max_block_range: u64,
    max_poll_failures: u32,
    next_block: u64,
}

impl EventWatcher {
    pub fn new(
        endpoint: ChainEndpoint,
        coordinator: Arc<RelayCoordinator>,
        tasks: RelayTasks,
        settings: &RelayerConfig,
    ) -> Self {
        Self {
            endpoint,
            coordinator,
            tasks,
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
            max_block_range: settings.max_block_range.max(1),
            max_poll_failures: settings.max_poll_failures.max(1),
            next_block: 0,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.endpoint.chain_id()
    }

    /// Next block the watcher will scan
    pub fn next_block(&self) -> u64 {
        self.next_block
    }

    /// Position the cursor at `startBlock`, or just past the current head
    pub async fn init(&mut self) -> RelayResult<u64> {
        self.next_block = match self.endpoint.config().start_block {
            Some(block) => block,
            None => {
                let head = self.endpoint.client().latest_block().await.map_err(|e| {
                    RelayError::SubscriptionLost {
                        chain_id: self.chain_id(),
                        reason: e.to_string(),
                    }
                })?;
                head + 1
            }
        };
        Ok(self.next_block)
    }

    /// Run until the subscription is lost. Cancelled by aborting the task.
    pub async fn run(mut self) -> RelayResult<()> {
        let chain_id = self.chain_id();
        if let Err(e) = self.init().await {
            error!(chain_id, error = %e, "Watcher failed to start");
            return Err(e);
        }

        info!(
            chain_id,
            chain = %self.endpoint.label(),
            bridge_address = %self.endpoint.bridge_address(),
            from_block = self.next_block,
            "Watcher started"
        );
        metrics::set_watcher_up(chain_id, true);

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            interval.tick().await;

            match self.poll().await {
                Ok(_) => failures = 0,
                Err(e) => {
                    failures += 1;
                    warn!(
                        chain_id,
                        error = %e,
                        failures,
                        max_failures = self.max_poll_failures,
                        next_block = self.next_block,
                        "Poll failed"
                    );

                    if failures >= self.max_poll_failures {
                        metrics::set_watcher_up(chain_id, false);
                        error!(chain_id, error = %e, "Subscription lost");
                        return Err(RelayError::SubscriptionLost {
                            chain_id,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Scan every newly safe block once; returns how many events were dispatched
    pub async fn poll(&mut self) -> RelayResult<usize> {
        let client = self.endpoint.client().clone();
        let head = client.latest_block().await?;
        let safe = head.saturating_sub(self.endpoint.config().finality_blocks);

        let mut dispatched = 0;
        while self.next_block <= safe {
            let from = self.next_block;
            let to = safe.min(from.saturating_add(self.max_block_range - 1));

            let events = client.message_sent_events(from, to).await?;
            for event in events {
                self.dispatch(event).await;
                dispatched += 1;
            }

            self.next_block = to + 1;
            metrics::set_latest_block(self.chain_id(), to);
        }

        Ok(dispatched)
    }

    /// Hand `event` to the coordinator. A log seen twice is dispatched twice;
    /// the destination's processed check decides.
    async fn dispatch(&self, event: RelayEvent) {
        info!(
            chain_id = self.chain_id(),
            message_id = %event.message_id,
            sender = %event.sender,
            target = %event.target,
            nonce = %event.nonce,
            block_number = ?event.block_number,
            tx_hash = ?event.tx_hash,
            "MessageSent detected"
        );
        metrics::record_event_detected(self.chain_id());

        self.tasks.spawn(self.coordinator.clone(), event).await;
    }
}
