//! Relay-level types shared by the watcher and the coordinator

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use std::fmt;

use crate::error::RelayError;

/// A `MessageSent` occurrence on a source chain, in flight for one relay attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEvent {
    pub message_id: B256,
    pub sender: Address,
    pub target: Address,
    pub payload: Bytes,
    pub nonce: U256,
    pub source_chain_id: u64,
    /// Block the event was emitted in (log context only)
    pub block_number: Option<u64>,
    /// Source transaction hash (log context only)
    pub tx_hash: Option<TxHash>,
    /// Log index within the block (log context only)
    pub log_index: Option<u64>,
}

/// Why a relay attempt delivered nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The destination bridge already marks the message as processed
    AlreadyProcessed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyProcessed => "already_processed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result of one relay attempt. Logged, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Skipped(SkipReason),
    Delivered(TxHash),
    Failed(RelayError),
}

impl RelayOutcome {
    /// Metric label for the outcome
    pub fn label(&self) -> &'static str {
        match self {
            RelayOutcome::Skipped(_) => "skipped",
            RelayOutcome::Delivered(_) => "delivered",
            RelayOutcome::Failed(_) => "failed",
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, RelayOutcome::Delivered(_))
    }
}

/// Receipt summary for a submitted `receiveMessage` transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub tx_hash: TxHash,
    /// Receipt status: false means the transaction reverted
    pub success: bool,
    pub block_number: Option<u64>,
}
