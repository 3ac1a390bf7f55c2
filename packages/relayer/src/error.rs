//! Relay error taxonomy
//!
//! Configuration errors are fatal at startup. Every other variant is raised
//! per relay attempt (or per watcher) and is logged, never propagated to the
//! process.

use alloy::primitives::TxHash;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown chain: {0}")]
    UnknownChain(u64),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("delivery transaction reverted: {tx_hash}")]
    TxReverted { tx_hash: TxHash },

    #[error("subscription lost on chain {chain_id}: {reason}")]
    SubscriptionLost { chain_id: u64, reason: String },
}

impl RelayError {
    /// Wrap any displayable transport/contract error as an RPC failure
    pub fn rpc(err: impl std::fmt::Display) -> Self {
        RelayError::Rpc(err.to_string())
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Configuration(_) => "configuration",
            RelayError::UnknownChain(_) => "unknown_chain",
            RelayError::Rpc(_) => "rpc",
            RelayError::TxReverted { .. } => "tx_reverted",
            RelayError::SubscriptionLost { .. } => "subscription_lost",
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
