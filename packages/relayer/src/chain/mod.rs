//! Chain connectivity
//!
//! [`BridgeClient`] is the seam between relay logic and a live ledger: the
//! watcher reads `MessageSent` logs through it and the coordinator queries and
//! calls the destination bridge through it. [`ChainEndpoint`] binds one
//! [`ChainConfig`] to a client.

use alloy::primitives::{Address, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::config::ChainConfig;
use crate::error::RelayResult;
use crate::types::{DeliveryReceipt, RelayEvent};

pub mod evm;

pub use evm::EvmBridgeClient;

/// Operations the relayer needs from one bridge deployment
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Native chain id of the ledger this client talks to
    fn chain_id(&self) -> u64;

    /// Address of the bridge contract on this ledger
    fn bridge_address(&self) -> Address;

    /// Current head block number
    async fn latest_block(&self) -> RelayResult<u64>;

    /// Decoded `MessageSent` events in `[from_block, to_block]`, in log order
    async fn message_sent_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> RelayResult<Vec<RelayEvent>>;

    /// `isMessageProcessed(messageId)` on this bridge
    async fn is_message_processed(&self, message_id: B256) -> RelayResult<bool>;

    /// Submit `receiveMessage` and wait for the configured confirmations
    async fn receive_message(
        &self,
        message_id: B256,
        sender: Address,
        target: Address,
        data: Bytes,
    ) -> RelayResult<DeliveryReceipt>;
}

/// Runtime binding of a chain's configuration to its bridge client
#[derive(Clone)]
pub struct ChainEndpoint {
    config: ChainConfig,
    client: Arc<dyn BridgeClient>,
}

impl ChainEndpoint {
    pub fn new(config: ChainConfig, client: Arc<dyn BridgeClient>) -> Self {
        Self { config, client }
    }

    /// Connect to the chain over HTTP with the shared signing key
    pub fn connect(config: &ChainConfig, signer: &PrivateKeySigner) -> RelayResult<Self> {
        let client = evm::connect(config, signer.clone())?;

        tracing::info!(
            chain_id = config.chain_id,
            chain = %config.label(),
            bridge_address = %client.bridge_address(),
            remote_chain_id = config.remote_chain_id,
            "Initialized chain"
        );

        Ok(Self::new(config.clone(), client))
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    pub fn remote_chain_id(&self) -> u64 {
        self.config.remote_chain_id
    }

    pub fn label(&self) -> String {
        self.config.label()
    }

    pub fn bridge_address(&self) -> Address {
        self.client.bridge_address()
    }

    pub fn client(&self) -> &Arc<dyn BridgeClient> {
        &self.client
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }
}

impl fmt::Debug for ChainEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainEndpoint")
            .field("chain_id", &self.config.chain_id)
            .field("remote_chain_id", &self.config.remote_chain_id)
            .field("bridge_address", &self.client.bridge_address())
            .finish()
    }
}
