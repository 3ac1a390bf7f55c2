//! EVM bridge client
//!
//! Talks to one bridge deployment over HTTP JSON-RPC.
//!
//! # Transaction Building
//!
//! The provider stack fills gas fees, chain id and nonce before the local
//! wallet signs. Nonces come from a cached nonce manager so that concurrent
//! deliveries from the shared signer get distinct, sequential nonces instead
//! of racing on `eth_getTransactionCount`.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::fillers::{CachedNonceManager, ChainIdFiller, NonceFiller};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::BridgeClient;
use crate::config::ChainConfig;
use crate::contracts::MessageBridge;
use crate::error::{RelayError, RelayResult};
use crate::types::{DeliveryReceipt, RelayEvent};

/// Build a signing client for `config` and erase its provider type
pub fn connect(config: &ChainConfig, signer: PrivateKeySigner) -> RelayResult<Arc<dyn BridgeClient>> {
    let url = config.rpc_url.parse().map_err(|e| {
        RelayError::Configuration(format!(
            "invalid rpcUrl for chain {}: {}",
            config.chain_id, e
        ))
    })?;

    let provider = ProviderBuilder::new()
        .with_gas_estimation()
        .filler(NonceFiller::new(CachedNonceManager::default()))
        .filler(ChainIdFiller::new(Some(config.chain_id)))
        .wallet(EthereumWallet::from(signer))
        .on_http(url);

    Ok(Arc::new(EvmBridgeClient::new(provider, config)?))
}

/// Bridge client over an alloy provider
pub struct EvmBridgeClient<P> {
    chain_id: u64,
    bridge_address: Address,
    confirmations: u64,
    gas_limit: u64,
    provider: P,
    contract: MessageBridge::MessageBridgeInstance<Http<Client>, P>,
}

impl<P> EvmBridgeClient<P>
where
    P: Provider<Http<Client>> + Clone,
{
    pub fn new(provider: P, config: &ChainConfig) -> RelayResult<Self> {
        let bridge_address = config.bridge_address()?;
        let contract = MessageBridge::new(bridge_address, provider.clone());

        Ok(Self {
            chain_id: config.chain_id,
            bridge_address,
            confirmations: config.confirmations,
            gas_limit: config.gas_limit,
            provider,
            contract,
        })
    }
}

#[async_trait]
impl<P> BridgeClient for EvmBridgeClient<P>
where
    P: Provider<Http<Client>> + Clone + 'static,
{
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn bridge_address(&self) -> Address {
        self.bridge_address
    }

    async fn latest_block(&self) -> RelayResult<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(RelayError::rpc)
    }

    async fn message_sent_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> RelayResult<Vec<RelayEvent>> {
        let logs = self
            .contract
            .MessageSent_filter()
            .from_block(from_block)
            .to_block(to_block)
            .query()
            .await
            .map_err(RelayError::rpc)?;

        let mut events: Vec<RelayEvent> = logs
            .into_iter()
            .map(|(event, log)| RelayEvent {
                message_id: event.messageId,
                sender: event.sender,
                target: event.target,
                payload: event.data,
                nonce: event.nonce,
                source_chain_id: self.chain_id,
                block_number: log.block_number,
                tx_hash: log.transaction_hash,
                log_index: log.log_index,
            })
            .collect();
        events.sort_by_key(|e| (e.block_number, e.log_index));

        if !events.is_empty() {
            debug!(
                chain_id = self.chain_id,
                count = events.len(),
                from = from_block,
                to = to_block,
                "Found MessageSent events"
            );
        }

        Ok(events)
    }

    async fn is_message_processed(&self, message_id: B256) -> RelayResult<bool> {
        let processed = self
            .contract
            .isMessageProcessed(message_id)
            .call()
            .await
            .map_err(RelayError::rpc)?;
        Ok(processed._0)
    }

    async fn receive_message(
        &self,
        message_id: B256,
        sender: Address,
        target: Address,
        data: Bytes,
    ) -> RelayResult<DeliveryReceipt> {
        let pending_tx = self
            .contract
            .receiveMessage(message_id, sender, target, data)
            .gas(self.gas_limit)
            .send()
            .await
            .map_err(RelayError::rpc)?;

        let tx_hash = *pending_tx.tx_hash();
        info!(
            chain_id = self.chain_id,
            message_id = %message_id,
            tx_hash = %tx_hash,
            "Delivery transaction sent, waiting for confirmation"
        );

        let receipt = pending_tx
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .map_err(RelayError::rpc)?;

        Ok(DeliveryReceipt {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
            block_number: receipt.block_number,
        })
    }
}
