//! In-memory bridge used by unit tests.
//!
//! `MockBridge` behaves like one bridge deployment: it holds a processed set,
//! reverts a second delivery of the same message, and serves scripted
//! `MessageSent` logs by block number.

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::chain::{BridgeClient, ChainEndpoint};
use crate::config::ChainConfig;
use crate::error::{RelayError, RelayResult};
use crate::registry::ChainRegistry;
use crate::types::{DeliveryReceipt, RelayEvent};

/// Arguments of one `receiveMessage` submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveCall {
    pub message_id: B256,
    pub sender: Address,
    pub target: Address,
    pub data: Bytes,
    pub tx_hash: TxHash,
    pub success: bool,
}

#[derive(Default)]
struct MockState {
    head: u64,
    events: Vec<RelayEvent>,
    processed: HashSet<B256>,
    calls: Vec<ReceiveCall>,
    queried_ranges: Vec<(u64, u64)>,
    revert_all: bool,
    rpc_failure: Option<String>,
    head_failures: u32,
    log_failures: u32,
}

pub struct MockBridge {
    chain_id: u64,
    bridge_address: Address,
    submit_delay: Duration,
    tx_counter: AtomicU64,
    state: Mutex<MockState>,
}

impl MockBridge {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            bridge_address: bridge_address_for(chain_id),
            submit_delay: Duration::ZERO,
            tx_counter: AtomicU64::new(1),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Delay between accepting a submission and settling it
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn set_head(&self, block: u64) {
        self.state.lock().unwrap().head = block;
    }

    /// Emit a `MessageSent` log at `block` and move the head there
    pub fn emit(&self, block: u64, mut event: RelayEvent) {
        let mut state = self.state.lock().unwrap();
        event.source_chain_id = self.chain_id;
        event.block_number = Some(block);
        event.log_index = Some(state.events.len() as u64);
        state.events.push(event);
        state.head = state.head.max(block);
    }

    pub fn mark_processed(&self, message_id: B256) {
        self.state.lock().unwrap().processed.insert(message_id);
    }

    pub fn set_revert_all(&self, revert: bool) {
        self.state.lock().unwrap().revert_all = revert;
    }

    /// Make every RPC call fail with `message` (None clears)
    pub fn set_rpc_failure(&self, message: Option<&str>) {
        self.state.lock().unwrap().rpc_failure = message.map(str::to_string);
    }

    /// Fail the next `count` head queries
    pub fn fail_next_head_queries(&self, count: u32) {
        self.state.lock().unwrap().head_failures = count;
    }

    /// Fail the next `count` log queries
    pub fn fail_next_log_queries(&self, count: u32) {
        self.state.lock().unwrap().log_failures = count;
    }

    pub fn calls(&self) -> Vec<ReceiveCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn queried_ranges(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().queried_ranges.clone()
    }

    pub fn is_processed(&self, message_id: &B256) -> bool {
        self.state.lock().unwrap().processed.contains(message_id)
    }

    /// Deliveries of `message_id` that were mined with success status
    pub fn successful_deliveries(&self, message_id: &B256) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| &c.message_id == message_id && c.success)
            .count()
    }

    fn check_rpc(&self) -> RelayResult<()> {
        match &self.state.lock().unwrap().rpc_failure {
            Some(message) => Err(RelayError::Rpc(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BridgeClient for MockBridge {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn bridge_address(&self) -> Address {
        self.bridge_address
    }

    async fn latest_block(&self) -> RelayResult<u64> {
        self.check_rpc()?;
        let mut state = self.state.lock().unwrap();
        if state.head_failures > 0 {
            state.head_failures -= 1;
            return Err(RelayError::Rpc("connection refused".to_string()));
        }
        Ok(state.head)
    }

    async fn message_sent_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> RelayResult<Vec<RelayEvent>> {
        self.check_rpc()?;
        let mut state = self.state.lock().unwrap();
        if state.log_failures > 0 {
            state.log_failures -= 1;
            return Err(RelayError::Rpc("filter not found".to_string()));
        }
        state.queried_ranges.push((from_block, to_block));
        Ok(state
            .events
            .iter()
            .filter(|e| {
                e.block_number
                    .is_some_and(|b| b >= from_block && b <= to_block)
            })
            .cloned()
            .collect())
    }

    async fn is_message_processed(&self, message_id: B256) -> RelayResult<bool> {
        self.check_rpc()?;
        Ok(self.state.lock().unwrap().processed.contains(&message_id))
    }

    async fn receive_message(
        &self,
        message_id: B256,
        sender: Address,
        target: Address,
        data: Bytes,
    ) -> RelayResult<DeliveryReceipt> {
        self.check_rpc()?;
        let tx_hash = TxHash::from(U256::from(
            self.tx_counter.fetch_add(1, Ordering::SeqCst),
        ));

        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }

        let mut state = self.state.lock().unwrap();
        // Contract semantics: a processed message reverts
        let success = !state.revert_all && !state.processed.contains(&message_id);
        if success {
            state.processed.insert(message_id);
        }
        state.calls.push(ReceiveCall {
            message_id,
            sender,
            target,
            data,
            tx_hash,
            success,
        });

        Ok(DeliveryReceipt {
            tx_hash,
            success,
            block_number: Some(state.head + 1),
        })
    }
}

/// Deterministic bridge address for a mock chain
pub fn bridge_address_for(chain_id: u64) -> Address {
    Address::from_word(B256::from(U256::from(0xb000_0000u64 + chain_id)))
}

pub fn chain_config(chain_id: u64, remote_chain_id: u64) -> ChainConfig {
    ChainConfig {
        chain_id,
        name: None,
        rpc_url: format!("http://localhost:{}", 8000 + chain_id % 1000),
        bridge_address: bridge_address_for(chain_id).to_string(),
        token_bridge_address: None,
        remote_chain_id,
        confirmations: 1,
        gas_limit: 500_000,
        finality_blocks: 0,
        start_block: None,
    }
}

/// Registry over two mock bridges (97 <-> 17000)
pub fn mock_registry() -> (ChainRegistry, Arc<MockBridge>, Arc<MockBridge>) {
    mock_registry_with(MockBridge::new(97), MockBridge::new(17000))
}

pub fn mock_registry_with(
    a: MockBridge,
    b: MockBridge,
) -> (ChainRegistry, Arc<MockBridge>, Arc<MockBridge>) {
    let a = Arc::new(a);
    let b = Arc::new(b);
    let registry = ChainRegistry::new(vec![
        ChainEndpoint::new(chain_config(a.chain_id, b.chain_id), a.clone()),
        ChainEndpoint::new(chain_config(b.chain_id, a.chain_id), b.clone()),
    ])
    .unwrap();
    (registry, a, b)
}

/// The `0xabc…` message from chain 97 used across tests
pub fn sample_event() -> RelayEvent {
    let mut message_id = [0u8; 32];
    message_id[0] = 0xab;
    message_id[1] = 0xc0;
    RelayEvent {
        message_id: B256::from(message_id),
        sender: Address::repeat_byte(0x11),
        target: Address::repeat_byte(0x22),
        payload: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
        nonce: U256::from(5),
        source_chain_id: 97,
        block_number: None,
        tx_hash: None,
        log_index: None,
    }
}

/// A distinct event for `nonce`
pub fn event_with_nonce(nonce: u64) -> RelayEvent {
    let mut event = sample_event();
    event.message_id = B256::from(U256::from(0xabc0_0000u64 + nonce));
    event.nonce = U256::from(nonce);
    event
}
