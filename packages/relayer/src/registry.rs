//! Chain registry
//!
//! Immutable after construction: exactly two endpoints that name each other
//! as remote. Lookups are read-only and lock-free.

use alloy::signers::local::PrivateKeySigner;

use crate::chain::ChainEndpoint;
use crate::config::{self, Config};
use crate::error::{RelayError, RelayResult};

#[derive(Debug, Clone)]
pub struct ChainRegistry {
    endpoints: [ChainEndpoint; 2],
}

impl ChainRegistry {
    /// Build from already-connected endpoints, failing fast unless they form
    /// a symmetric pair.
    pub fn new(endpoints: Vec<ChainEndpoint>) -> RelayResult<Self> {
        let configs: Vec<_> = endpoints.iter().map(|e| e.config().clone()).collect();
        config::validate_pairing(&configs)?;

        for endpoint in &endpoints {
            if endpoint.client().chain_id() != endpoint.chain_id() {
                return Err(RelayError::Configuration(format!(
                    "client for chain {} reports chain {}",
                    endpoint.chain_id(),
                    endpoint.client().chain_id()
                )));
            }
        }

        let endpoints: [ChainEndpoint; 2] = endpoints.try_into().map_err(|_| {
            RelayError::Configuration("exactly two chains are required".to_string())
        })?;
        Ok(Self { endpoints })
    }

    /// Connect both configured chains with the shared signing key
    pub fn connect(config: &Config) -> RelayResult<Self> {
        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .map_err(|e| RelayError::Configuration(format!("invalid private key: {}", e)))?;

        tracing::info!(relayer_address = %signer.address(), "Loaded signing key");

        let endpoints = config
            .chains
            .iter()
            .map(|chain| ChainEndpoint::connect(chain, &signer))
            .collect::<RelayResult<Vec<_>>>()?;

        Self::new(endpoints)
    }

    /// Endpoint of the chain paired with `chain_id`
    pub fn resolve_pair(&self, chain_id: u64) -> RelayResult<&ChainEndpoint> {
        let source = self.endpoint(chain_id)?;
        self.endpoint(source.remote_chain_id())
    }

    /// Endpoint for `chain_id` itself
    pub fn endpoint(&self, chain_id: u64) -> RelayResult<&ChainEndpoint> {
        self.endpoints
            .iter()
            .find(|e| e.chain_id() == chain_id)
            .ok_or(RelayError::UnknownChain(chain_id))
    }

    /// Both endpoints, in configuration order
    pub fn all(&self) -> &[ChainEndpoint] {
        &self.endpoints
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        self.endpoints.iter().map(|e| e.chain_id()).collect()
    }
}
