//! Relayer configuration
//!
//! Loaded once at startup from a JSON file (`relayer.config.json` by default)
//! with the signing key optionally supplied through the environment.
//! Any failure here is a `ConfigurationError` and aborts the process before a
//! single watcher starts.

use alloy::primitives::Address;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{RelayError, RelayResult};

pub const DEFAULT_CONFIG_PATH: &str = "relayer.config.json";
pub const CONFIG_PATH_ENV: &str = "RELAYER_CONFIG";
pub const PRIVATE_KEY_ENV: &str = "RELAYER_PRIVATE_KEY";

/// Main configuration for the relayer
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Signing key shared by both chains
    #[serde(default)]
    pub private_key: String,
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub relayer: RelayerConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("private_key", &"<redacted>")
            .field("chains", &self.chains)
            .field("relayer", &self.relayer)
            .field("api", &self.api)
            .finish()
    }
}

/// One side of the relayed pair
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Human-readable label for logs and metrics
    #[serde(default)]
    pub name: Option<String>,
    pub rpc_url: String,
    pub bridge_address: String,
    /// Carried for parity with the frontend configuration; unused by the relayer
    #[serde(default)]
    pub token_bridge_address: Option<String>,
    pub remote_chain_id: u64,
    /// Confirmations to wait for on delivery transactions
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Blocks behind head the watcher stays
    #[serde(default)]
    pub finality_blocks: u64,
    /// First block to scan; defaults to the chain head at startup
    #[serde(default)]
    pub start_block: Option<u64>,
}

impl ChainConfig {
    /// Label used in logs and metrics
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("chain-{}", self.chain_id))
    }

    /// Parsed bridge contract address
    pub fn bridge_address(&self) -> RelayResult<Address> {
        Address::from_str(&self.bridge_address).map_err(|e| {
            RelayError::Configuration(format!(
                "invalid bridge address for chain {}: {} ({})",
                self.chain_id, self.bridge_address, e
            ))
        })
    }
}

/// Watcher and lifecycle tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Maximum block span per log query
    #[serde(default = "default_max_block_range")]
    pub max_block_range: u64,
    /// Consecutive failed polls before a watcher declares its subscription lost
    #[serde(default = "default_max_poll_failures")]
    pub max_poll_failures: u32,
    /// How long shutdown waits for in-flight relays
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_block_range: default_max_block_range(),
            max_poll_failures: default_max_poll_failures(),
            shutdown_grace_ms: default_shutdown_grace(),
        }
    }
}

/// Health/metrics endpoint; disabled unless `listenAddr` is set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default)]
    pub listen_addr: Option<SocketAddr>,
}

/// Default functions
fn default_confirmations() -> u64 {
    1
}

fn default_gas_limit() -> u64 {
    500_000
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_max_block_range() -> u64 {
    2000
}

fn default_max_poll_failures() -> u32 {
    5
}

fn default_shutdown_grace() -> u64 {
    10_000
}

impl Config {
    /// Load configuration for the process.
    ///
    /// Path resolution: explicit argument, then `RELAYER_CONFIG`, then
    /// `relayer.config.json`. A `.env` file is honoured if present.
    pub fn load(path_arg: Option<String>) -> RelayResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }

        let path = resolve_config_path(path_arg);
        Self::load_from_file(&path)
    }

    /// Load from a specific JSON file, applying environment overrides
    pub fn load_from_file(path: &Path) -> RelayResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Configuration(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }

    /// Parse, apply environment overrides, and validate
    pub fn from_json(raw: &str) -> RelayResult<Self> {
        let mut config: Config = serde_json::from_str(raw)
            .map_err(|e| RelayError::Configuration(format!("malformed config: {}", e)))?;

        if let Ok(key) = env::var(PRIVATE_KEY_ENV) {
            if !key.trim().is_empty() {
                config.private_key = key.trim().to_string();
            }
        }
        config.private_key = normalize_private_key(&config.private_key);

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> RelayResult<()> {
        if self.private_key.is_empty() {
            return Err(RelayError::Configuration(
                "privateKey is required (or set RELAYER_PRIVATE_KEY)".to_string(),
            ));
        }
        let key_hex = self
            .private_key
            .strip_prefix("0x")
            .filter(|hex| hex.len() == 64);
        if key_hex.map_or(true, |hex| hex::decode(hex).is_err()) {
            return Err(RelayError::Configuration(
                "privateKey must be 32 bytes of hex (0x + 64 hex chars)".to_string(),
            ));
        }

        validate_pairing(&self.chains)?;

        for chain in &self.chains {
            if chain.rpc_url.trim().is_empty() {
                return Err(RelayError::Configuration(format!(
                    "rpcUrl cannot be empty for chain {}",
                    chain.chain_id
                )));
            }
            chain.bridge_address()?;
            if chain.confirmations == 0 {
                return Err(RelayError::Configuration(format!(
                    "confirmations must be at least 1 for chain {}",
                    chain.chain_id
                )));
            }
        }

        if self.relayer.poll_interval_ms == 0 {
            return Err(RelayError::Configuration(
                "relayer.pollIntervalMs must be greater than 0".to_string(),
            ));
        }
        if self.relayer.max_block_range == 0 {
            return Err(RelayError::Configuration(
                "relayer.maxBlockRange must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Check the two-chain invariant: exactly two entries, distinct ids, each
/// naming the other as its remote.
pub fn validate_pairing(chains: &[ChainConfig]) -> RelayResult<()> {
    if chains.len() != 2 {
        return Err(RelayError::Configuration(format!(
            "exactly two chains are required, found {}",
            chains.len()
        )));
    }

    let ids: HashSet<u64> = chains.iter().map(|c| c.chain_id).collect();
    if ids.len() != chains.len() {
        return Err(RelayError::Configuration(format!(
            "duplicate chain id {}",
            chains[0].chain_id
        )));
    }

    let (a, b) = (&chains[0], &chains[1]);
    if a.remote_chain_id != b.chain_id || b.remote_chain_id != a.chain_id {
        return Err(RelayError::Configuration(format!(
            "chains must reference each other: {} -> {}, {} -> {}",
            a.chain_id, a.remote_chain_id, b.chain_id, b.remote_chain_id
        )));
    }

    Ok(())
}

fn resolve_config_path(path_arg: Option<String>) -> PathBuf {
    path_arg
        .or_else(|| env::var(CONFIG_PATH_ENV).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Accept keys with or without the 0x prefix
fn normalize_private_key(key: &str) -> String {
    let key = key.trim();
    if key.is_empty() || key.starts_with("0x") {
        key.to_string()
    } else {
        format!("0x{}", key)
    }
}
