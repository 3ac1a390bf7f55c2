//! Configuration loading and registry construction from configuration files.
//!
//! None of these tests need a running chain: connecting a chain only builds
//! the provider stack, it does not issue RPC calls.

use alloy::primitives::Address;
use bridge_relayer::config::{CONFIG_PATH_ENV, PRIVATE_KEY_ENV};
use bridge_relayer::{ChainRegistry, Config, RelayError, Relayer};
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;

const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
const OTHER_KEY: &str = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

const BSC_BRIDGE: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
const HOLESKY_BRIDGE: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";

fn config_json(private_key: &str, remote_of_second: u64) -> String {
    format!(
        r#"{{
  "privateKey": "{private_key}",
  "chains": [
    {{
      "chainId": 97,
      "name": "bsc-testnet",
      "rpcUrl": "http://localhost:8545",
      "bridgeAddress": "{BSC_BRIDGE}",
      "tokenBridgeAddress": "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0",
      "remoteChainId": 17000
    }},
    {{
      "chainId": 17000,
      "rpcUrl": "http://localhost:8546",
      "bridgeAddress": "{HOLESKY_BRIDGE}",
      "tokenBridgeAddress": "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9",
      "remoteChainId": {remote_of_second},
      "confirmations": 3,
      "finalityBlocks": 2
    }}
  ],
  "relayer": {{ "pollIntervalMs": 250 }}
}}"#
    )
}

/// Write `contents` to a unique file under the system temp dir
fn write_temp_config(name: &str, contents: &str) -> PathBuf {
    let path = env::temp_dir().join(format!(
        "bridge-relayer-{}-{}.json",
        name,
        std::process::id()
    ));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
#[serial]
fn test_load_from_file_applies_defaults() {
    env::remove_var(PRIVATE_KEY_ENV);
    let path = write_temp_config("defaults", &config_json(KEY, 97));

    let config = Config::load_from_file(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(config.chains.len(), 2);
    let (bsc, holesky) = (&config.chains[0], &config.chains[1]);

    assert_eq!(bsc.chain_id, 97);
    assert_eq!(bsc.label(), "bsc-testnet");
    assert_eq!(bsc.remote_chain_id, 17000);
    assert_eq!(bsc.confirmations, 1);
    assert_eq!(bsc.gas_limit, 500_000);
    assert_eq!(bsc.start_block, None);
    assert!(bsc.token_bridge_address.is_some());

    assert_eq!(holesky.label(), "chain-17000");
    assert_eq!(holesky.confirmations, 3);
    assert_eq!(holesky.finality_blocks, 2);

    assert_eq!(config.relayer.poll_interval_ms, 250);
    assert_eq!(config.relayer.max_block_range, 2000);
    assert_eq!(config.relayer.shutdown_grace_ms, 10_000);
    assert!(config.api.listen_addr.is_none());
}

#[test]
#[serial]
fn test_env_private_key_overrides_file() {
    env::set_var(PRIVATE_KEY_ENV, OTHER_KEY);
    let result = Config::from_json(&config_json(KEY, 97));
    env::remove_var(PRIVATE_KEY_ENV);

    assert_eq!(result.unwrap().private_key, OTHER_KEY);
}

#[test]
#[serial]
fn test_env_private_key_fills_missing_key() {
    env::set_var(PRIVATE_KEY_ENV, OTHER_KEY.trim_start_matches("0x"));
    let result = Config::from_json(&config_json("", 97));
    env::remove_var(PRIVATE_KEY_ENV);

    assert_eq!(result.unwrap().private_key, OTHER_KEY);
}

#[test]
#[serial]
fn test_missing_key_is_configuration_error() {
    env::remove_var(PRIVATE_KEY_ENV);
    let result = Config::from_json(&config_json("", 97));
    assert!(matches!(result, Err(RelayError::Configuration(_))));
}

#[test]
#[serial]
fn test_non_mutual_pairing_fails_before_connecting() {
    env::remove_var(PRIVATE_KEY_ENV);
    let result = Config::from_json(&config_json(KEY, 7863));
    assert!(matches!(result, Err(RelayError::Configuration(_))));
}

#[test]
#[serial]
fn test_malformed_file_is_configuration_error() {
    env::remove_var(PRIVATE_KEY_ENV);
    let path = write_temp_config("malformed", r#"{ "privateKey": "0x01", "chains": "#);
    let result = Config::load_from_file(&path);
    fs::remove_file(&path).ok();

    match result {
        Err(RelayError::Configuration(msg)) => assert!(msg.contains("malformed config")),
        other => panic!("expected configuration error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_missing_file_is_configuration_error() {
    let path = env::temp_dir().join("bridge-relayer-does-not-exist.json");
    let result = Config::load_from_file(&path);
    assert!(matches!(result, Err(RelayError::Configuration(_))));
}

#[test]
#[serial]
fn test_load_uses_config_path_env() {
    env::remove_var(PRIVATE_KEY_ENV);
    let path = write_temp_config("env-path", &config_json(KEY, 97));
    env::set_var(CONFIG_PATH_ENV, &path);

    let result = Config::load(None);
    env::remove_var(CONFIG_PATH_ENV);
    fs::remove_file(&path).ok();

    assert_eq!(result.unwrap().chains[0].chain_id, 97);
}

#[test]
#[serial]
fn test_registry_connects_from_config() {
    env::remove_var(PRIVATE_KEY_ENV);
    let config = Config::from_json(&config_json(KEY, 97)).unwrap();

    let registry = ChainRegistry::connect(&config).unwrap();

    assert_eq!(registry.chain_ids(), vec![97, 17000]);
    let dest = registry.resolve_pair(97).unwrap();
    assert_eq!(dest.chain_id(), 17000);
    assert_eq!(
        dest.bridge_address(),
        HOLESKY_BRIDGE.parse::<Address>().unwrap()
    );
    assert_eq!(registry.resolve_pair(17000).unwrap().chain_id(), 97);
    assert!(matches!(
        registry.resolve_pair(1),
        Err(RelayError::UnknownChain(1))
    ));
}

#[test]
#[serial]
fn test_relayer_from_config_starts_idle() {
    env::remove_var(PRIVATE_KEY_ENV);
    let config = Config::from_json(&config_json(KEY, 97)).unwrap();
    let registry = ChainRegistry::connect(&config).unwrap();
    let relayer = Relayer::new(registry, config.relayer.clone());

    assert!(!relayer.is_running());
    assert_eq!(tokio_test::block_on(relayer.in_flight()), 0);

    // Shutting down a relayer that never started is a no-op
    tokio_test::block_on(relayer.shutdown());
    assert!(!relayer.is_running());
}
