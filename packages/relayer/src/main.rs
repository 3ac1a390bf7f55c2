//! Bridge Relayer
//!
//! Relays messages between a fixed pair of EVM bridge contracts: every
//! `MessageSent` on one chain becomes a `receiveMessage` call on the other,
//! unless the destination already marks the message as processed.
//!
//! Usage: `bridge-relayer [config.json]`. Without an argument the path comes
//! from `RELAYER_CONFIG`, then `relayer.config.json`.
//!
//! Exit codes: 0 after a signal-driven shutdown, 1 on invalid configuration
//! or when a chain's watcher stops.

use std::sync::Arc;
use tracing::info;

use bridge_relayer::{api, ChainRegistry, Config, Relayer};

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    info!("Starting Bridge Relayer");

    let config = Config::load(std::env::args().nth(1))?;
    info!(
        chains = ?config.chains.iter().map(|c| c.chain_id).collect::<Vec<_>>(),
        poll_interval_ms = config.relayer.poll_interval_ms,
        "Configuration loaded"
    );

    let registry = ChainRegistry::connect(&config)?;
    let relayer = Arc::new(Relayer::new(registry, config.relayer.clone()));

    if let Some(addr) = config.api.listen_addr {
        let api_relayer = relayer.clone();
        tokio::spawn(async move {
            if let Err(e) = api::start_api_server(addr, api_relayer).await {
                tracing::error!(error = %e, "API server error");
            }
        });
    }

    relayer.start().await;
    relayer.run_until(wait_for_shutdown_signal()).await?;

    info!("Bridge Relayer stopped");
    Ok(())
}

/// Initialize tracing to stdout. `LOG_FORMAT=json` switches to JSON lines.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridge_relayer=debug"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
