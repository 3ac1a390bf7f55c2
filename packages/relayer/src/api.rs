//! Health & Status API endpoints
//!
//! Provides HTTP endpoints for monitoring and status:
//! - GET /health - Simple health check
//! - GET /metrics - Prometheus metrics
//! - GET /status - Running flag, uptime, in-flight relays and chain pairing

use eyre::Result;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::lifecycle::Relayer;

/// Status response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub running: bool,
    pub uptime_seconds: u64,
    pub in_flight_relays: usize,
    pub chains: Vec<ChainStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub chain_id: u64,
    pub name: String,
    pub remote_chain_id: u64,
    pub bridge_address: String,
}

/// Start the API server
pub async fn start_api_server(addr: SocketAddr, relayer: Arc<Relayer>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server started");

    loop {
        let (mut socket, _) = listener.accept().await?;
        let relayer = relayer.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(&mut socket, &relayer).await {
                tracing::debug!(error = %e, "API connection error");
            }
        });
    }
}

async fn handle_connection<S>(socket: &mut S, relayer: &Relayer) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 1024];
    let n = socket.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let response = route(request.lines().next().unwrap_or_default(), relayer).await;
    socket.write_all(&response).await?;
    socket.flush().await?;
    Ok(())
}

async fn route(request_line: &str, relayer: &Relayer) -> Vec<u8> {
    let path = match request_line.split_whitespace().collect::<Vec<_>>()[..] {
        ["GET", path, ..] => path,
        _ => return not_found(),
    };

    match path {
        "/health" => respond("text/plain", b"OK".to_vec()),
        "/metrics" => {
            let encoder = TextEncoder::new();
            let mut buffer = Vec::new();
            let _ = encoder.encode(&prometheus::gather(), &mut buffer);
            respond("text/plain; charset=utf-8", buffer)
        }
        "/status" => {
            let status = build_status_response(relayer).await;
            let body = serde_json::to_vec(&status).unwrap_or_else(|_| b"{}".to_vec());
            respond("application/json", body)
        }
        _ => not_found(),
    }
}

pub async fn build_status_response(relayer: &Relayer) -> StatusResponse {
    let chains = relayer
        .registry()
        .all()
        .iter()
        .map(|e| ChainStatus {
            chain_id: e.chain_id(),
            name: e.label(),
            remote_chain_id: e.remote_chain_id(),
            bridge_address: e.bridge_address().to_string(),
        })
        .collect();

    let running = relayer.is_running();
    StatusResponse {
        status: if running { "ok" } else { "stopped" }.to_string(),
        running,
        uptime_seconds: relayer.uptime().as_secs(),
        in_flight_relays: relayer.in_flight().await,
        chains,
    }
}

fn respond(content_type: &str, body: Vec<u8>) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        content_type,
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(&body);
    response
}

fn not_found() -> Vec<u8> {
    b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec()
}
