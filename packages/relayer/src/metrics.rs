//! Prometheus metrics for the bridge relayer
//!
//! Exposed on /metrics when the API endpoint is enabled.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec, CounterVec,
    Gauge, GaugeVec, HistogramVec,
};

lazy_static! {
    pub static ref EVENTS_DETECTED: CounterVec = register_counter_vec!(
        "relayer_events_detected_total",
        "Total number of MessageSent events detected",
        &["chain"]
    ).unwrap();

    pub static ref RELAYS: CounterVec = register_counter_vec!(
        "relayer_relays_total",
        "Relay attempts by terminal outcome",
        &["source", "dest", "outcome"]
    ).unwrap();

    pub static ref RELAY_LATENCY: HistogramVec = register_histogram_vec!(
        "relayer_relay_latency_seconds",
        "Time from dispatch to terminal outcome",
        &["dest"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    pub static ref IN_FLIGHT: Gauge = register_gauge!(
        "relayer_in_flight_relays",
        "Relay tasks currently running"
    ).unwrap();

    pub static ref LATEST_BLOCK: GaugeVec = register_gauge_vec!(
        "relayer_latest_block",
        "Latest block scanned by the watcher",
        &["chain"]
    ).unwrap();

    pub static ref WATCHER_UP: GaugeVec = register_gauge_vec!(
        "relayer_watcher_up",
        "Whether the chain's watcher is running",
        &["chain"]
    ).unwrap();

    pub static ref UP: Gauge = register_gauge!(
        "relayer_up",
        "Whether the relayer is up and running"
    ).unwrap();
}

pub fn record_event_detected(chain_id: u64) {
    EVENTS_DETECTED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

/// Record a relay's terminal outcome and its latency
pub fn record_relay(source: u64, dest: Option<u64>, outcome: &str, seconds: f64) {
    let dest = dest.map_or_else(|| "unknown".to_string(), |d| d.to_string());
    RELAYS
        .with_label_values(&[&source.to_string(), &dest, outcome])
        .inc();
    RELAY_LATENCY.with_label_values(&[&dest]).observe(seconds);
}

pub fn set_in_flight(count: usize) {
    IN_FLIGHT.set(count as f64);
}

pub fn set_latest_block(chain_id: u64, block: u64) {
    LATEST_BLOCK
        .with_label_values(&[&chain_id.to_string()])
        .set(block as f64);
}

pub fn set_watcher_up(chain_id: u64, up: bool) {
    WATCHER_UP
        .with_label_values(&[&chain_id.to_string()])
        .set(if up { 1.0 } else { 0.0 });
}

pub fn set_up(up: bool) {
    UP.set(if up { 1.0 } else { 0.0 });
}
