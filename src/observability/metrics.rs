//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define relayer metrics (votes, finality cache, RPC failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `relayer_votes_total` (counter): votes broadcast by flow, chain and outcome
//! - `relayer_finality_cache_total` (counter): cache hits and misses by chain
//! - `relayer_finalized_height` (gauge): highest cached finalized block per chain
//! - `relayer_rpc_errors_total` (counter): failed chain queries by chain
//! - `relayer_notifications_total` (counter): inbound notifications by kind
//!
//! # Design Decisions
//! - Without an installed recorder every update is a no-op, so library code
//!   and tests record unconditionally

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// `outcome` is `events` or `empty`.
pub fn record_vote(flow: &'static str, chain: &str, outcome: &'static str) {
    metrics::counter!(
        "relayer_votes_total",
        "flow" => flow,
        "chain" => chain.to_lowercase(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_cache_lookup(chain: &str, hit: bool) {
    metrics::counter!(
        "relayer_finality_cache_total",
        "chain" => chain.to_lowercase(),
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

pub fn record_finalized_height(chain: &str, height: u64) {
    metrics::gauge!("relayer_finalized_height", "chain" => chain.to_lowercase()).set(height as f64);
}

pub fn record_rpc_error(chain: &str) {
    metrics::counter!("relayer_rpc_errors_total", "chain" => chain.to_lowercase()).increment(1);
}

pub fn record_notification(kind: &'static str) {
    metrics::counter!("relayer_notifications_total", "kind" => kind).increment(1);
}
