//! Metrics collection and exposition.
//!
//! # Metrics
//! - `probe_requests_total` (counter): finished probes by method, alive
//! - `probe_attempts_total` (counter): single attempts by method, result
//! - `probe_rtt_ms` (histogram): round-trip time of successful probes
//! - `probe_tier_total` (counter): probes by resulting tier
//! - `settings_updates_total` (counter): accepted settings swaps by source

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::probe::{LatencyTier, ProbeMethod};

/// Start the Prometheus scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_attempt(method: ProbeMethod, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("probe_attempts_total", "method" => method.as_str(), "result" => result).increment(1);
}

pub fn record_probe(method: ProbeMethod, alive: bool, tier: LatencyTier, elapsed_ms: Option<u64>) {
    let alive_label = if alive { "true" } else { "false" };
    counter!("probe_requests_total", "method" => method.as_str(), "alive" => alive_label)
        .increment(1);
    counter!("probe_tier_total", "tier" => tier.as_str()).increment(1);
    if let Some(ms) = elapsed_ms {
        histogram!("probe_rtt_ms", "method" => method.as_str()).record(ms as f64);
    }
}

pub fn record_settings_update(source: &'static str) {
    counter!("settings_updates_total", "source" => source).increment(1);
}
