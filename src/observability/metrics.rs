//! Metrics collection and exposition.
//!
//! # Metrics
//! - `exproute_lookups_total` (counter): lookups by `result` (hit, miss)
//! - `exproute_mutations_total` (counter): tree changes by `op`, `result`
//! - `exproute_routes` (gauge): routes reachable in the live tree
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus endpoint is optional and off by default

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

pub const LOOKUPS_TOTAL: &str = "exproute_lookups_total";
pub const MUTATIONS_TOTAL: &str = "exproute_mutations_total";
pub const ROUTES: &str = "exproute_routes";

/// Serve Prometheus metrics on `addr`. Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!(LOOKUPS_TOTAL, "result" => result).increment(1);
}

pub fn record_mutation(op: &'static str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    metrics::counter!(MUTATIONS_TOTAL, "op" => op, "result" => result).increment(1);
}

pub fn set_route_count(count: usize) {
    metrics::gauge!(ROUTES).set(count as f64);
}
