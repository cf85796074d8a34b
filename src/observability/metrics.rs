//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ip_rules_skipped_total` (counter): IP rules dropped as invalid
//! - `remote_config_applied_total` (counter): configurations swapped in
//! - `remote_config_rejected_total` (counter): payloads that failed to decode
//! - `shutdown_triggered_total` (counter): shutdown gate closures
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus endpoint is optional

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_skipped_ip_rules(count: usize) {
    if count > 0 {
        metrics::counter!("ip_rules_skipped_total").increment(count as u64);
    }
}

pub fn record_config_applied() {
    metrics::counter!("remote_config_applied_total").increment(1);
}

pub fn record_config_rejected() {
    metrics::counter!("remote_config_rejected_total").increment(1);
}

pub fn record_shutdown_triggered() {
    metrics::counter!("shutdown_triggered_total").increment(1);
}
