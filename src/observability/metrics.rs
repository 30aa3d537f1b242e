//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status
//! - `proxy_request_duration_seconds` (histogram): time until response headers
//! - `proxy_html_rewrites_total` (counter): rewrite outcomes
//! - `proxy_rate_limited_total` (counter): requests rejected by the limiter
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// `outcome` is one of `rewritten`, `fallback`, `oversized`.
pub fn record_rewrite(outcome: &'static str) {
    metrics::counter!("proxy_html_rewrites_total", "outcome" => outcome).increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!("proxy_rate_limited_total").increment(1);
}
