//! Metrics collection and exposition.
//!
//! # Metrics
//! - `intake_requests_total` (counter): requests by route, status
//! - `intake_request_duration_seconds` (histogram): latency by route
//! - `intake_rate_limited_total` (counter): denials by route
//! - `intake_rate_limit_entries` (gauge): identifiers tracked by the limiter
//! - `intake_leads_total` (counter): accepted leads by kind
//! - `intake_lead_delivery_failures_total` (counter): relays that gave up
//!
//! Recording is a no-op until a recorder is installed, so tests never need one.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    counter!("intake_requests_total", "route" => route, "status" => status.to_string()).increment(1);
    histogram!("intake_request_duration_seconds", "route" => route).record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(route: &'static str) {
    counter!("intake_rate_limited_total", "route" => route).increment(1);
}

pub fn record_rate_limit_entries(tracked: usize) {
    gauge!("intake_rate_limit_entries").set(tracked as f64);
}

pub fn record_lead(kind: &'static str) {
    counter!("intake_leads_total", "kind" => kind).increment(1);
}

pub fn record_delivery_failure() {
    counter!("intake_lead_delivery_failures_total").increment(1);
}
