//! Prometheus metrics.
//!
//! When `METRICS_BIND` is set the exporter serves `/metrics` on that
//! address. Without an installed recorder every call here is a no-op, so
//! handlers record unconditionally.
//!
//! ```rust,no_run
//! use ss_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr = SocketAddr::from(([127, 0, 0, 1], 9090));
//! metrics::init_metrics(addr).unwrap();
//! metrics::http_requests_total("POST", "/api/v1/auth/login", 200);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))
}

// HTTP

/// Count a served request. `path` is the route template, not the raw URI.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// Database

/// Connections currently held by the pool.
pub fn db_connections_active(count: u32) {
    metrics::gauge!("db_connections_active").set(f64::from(count));
}

// Auth

pub fn login_attempts_total(success: bool) {
    metrics::counter!("login_attempts_total",
        "success" => success.to_string()
    )
    .increment(1);
}

pub fn rate_limit_hits_total(endpoint: &str) {
    metrics::counter!("rate_limit_hits_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

// Competition

/// Count an approve/reject decision, labelled with the resulting status.
pub fn registration_decisions_total(status: &str) {
    metrics::counter!("registration_decisions_total",
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn scores_submitted_total() {
    metrics::counter!("scores_submitted_total").increment(1);
}

/// Add the number of matches created by one generation request.
pub fn matches_generated_total(count: usize) {
    metrics::counter!("matches_generated_total").increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        http_requests_total("GET", "/api/v1/teams", 200);
        http_request_duration_ms("GET", "/api/v1/teams", 1.5);
        registration_decisions_total("approved");
        matches_generated_total(6);
        scores_submitted_total();
    }
}
