//! Prometheus metrics for monitoring the bracket server.
//!
//! Metrics are exposed in Prometheus text format on a separate listener,
//! enabled with `METRICS_BIND`. Without an installed exporter every helper
//! here is a no-op.
//!
//! # Metrics
//!
//! - `http_requests_total`, `http_request_duration_ms`: by method, route and status
//! - `engine_actions_total`: accepted mutations by action and outcome
//! - `engine_errors_total`: rejected mutations by error kind
//! - `pipeline_advances_total`: by resulting pipeline status
//!
//! ```rust,no_run
//! use bracket_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//! metrics::http_requests_total("POST", "/api/v1/stages", 201);
//! ```

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus exporter with its own HTTP listener
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Engine Metrics
// ============================================================================

/// Count an accepted mutation; `outcome` separates applied from repeated actions
pub fn engine_actions_total(action: &'static str, outcome: &str) {
    metrics::counter!("engine_actions_total",
        "action" => action,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Count a rejected mutation by error kind
pub fn engine_errors_total(kind: &str) {
    metrics::counter!("engine_errors_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Count a pipeline advance
pub fn pipeline_advances_total(status: &str) {
    metrics::counter!("pipeline_advances_total",
        "status" => status.to_string()
    )
    .increment(1);
}
