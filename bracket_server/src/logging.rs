//! Structured logging configuration.
//!
//! Engine records emitted through the `log` facade are picked up by the
//! subscriber's log bridge, so they share the same filter and format.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// # Example
///
/// ```no_run
/// use bracket_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a rejected engine mutation
///
/// Storage failures are server faults and logged as errors; everything else
/// is a client mistake worth a warning.
pub fn log_rejected_action(kind: &str, message: &str, server_fault: bool) {
    if server_fault {
        tracing::error!(error_kind = kind, "Engine failure: {}", message);
    } else {
        tracing::warn!(error_kind = kind, "Action rejected: {}", message);
    }
}

/// Log API request/response
pub fn log_api_request(request_id: &str, method: &str, path: &str, status_code: u16, duration_ms: u64) {
    tracing::info!(
        request_id = request_id,
        http_method = method,
        http_path = path,
        http_status = status_code,
        duration_ms = duration_ms,
        "Request completed"
    );
}
