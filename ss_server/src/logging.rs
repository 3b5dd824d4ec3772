//! Structured logging.
//!
//! The server logs through `tracing`; the library crate logs through the
//! `log` facade, which `tracing-subscriber` picks up once [`init`] has run.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// # Example
///
/// ```no_run
/// use ss_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Log a security-relevant event: failed logins, denied writes, rate limiting.
///
/// # Example
///
/// ```
/// use ss_server::logging::log_security_event;
///
/// log_security_event(
///     "failed_login",
///     Some(123),
///     Some("192.168.1.1"),
///     "Incorrect password",
/// );
/// ```
pub fn log_security_event(
    event_type: &str,
    user_id: Option<i64>,
    ip_address: Option<&str>,
    message: &str,
) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        ip_address = ip_address,
        "SECURITY: {}",
        message
    );
}

/// Log a timed database operation; anything over 100 ms is a warning.
pub fn log_database_operation(operation: &str, target: &str, duration_ms: u64) {
    if duration_ms > 100 {
        tracing::warn!(
            operation = operation,
            target = target,
            duration_ms = duration_ms,
            "Slow database operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            target = target,
            duration_ms = duration_ms,
            "Database operation"
        );
    }
}
