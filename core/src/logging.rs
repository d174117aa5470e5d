//! Structured logging, shared by every service binary.
//!
//! JSON output to stderr, filtered by `RUST_LOG` (default `info`). Every
//! service calls [`init`] once at startup; there is no file rotation
//! here (unlike the teacher's supervisor daemon) since these are
//! containerized services expected to ship stdout/stderr to a log
//! collector rather than manage their own log files.

use tracing_subscriber::EnvFilter;

/// Initialize process-wide structured logging.
pub fn init(service_name: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_current_span(true)
        .with_target(true)
        .init();

    tracing::info!(service = service_name, "logging initialized");
}
