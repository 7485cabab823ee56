//! Console logging for the worker.
//!
//! - Pulls filtering rules from `RUST_LOG` or defaults to `info`.
//! - Includes thread ID, file, and line number for traceability.
//! - Timestamped using local time (RFC 3339 format).

use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global `tracing` subscriber.
pub fn init_tracing() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(fmt::time::ChronoLocal::rfc_3339())
        .pretty()
        .init();
}
