//! Logging setup on `tracing-subscriber`.
//!
//! `RUST_LOG` overrides the default filter, e.g. `RUST_LOG=manifest_bulk=debug`.
//! Output goes to stderr so the CLI can keep stdout for result JSON.

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.
pub fn init() {
    init_with_default(DEFAULT_FILTER);
}

/// Install the global subscriber with a fallback filter for when `RUST_LOG`
/// is unset. Calling it twice is a no-op.
pub fn init_with_default(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Subscriber for tests, captured by the test harness.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
