//! Tracing/logging initialization.
//!
//! JSON lines on stdout. Security-relevant events (refresh credential reuse,
//! access denials) are emitted with target `security`, so the target is kept
//! in the output and can be filtered on, e.g. `RUST_LOG=info,security=warn`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = env_filter(std::env::var("RUST_LOG").ok().as_deref());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init();
}

/// Build the filter from a `RUST_LOG`-style directive string, falling back to
/// [`DEFAULT_FILTER`].
pub fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
