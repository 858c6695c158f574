//! Tracing/logging initialization.
//!
//! Logs are JSON lines with timestamps. `RUST_LOG` overrides the filter, e.g.
//! `RUST_LOG=stallboard_infra=debug` to see every refresh poll.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber, falling back to `default_filter`.
///
/// Returns false if a subscriber was already installed.
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .is_ok()
}
