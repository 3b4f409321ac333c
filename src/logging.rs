//! Tracing subscriber bootstrap
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the application. [`init`] is a convenience for binaries and
//! demos.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "trueno_lineage=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, or [`DEFAULT_FILTER`].
///
/// Returns `false` when a global subscriber was already installed, so calling
/// it more than once is harmless.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    init_with_filter(filter)
}

/// Install a fmt subscriber with an explicit filter.
pub fn init_with_filter(filter: EnvFilter) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
