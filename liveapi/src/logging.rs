//! Structured logging setup.
//!
//! liveapi emits `tracing` events; installing a subscriber is up to the host.
//! These helpers install a registry with an `EnvFilter` (from `RUST_LOG`,
//! falling back to the given level) and an fmt layer.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// # Panics
///
/// Panics if a global subscriber is already installed; see [`try_init`].
pub fn init(default_level: &str) {
    subscriber(default_level).init();
}

/// Install the global subscriber unless one is already installed.
///
/// Returns `false` when another subscriber was already in place.
pub fn try_init(default_level: &str) -> bool {
    subscriber(default_level).try_init().is_ok()
}

fn subscriber(default_level: &str) -> impl SubscriberInitExt {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
}
