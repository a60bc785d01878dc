//! Tracing setup for binaries embedding the core.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the host process.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "study_core=info";

/// Install a global fmt subscriber filtered by `RUST_LOG`, else `default_filter`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_tracing("study_core=debug");
        assert!(!init_tracing("study_core=debug"));
        tracing::debug!("subscriber installed");
    }
}
