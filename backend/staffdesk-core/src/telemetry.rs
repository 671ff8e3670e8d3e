// src/telemetry.rs
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// Filter from `RUST_LOG`, falling back to the configured level.
pub fn env_filter(settings: &Settings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global fmt subscriber. Returns false if one was already set,
/// so hosts and tests can call this more than once.
pub fn init_tracing(settings: &Settings) -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(settings))
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        debug!("Tracing initialised (fallback level {})", settings.log_level);
    }
    installed
}
