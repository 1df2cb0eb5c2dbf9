//! Process-wide `tracing` subscriber setup for binaries and tests.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Installs a fmt subscriber. `RUST_LOG` wins over the configured level.
/// Calling it twice is harmless; the second call is ignored.
pub fn init(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if settings.json { builder.json().try_init() } else { builder.try_init() };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
