//! Tracing subscriber setup.

use finboard_settings::LoggingSettings;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr; stdout carries
/// command output only.
///
/// `RUST_LOG` wins over the configured level.
pub fn init(settings: &LoggingSettings, force_json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if settings.json || force_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
