use campusflow_core::config::{LogFormat, LoggingConfig};
use tracing::Level;

/// Installs the global subscriber. Output goes to stderr so command payloads on
/// stdout stay machine-readable. A second call is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    let (level, format) = subscriber_settings(config);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub(crate) fn subscriber_settings(config: &LoggingConfig) -> (Level, LogFormat) {
    (config.level.trim().parse::<Level>().unwrap_or(Level::INFO), config.format)
}
