//! Utilities for logging.
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    /// Human readable, single line per event.
    #[default]
    Compact,
    /// One json object per event.
    Json,
}

/// Build an env filter defaulting to `default_level` when `RUST_LOG` isn't
/// set.
fn env_filter(default_level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

/// Configure the global subscriber.
///
/// Only the first call has any effect. Later calls are silently ignored so
/// that embedding applications can set up their own subscriber first.
pub fn configure_global_logger(default_level: Level, mode: LoggingMode) {
    let builder = FmtSubscriber::builder()
        .with_env_filter(env_filter(default_level))
        .with_file(true)
        .with_line_number(true);

    let _ = match mode {
        LoggingMode::Compact => {
            tracing::subscriber::set_global_default(builder.compact().finish())
        }
        LoggingMode::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
}

/// Initialize logging for tests.
///
/// Output goes through the test writer so it's captured per test.
pub fn init_test() {
    let subscriber = FmtSubscriber::builder()
        .with_test_writer()
        .with_env_filter(env_filter(Level::DEBUG))
        .with_file(true)
        .with_line_number(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_multiple_times() {
        init_test();
        init_test();
        configure_global_logger(Level::INFO, LoggingMode::Json);
        tracing::debug!(attempt = 3, "logger still usable");
    }
}
