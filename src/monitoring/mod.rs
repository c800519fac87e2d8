use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{QuoteError, Result};

/// File name prefix of the daily rolling log.
pub const LOG_FILE_NAME: &str = "titan-quote.log";

/// Initializes the logging system (both console and file).
/// Returns a guard that must be kept alive for file logging to work.
pub fn init_logging(log_dir: &str, file_level: &str, console_level: &str) -> Result<WorkerGuard> {
    let log_path = Path::new(log_dir);
    if !log_path.exists() {
        std::fs::create_dir_all(log_path)?;
    }

    // --- File Logger ---
    let file_appender = rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = EnvFilter::try_new(file_level).map_err(|e| {
        QuoteError::InvalidConfig(format!("Invalid file log level filter '{}': {}", file_level, e))
    })?;
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_appender)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .json()
        .with_filter(file_filter);

    // --- Console Logger ---
    // Stderr, so stdout carries only the quote.
    let console_filter = EnvFilter::try_new(console_level).map_err(|e| {
        QuoteError::InvalidConfig(format!(
            "Invalid console log level filter '{}': {}",
            console_level, e
        ))
    })?;
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            QuoteError::InternalError(format!("Failed to initialize tracing subscriber: {}", e))
        })?;

    Ok(guard)
}

/// Console filter: `RUST_LOG` when set, else `default`.
pub fn console_filter_from_env(default: &str) -> String {
    std::env::var("RUST_LOG")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_rejected_before_install() {
        let dir = std::env::temp_dir().join("titan-quote-log-test");
        let err = init_logging(dir.to_str().unwrap(), "titan_quote=loud", "info").unwrap_err();
        assert!(matches!(err, QuoteError::InvalidConfig(_)));
    }
}
