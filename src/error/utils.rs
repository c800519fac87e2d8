use super::QuoteError;
use tracing::{error, warn};

/// Logs an error with appropriate severity based on the error type.
///
/// Per-attempt failures are expected during failover and log at warn;
/// everything else logs at error.
///
/// # Arguments
/// * `error` - The QuoteError to log
/// * `context` - Additional context about where/how the error occurred
pub fn log_error(error: &QuoteError, context: &str) {
    match error {
        QuoteError::Timeout(msg) => {
            warn!(kind = "timeout", "{} - Timeout: {}", context, msg);
        }
        QuoteError::Transport(msg) => {
            warn!(kind = "transport", "{} - Transport error: {}", context, msg);
        }
        QuoteError::Protocol(msg) => {
            warn!(kind = "protocol", "{} - Protocol error: {}", context, msg);
        }
        QuoteError::Normalization { kind, message } => {
            warn!(kind = "normalization", "{} - Normalization error: {} - {}", context, kind, message);
        }
        QuoteError::InvalidConfig(msg) => {
            error!("{} - Configuration error: {}", context, msg);
        }
        QuoteError::Exhausted { attempts, last } => {
            error!(attempts, "{} - All candidates failed, last error: {}", context, last);
        }
        _ => error!("{} - Unexpected error: {}", context, error),
    }
}

/// Maps any displayable error into a transport error with context.
///
/// # Arguments
/// * `error` - The underlying error
/// * `context` - Additional context about the operation that failed
pub fn transport_error<E: std::fmt::Display>(error: E, context: &str) -> QuoteError {
    QuoteError::Transport(format!("{}: {}", context, error))
}
