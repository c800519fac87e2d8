use thiserror::Error;
use std::fmt;

mod utils;
pub use utils::*;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Normalization error: {kind} - {message}")]
    Normalization {
        kind: NormalizationErrorKind,
        message: String,
    },

    #[error("Wire error: {0}")]
    Wire(#[from] titan_wire::WireError),

    #[error("Quote stream unavailable after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: usize,
        #[source]
        last: Box<QuoteError>,
    },

    #[error("Quote stream unavailable")]
    Unavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationErrorKind {
    InvalidBase58,
    InvalidBase64,
    EmptyKey,
    UnsupportedType,
    InvalidAmount,
    AmountOverflow,
    NoQuotes,
}

impl fmt::Display for NormalizationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBase58 => write!(f, "Invalid base58"),
            Self::InvalidBase64 => write!(f, "Invalid base64"),
            Self::EmptyKey => write!(f, "Empty key"),
            Self::UnsupportedType => write!(f, "Unsupported type"),
            Self::InvalidAmount => write!(f, "Invalid amount"),
            Self::AmountOverflow => write!(f, "Amount out of range"),
            Self::NoQuotes => write!(f, "No quotes available"),
        }
    }
}

pub type Result<T> = std::result::Result<T, QuoteError>;

impl QuoteError {
    pub fn normalization(kind: NormalizationErrorKind, message: impl Into<String>) -> Self {
        QuoteError::Normalization {
            kind,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        QuoteError::Protocol(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        QuoteError::Transport(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        QuoteError::Timeout(message.into())
    }

    /// Errors that end a single attempt and hand control to the next
    /// candidate.
    pub fn is_attempt_error(&self) -> bool {
        matches!(
            self,
            QuoteError::Protocol(_)
                | QuoteError::Timeout(_)
                | QuoteError::Transport(_)
                | QuoteError::Normalization { .. }
                | QuoteError::Wire(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, QuoteError::Timeout(_))
    }

    /// The error that ended the final attempt, if this is an exhaustion error.
    pub fn last_attempt_error(&self) -> Option<&QuoteError> {
        match self {
            QuoteError::Exhausted { last, .. } => Some(last),
            _ => None,
        }
    }

    /// Short label used for logging and attempt counters.
    pub fn kind_label(&self) -> &'static str {
        match self {
            QuoteError::Config(_) | QuoteError::InvalidConfig(_) => "config",
            QuoteError::Protocol(_) | QuoteError::Wire(_) => "protocol",
            QuoteError::Timeout(_) => "timeout",
            QuoteError::Transport(_) => "transport",
            QuoteError::Normalization { .. } => "normalization",
            QuoteError::Exhausted { .. } | QuoteError::Unavailable => "exhausted",
            QuoteError::Io(_) | QuoteError::Serialization(_) | QuoteError::InternalError(_) => {
                "internal"
            }
        }
    }
}
