// Public modules that are part of the API
pub mod config;
pub mod error;
pub mod fees;
pub mod monitoring;
pub mod quote_stream;

// Re-export common types
pub use config::Settings;

pub use error::{NormalizationErrorKind, QuoteError, Result};

pub use fees::PlatformFeeConfig;

pub use quote_stream::{QuoteAttempt, QuoteClient, WebSocketAttempt};

pub use quote_types::{
    FeeParams, NormalizedAccountMeta, NormalizedInstruction, QuoteRequest, QuoteResult,
    QuoteStatus,
};
