//! Canonical, caller-facing types for the quote stream client.

pub mod request;
pub mod result;

pub use request::{FeeParams, QuoteRequest};
pub use result::{NormalizedAccountMeta, NormalizedInstruction, QuoteResult, QuoteStatus};
