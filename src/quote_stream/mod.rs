//! Streaming quote client: candidate resolution, per-attempt sessions,
//! route selection and payload normalization.

pub mod coordinator;
pub mod normalizer;
pub mod orchestrator;
pub mod regions;
pub mod selector;
pub mod session;

pub use coordinator::QuoteRequestCoordinator;
pub use orchestrator::{QuoteAttempt, QuoteClient, WebSocketAttempt};
pub use regions::{candidate_url, endpoint_host, resolve_candidates};
pub use selector::select_best_route;
pub use session::{AttemptPhase, CloseReason, PhaseCell, SessionOptions, SessionTransport};
