//! Wire protocol for the Titan swap-quote stream.
//!
//! A connection negotiates one of [`SUBPROTOCOLS`] and exchanges MessagePack
//! frames: the client sends [`ClientRequest`] envelopes and the server answers
//! with the [`ServerMessage`] union.

pub mod client;
pub mod codec;
pub mod error;
pub mod server;
pub mod shapes;

pub use client::{
    ClientRequest, QuoteUpdateParams, RequestData, StopStreamRequest, SwapMode, SwapParams,
    SwapQuoteRequest, TransactionParams,
};
pub use codec::{decode_client_request, decode_server_message, encode};
pub use error::WireError;
pub use server::{
    Ack, ErrorFrame, RoutePlanStep, ServerMessage, StreamData, StreamDataPayload, StreamEnd,
    StreamStart, SwapQuotes, SwapRoute, WireAccountMeta, WireInstruction,
};
pub use shapes::{WireAmount, WireBytes};

/// Compact binary sub-protocol, offered first.
pub const BINARY_SUBPROTOCOL: &str = "v1.api.titan.ag+msgpack";
/// Plain sub-protocol fallback.
pub const PLAIN_SUBPROTOCOL: &str = "v1.api.titan.ag";
/// Sub-protocol tokens in priority order.
pub const SUBPROTOCOLS: [&str; 2] = [BINARY_SUBPROTOCOL, PLAIN_SUBPROTOCOL];

/// Value for the `Sec-WebSocket-Protocol` request header.
pub fn subprotocol_header() -> String {
    SUBPROTOCOLS.join(", ")
}
