//! Outbound envelope and commands.

use serde::{Deserialize, Serialize};

use crate::shapes::WireBytes;

/// Every outbound message: a per-connection request id and one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest {
    pub id: u32,
    pub data: RequestData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestData {
    /// Start a quote stream.
    #[serde(rename = "NewSwapQuoteStream")]
    Subscribe(SwapQuoteRequest),
    /// Stop a stream by its server-assigned id.
    #[serde(rename = "StopStream")]
    Unsubscribe(StopStreamRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapMode {
    ExactIn,
    ExactOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapQuoteRequest {
    pub swap: SwapParams,
    pub transaction: TransactionParams,
    pub update: QuoteUpdateParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapParams {
    pub input_mint: WireBytes,
    pub output_mint: WireBytes,
    pub amount: u64,
    pub swap_mode: SwapMode,
    pub slippage_bps: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    pub user_public_key: WireBytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_account: Option<WireBytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_bps: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_from_input_mint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_mint: Option<WireBytes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteUpdateParams {
    pub interval_ms: u64,
    pub num_quotes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopStreamRequest {
    pub id: u32,
}

impl ClientRequest {
    pub fn subscribe(id: u32, request: SwapQuoteRequest) -> Self {
        Self {
            id,
            data: RequestData::Subscribe(request),
        }
    }

    pub fn unsubscribe(id: u32, stream_id: u32) -> Self {
        Self {
            id,
            data: RequestData::Unsubscribe(StopStreamRequest { id: stream_id }),
        }
    }
}
