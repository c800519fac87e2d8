use serde::{Deserialize, Serialize};

/// Platform fee parameters supplied by the fee resolver and folded into the
/// subscribe payload as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_account: Option<String>,
    pub fee_bps: u16,
    pub fee_from_input_mint: bool,
    pub fee_mint: String,
}

/// A single quote request. Created per call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub in_mint: String,
    pub out_mint: String,
    /// Base-unit amount as a decimal integer string.
    pub amount_in: String,
    pub slippage_bps: u16,
    pub priority_fee: u64,
    #[serde(rename = "userPublicKey")]
    pub requester_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<FeeParams>,
}

impl QuoteRequest {
    pub fn new(
        in_mint: impl Into<String>,
        out_mint: impl Into<String>,
        amount_in: impl Into<String>,
        slippage_bps: u16,
        requester_key: impl Into<String>,
    ) -> Self {
        Self {
            in_mint: in_mint.into(),
            out_mint: out_mint.into(),
            amount_in: amount_in.into(),
            slippage_bps,
            priority_fee: 0,
            requester_key: requester_key.into(),
            fee: None,
        }
    }

    pub fn with_priority_fee(mut self, priority_fee: u64) -> Self {
        self.priority_fee = priority_fee;
        self
    }

    pub fn with_fee(mut self, fee: Option<FeeParams>) -> Self {
        self.fee = fee;
        self
    }
}
