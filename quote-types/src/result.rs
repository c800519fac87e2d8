use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the selected route can be turned into a signable transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteStatus {
    /// The route carries a transaction or instructions.
    Executable,
    /// Price information only; nothing to build a transaction from.
    QuoteOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAccountMeta {
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// Instruction in canonical form: base58 keys, base64 data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedInstruction {
    pub program_id: String,
    pub accounts: Vec<NormalizedAccountMeta>,
    pub data: String,
}

/// Final, caller-facing quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    pub status: QuoteStatus,
    pub executable: bool,
    pub simulated: bool,
    pub updated_at: DateTime<Utc>,
    pub in_mint: String,
    pub out_mint: String,
    pub amount_in: String,
    /// Input amount reported by the selected route.
    pub in_amount: String,
    pub amount_out: String,
    pub price_impact_bps: u32,
    pub routers: Vec<String>,
    pub provider: String,
    pub route_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_base64: Option<String>,
    pub instructions: Vec<NormalizedInstruction>,
    pub address_lookup_tables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_units: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_units_safe: Option<u64>,
}

impl QuoteResult {
    pub fn is_executable(&self) -> bool {
        self.status == QuoteStatus::Executable
    }
}
