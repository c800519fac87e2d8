//! Platform fee resolution. Produces the optional fee parameters that get
//! folded into the subscribe payload.

use std::collections::BTreeMap;

use quote_types::FeeParams;
use tracing::{info, warn};

use crate::config::RawEnv;

pub const WRAPPED_SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
pub const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";

/// Mints the fee is preferably taken in, most preferred first.
const PRIORITY_MINTS: [&str; 3] = [WRAPPED_SOL_MINT, USDC_MINT, USDT_MINT];

pub const DEFAULT_FEE_BPS: u16 = 100;
const MAX_FEE_BPS: u16 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformFeeConfig {
    pub enabled: bool,
    pub fee_bps: u16,
    pub collector_authority: Option<String>,
    /// Fee token account per mint.
    pub fee_accounts: BTreeMap<String, String>,
}

impl PlatformFeeConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            fee_bps: 0,
            collector_authority: None,
            fee_accounts: BTreeMap::new(),
        }
    }

    pub fn from_raw(raw: &RawEnv) -> Self {
        let mut fee_accounts = BTreeMap::new();
        for (mint, account) in [
            (WRAPPED_SOL_MINT, &raw.platform_fee_sol_account),
            (USDC_MINT, &raw.platform_fee_usdc_account),
            (USDT_MINT, &raw.platform_fee_usdt_account),
        ] {
            if let Some(account) = normalize_public_key(account.as_deref()) {
                fee_accounts.insert(mint.to_string(), account);
            }
        }

        Self {
            enabled: parse_enabled(raw.platform_fee_enabled.as_deref()),
            fee_bps: parse_fee_bps(raw.platform_fee_bps.as_deref()),
            collector_authority: normalize_public_key(raw.platform_fee_recipient.as_deref()),
            fee_accounts,
        }
        .normalized()
    }

    /// A config without a collector cannot charge anything and is disabled.
    pub fn normalized(self) -> Self {
        if !self.enabled || self.collector_authority.is_none() {
            return Self::disabled();
        }

        Self {
            fee_bps: if self.fee_bps > 0 { self.fee_bps } else { DEFAULT_FEE_BPS },
            ..self
        }
    }

    pub fn log_summary(&self) {
        if !self.enabled {
            info!(target: "fees", "Platform fee disabled");
            return;
        }
        info!(
            target: "fees",
            bps = self.fee_bps,
            collector = ?self.collector_authority,
            accounts = self.fee_accounts.len(),
            "Loaded platform fee config"
        );
    }

    /// Resolves fee parameters for a swap, or `None` when fees are disabled.
    pub fn resolve(&self, in_mint: &str, out_mint: &str) -> Option<FeeParams> {
        if !self.enabled {
            return None;
        }

        let in_mint = normalize_public_key(Some(in_mint));
        let out_mint = normalize_public_key(Some(out_mint));
        let fee_mint = pick_fee_mint(in_mint.as_deref(), out_mint.as_deref());

        let fee_from_input_mint = match (&in_mint, &out_mint) {
            (Some(input), _) if *input == fee_mint => true,
            (_, Some(output)) if *output == fee_mint => false,
            _ => true,
        };

        let fee_account = self.fee_accounts.get(&fee_mint).cloned();
        if fee_account.is_none() {
            warn!(
                target: "fees",
                fee_mint = %fee_mint,
                fee_from_input_mint,
                collector = ?self.collector_authority,
                "Platform fee account not resolved"
            );
        }

        Some(FeeParams {
            fee_account,
            fee_bps: self.fee_bps,
            fee_from_input_mint,
            fee_mint,
        })
    }
}

fn pick_fee_mint(in_mint: Option<&str>, out_mint: Option<&str>) -> String {
    PRIORITY_MINTS
        .iter()
        .find(|candidate| Some(**candidate) == in_mint || Some(**candidate) == out_mint)
        .map(|mint| mint.to_string())
        .or_else(|| in_mint.or(out_mint).map(str::to_string))
        .unwrap_or_default()
}

/// Accepts a base58 key that decodes to 32 bytes.
fn normalize_public_key(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    match bs58::decode(value).into_vec() {
        Ok(bytes) if bytes.len() == 32 => Some(value.to_string()),
        _ => {
            warn!(target: "fees", value, "Invalid public key provided");
            None
        }
    }
}

fn parse_fee_bps(value: Option<&str>) -> u16 {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return DEFAULT_FEE_BPS;
    };
    match value.parse::<f64>() {
        Ok(numeric) if numeric.is_finite() && numeric > 0.0 => {
            numeric.round().min(f64::from(MAX_FEE_BPS)) as u16
        }
        _ => {
            warn!(target: "fees", value, "PLATFORM_FEE_BPS invalid; falling back to default");
            DEFAULT_FEE_BPS
        }
    }
}

fn parse_enabled(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}
