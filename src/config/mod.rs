use serde::Deserialize;
use config::{Config, ConfigError, Environment};
use std::time::Duration;

use crate::fees::PlatformFeeConfig;

pub const DEFAULT_REGION: &str = "us1.api.demo.titan.exchange";
pub const DEFAULT_WS_URL: &str = "wss://us1.api.demo.titan.exchange/api/v1/ws";
pub const DEFAULT_WS_SCHEME: &str = "wss";
pub const DEFAULT_WS_PATH: &str = "/api/v1/ws";

/// Hard deadline for one attempt, from connect to settlement.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(7_000);
/// Refresh interval requested from the upstream stream.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 1_000;
/// Number of concurrent candidate quotes requested per update.
pub const DEFAULT_NUM_QUOTES: u32 = 3;

/// Environment as read from the process (and `.env`). Every value is kept as
/// raw text and resolved by [`Settings::resolve`].
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawEnv {
    pub titan_token: Option<String>,
    pub titan_demo_api_token: Option<String>,
    pub titan_ws_url: Option<String>,
    pub titan_region_order: Option<String>,
    pub titan_demo_default_region: Option<String>,
    pub titan_demo_region_order: Option<String>,
    pub titan_demo_ws_base_scheme: Option<String>,
    pub titan_demo_ws_path: Option<String>,
    pub titan_request_timeout_ms: Option<String>,
    pub titan_update_interval_ms: Option<String>,
    pub titan_num_quotes: Option<String>,

    pub platform_fee_enabled: Option<String>,
    pub platform_fee_bps: Option<String>,
    pub platform_fee_recipient: Option<String>,
    pub platform_fee_sol_account: Option<String>,
    pub platform_fee_usdc_account: Option<String>,
    pub platform_fee_usdt_account: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Bearer token; `None` when unset or blank.
    pub token: Option<String>,
    /// Endpoint template, possibly carrying a region placeholder.
    pub ws_url: String,
    /// Regions to try, in order.
    pub preferred_regions: Vec<String>,
    pub request_timeout: Duration,
    pub update_interval_ms: u64,
    pub num_quotes: u32,
    pub platform_fee: PlatformFeeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: None,
            ws_url: DEFAULT_WS_URL.to_string(),
            preferred_regions: vec![DEFAULT_REGION.to_string()],
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            num_quotes: DEFAULT_NUM_QUOTES,
            platform_fee: PlatformFeeConfig::disabled(),
        }
    }
}

impl Settings {
    /// Loads settings from the process environment, after an optional `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenv::dotenv().is_ok() {
            tracing::debug!("Loaded configuration from .env file");
        }

        let raw: RawEnv = Config::builder()
            .add_source(Environment::default())
            .build()?
            .try_deserialize()?;

        Ok(Self::resolve(&raw))
    }

    /// Resolves raw environment values into settings, applying fallbacks.
    pub fn resolve(raw: &RawEnv) -> Self {
        let fallback_region = non_blank(raw.titan_demo_default_region.as_deref())
            .unwrap_or(DEFAULT_REGION)
            .to_string();

        Self {
            token: non_blank(raw.titan_token.as_deref())
                .or_else(|| non_blank(raw.titan_demo_api_token.as_deref()))
                .map(str::to_string),
            ws_url: resolve_ws_url(raw, &fallback_region),
            preferred_regions: resolve_preferred_regions(raw, &fallback_region),
            request_timeout: positive(raw.titan_request_timeout_ms.as_deref())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            update_interval_ms: positive(raw.titan_update_interval_ms.as_deref())
                .unwrap_or(DEFAULT_UPDATE_INTERVAL_MS),
            num_quotes: positive(raw.titan_num_quotes.as_deref())
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(DEFAULT_NUM_QUOTES),
            platform_fee: PlatformFeeConfig::from_raw(raw),
        }
    }

    pub fn with_ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = ws_url.into();
        self
    }

    pub fn with_regions(mut self, regions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.preferred_regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

fn resolve_ws_url(raw: &RawEnv, fallback_region: &str) -> String {
    if let Some(url) = raw.titan_ws_url.as_deref() {
        return normalize_url(Some(url), DEFAULT_WS_URL);
    }

    let scheme = non_blank(raw.titan_demo_ws_base_scheme.as_deref()).unwrap_or(DEFAULT_WS_SCHEME);
    let path = raw.titan_demo_ws_path.as_deref().unwrap_or(DEFAULT_WS_PATH);
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    normalize_url(
        Some(&format!("{}://{}{}", scheme, fallback_region, path)),
        DEFAULT_WS_URL,
    )
}

fn resolve_preferred_regions(raw: &RawEnv, fallback_region: &str) -> Vec<String> {
    let explicit = parse_list(raw.titan_region_order.as_deref());
    if !explicit.is_empty() {
        return explicit;
    }

    let demo = parse_list(raw.titan_demo_region_order.as_deref());
    if !demo.is_empty() {
        return demo;
    }

    vec![fallback_region.to_string()]
}

/// Splits a comma- or space-separated list, dropping empty entries.
pub fn parse_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(|c: char| c == ',' || c == ' ')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Cleans up a URL taken from the environment: trims whitespace, strips one
/// pair of surrounding quotes and collapses repeated colons after the scheme
/// (`wss:://host` becomes `wss://host`).
pub fn normalize_url(value: Option<&str>, fallback: &str) -> String {
    let Some(value) = value else {
        return fallback.to_string();
    };

    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix(['"', '\'']).unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(['"', '\'']).unwrap_or(trimmed);
    if trimmed.is_empty() {
        return fallback.to_string();
    }

    let scheme_len = trimmed
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    if scheme_len > 0 {
        let rest = &trimmed[scheme_len..];
        let after_colons = rest.trim_start_matches(':');
        if after_colons.len() < rest.len() && after_colons.starts_with("//") {
            return format!("{}:{}", &trimmed[..scheme_len], after_colons);
        }
    }

    trimmed.to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn positive(value: Option<&str>) -> Option<u64> {
    non_blank(value)
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
}
