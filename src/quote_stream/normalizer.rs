//! Conversions from wire shapes to canonical types.
//!
//! Each target type has one entry point that tries the recognized physical
//! shapes in a fixed order. All functions are pure.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use chrono::Utc;
use num_bigint::BigInt;
use quote_types::{
    NormalizedAccountMeta, NormalizedInstruction, QuoteRequest, QuoteResult, QuoteStatus,
};
use titan_wire::{SwapRoute, WireAccountMeta, WireAmount, WireBytes, WireInstruction};

use crate::error::{NormalizationErrorKind as Kind, QuoteError, Result};

type TextKeyShape = fn(&str) -> Option<String>;

/// Text encodings a key may arrive in, most specific first.
const TEXT_KEY_SHAPES: [(&str, TextKeyShape); 2] =
    [("base58", key_from_base58_text), ("base64", key_from_base64_text)];

/// Amount in any wire shape as an arbitrary-precision integer. Floats are
/// truncated toward zero.
pub fn amount_to_bigint(value: &WireAmount) -> Result<BigInt> {
    match value {
        WireAmount::Unsigned(v) => Ok(BigInt::from(*v)),
        WireAmount::Signed(v) => Ok(BigInt::from(*v)),
        WireAmount::Float(v) => {
            let truncated = v.trunc();
            if truncated.is_finite() && truncated.abs() < i128::MAX as f64 {
                Ok(BigInt::from(truncated as i128))
            } else {
                Err(QuoteError::normalization(
                    Kind::InvalidAmount,
                    format!("unrepresentable amount {}", v),
                ))
            }
        }
        WireAmount::Text(text) => parse_decimal(text),
    }
}

/// Like [`amount_to_bigint`], with an absent amount counting as zero.
pub fn optional_amount(value: Option<&WireAmount>) -> Result<BigInt> {
    value.map_or_else(|| Ok(BigInt::default()), amount_to_bigint)
}

/// Amount as a decimal integer string.
pub fn normalize_amount(value: Option<&WireAmount>) -> Result<String> {
    Ok(optional_amount(value)?.to_string())
}

/// Parses a base-unit decimal integer string.
pub fn parse_decimal(text: &str) -> Result<BigInt> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix(['-', '+']).unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QuoteError::normalization(
            Kind::InvalidAmount,
            format!("not a decimal integer: {:?}", text),
        ));
    }
    trimmed.parse::<BigInt>().map_err(|e| {
        QuoteError::normalization(Kind::InvalidAmount, format!("{:?}: {}", text, e))
    })
}

/// Compute-unit estimate, parsed as an amount and narrowed to `u64`.
pub fn normalize_compute_units(value: Option<&WireAmount>) -> Result<Option<u64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let units = amount_to_bigint(value)?;
    u64::try_from(&units).map(Some).map_err(|_| {
        QuoteError::normalization(
            Kind::AmountOverflow,
            format!("compute units out of range: {}", units),
        )
    })
}

/// Address or public key as base58 text.
pub fn normalize_address(value: &WireBytes) -> Result<String> {
    match value {
        WireBytes::Text(text) if text.trim().is_empty() => {
            Err(QuoteError::normalization(Kind::EmptyKey, "empty key"))
        }
        WireBytes::Text(text) => TEXT_KEY_SHAPES
            .iter()
            .find_map(|(_, shape)| shape(text))
            .ok_or_else(|| {
                QuoteError::normalization(
                    Kind::UnsupportedType,
                    format!("unsupported key text {:?}", text),
                )
            }),
        WireBytes::Binary(bytes) | WireBytes::Array(bytes) if bytes.is_empty() => {
            Err(QuoteError::normalization(Kind::EmptyKey, "empty key"))
        }
        WireBytes::Binary(bytes) | WireBytes::Array(bytes) => {
            Ok(bs58::encode(bytes).into_string())
        }
    }
}

fn key_from_base58_text(text: &str) -> Option<String> {
    match bs58::decode(text).into_vec() {
        Ok(bytes) if !bytes.is_empty() => Some(text.to_string()),
        _ => None,
    }
}

fn key_from_base64_text(text: &str) -> Option<String> {
    match BASE64_STANDARD.decode(text.trim()) {
        Ok(bytes) if !bytes.is_empty() => Some(bs58::encode(bytes).into_string()),
        _ => None,
    }
}

/// Raw bytes of a blob. Text is read as base64; blank text is empty.
pub fn blob_bytes(value: &WireBytes) -> Result<Vec<u8>> {
    match value {
        WireBytes::Binary(bytes) | WireBytes::Array(bytes) => Ok(bytes.clone()),
        WireBytes::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(Vec::new());
            }
            BASE64_STANDARD.decode(trimmed).map_err(|e| {
                QuoteError::normalization(Kind::InvalidBase64, format!("blob: {}", e))
            })
        }
    }
}

/// Blob as base64 text. Absent or zero-length input yields `None`, which is
/// distinct from an empty string.
pub fn normalize_blob(value: Option<&WireBytes>) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let bytes = blob_bytes(value)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(BASE64_STANDARD.encode(bytes)))
}

/// Transaction bytes of a route, when present, decodable and non-empty.
pub fn transaction_base64(route: &SwapRoute) -> Option<String> {
    normalize_blob(route.transaction.as_ref()).ok().flatten()
}

pub fn normalize_account(account: &WireAccountMeta) -> Result<NormalizedAccountMeta> {
    Ok(NormalizedAccountMeta {
        pubkey: normalize_address(&account.p)?,
        is_signer: account.s,
        is_writable: account.w,
    })
}

pub fn normalize_instruction(instruction: &WireInstruction) -> Result<NormalizedInstruction> {
    Ok(NormalizedInstruction {
        program_id: normalize_address(&instruction.p)?,
        accounts: instruction
            .a
            .iter()
            .map(normalize_account)
            .collect::<Result<Vec<_>>>()?,
        data: normalize_blob(instruction.d.as_ref())?.unwrap_or_default(),
    })
}

/// Step labels of a route, or the provider id when the route has none.
pub fn router_labels(provider_id: &str, route: &SwapRoute) -> Vec<String> {
    let labels: Vec<String> = route
        .steps
        .iter()
        .filter_map(|step| step.label.clone())
        .filter(|label| !label.is_empty())
        .collect();

    if labels.is_empty() {
        vec![provider_id.to_string()]
    } else {
        labels
    }
}

/// Decodes base58 text (mints, requester key, fee accounts) to raw bytes.
pub fn decode_base58(field: &str, text: &str) -> Result<Vec<u8>> {
    let bytes = bs58::decode(text.trim()).into_vec().map_err(|e| {
        QuoteError::normalization(Kind::InvalidBase58, format!("{}: {}", field, e))
    })?;
    if bytes.is_empty() {
        return Err(QuoteError::normalization(
            Kind::EmptyKey,
            format!("{}: empty key", field),
        ));
    }
    Ok(bytes)
}

/// Renders the selected route as the caller-facing result.
pub fn render_quote(
    provider_id: &str,
    route: &SwapRoute,
    route_id: &str,
    request: &QuoteRequest,
) -> Result<QuoteResult> {
    let transaction_base64 = transaction_base64(route);
    let instructions = route
        .instructions
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(normalize_instruction)
        .collect::<Result<Vec<_>>>()?;
    let address_lookup_tables = route
        .address_lookup_tables
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(normalize_address)
        .collect::<Result<Vec<_>>>()?;

    let status = if transaction_base64.is_some() || !instructions.is_empty() {
        QuoteStatus::Executable
    } else {
        QuoteStatus::QuoteOnly
    };

    Ok(QuoteResult {
        status,
        executable: status == QuoteStatus::Executable,
        simulated: true,
        updated_at: Utc::now(),
        in_mint: request.in_mint.clone(),
        out_mint: request.out_mint.clone(),
        amount_in: request.amount_in.clone(),
        in_amount: normalize_amount(route.in_amount.as_ref())?,
        amount_out: normalize_amount(route.out_amount.as_ref())?,
        price_impact_bps: route.slippage_bps.unwrap_or(0),
        routers: router_labels(provider_id, route),
        provider: provider_id.to_string(),
        route_id: route_id.to_string(),
        transaction_base64,
        instructions,
        address_lookup_tables,
        compute_units: normalize_compute_units(route.compute_units.as_ref())?,
        compute_units_safe: normalize_compute_units(route.compute_units_safe.as_ref())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use titan_wire::RoutePlanStep;

    const KEYS: [&str; 4] = [
        "So11111111111111111111111111111111111111112",
        "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        "11111111111111111111111111111111",
        "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4",
    ];

    fn request() -> QuoteRequest {
        QuoteRequest::new(KEYS[0], KEYS[1], "1000000000", 50, KEYS[3])
    }

    #[test]
    fn test_address_round_trips_through_every_shape() {
        for key in KEYS {
            let bytes = bs58::decode(key).into_vec().unwrap();
            assert_eq!(normalize_address(&WireBytes::text(key)).unwrap(), key);
            assert_eq!(normalize_address(&WireBytes::binary(bytes.clone())).unwrap(), key);
            assert_eq!(normalize_address(&WireBytes::Array(bytes.clone())).unwrap(), key);
            let base64 = BASE64_STANDARD.encode(&bytes);
            assert_eq!(normalize_address(&WireBytes::Text(base64)).unwrap(), key);
        }
    }

    #[test]
    fn test_address_rejects_empty_and_unknown_text() {
        let err = normalize_address(&WireBytes::binary(Vec::new())).unwrap_err();
        assert!(matches!(err, QuoteError::Normalization { kind: Kind::EmptyKey, .. }));

        let err = normalize_address(&WireBytes::text("  ")).unwrap_err();
        assert!(matches!(err, QuoteError::Normalization { kind: Kind::EmptyKey, .. }));

        let err = normalize_address(&WireBytes::text("not/a key!")).unwrap_err();
        assert!(matches!(err, QuoteError::Normalization { kind: Kind::UnsupportedType, .. }));
    }

    #[test]
    fn test_amount_is_encoding_invariant() {
        let shapes = [
            WireAmount::Unsigned(1_000_000_000),
            WireAmount::Signed(1_000_000_000),
            WireAmount::Float(1_000_000_000.0),
            WireAmount::Text("1000000000".to_string()),
        ];
        for shape in &shapes {
            assert_eq!(normalize_amount(Some(shape)).unwrap(), "1000000000");
        }
    }

    #[test]
    fn test_amount_truncates_and_defaults() {
        assert_eq!(normalize_amount(Some(&WireAmount::Float(12.9))).unwrap(), "12");
        assert_eq!(normalize_amount(Some(&WireAmount::Float(-12.9))).unwrap(), "-12");
        assert_eq!(normalize_amount(None).unwrap(), "0");
        assert_eq!(
            normalize_amount(Some(&WireAmount::Text("340282366920938463463374607431768211456".to_string())))
                .unwrap(),
            "340282366920938463463374607431768211456"
        );
        assert!(normalize_amount(Some(&WireAmount::Float(f64::NAN))).is_err());
        assert!(normalize_amount(Some(&WireAmount::Text("12.5".to_string()))).is_err());
    }

    #[test]
    fn test_blob_absent_and_empty_are_none() {
        assert_eq!(normalize_blob(None).unwrap(), None);
        assert_eq!(normalize_blob(Some(&WireBytes::binary(Vec::new()))).unwrap(), None);
        assert_eq!(normalize_blob(Some(&WireBytes::text(""))).unwrap(), None);
        assert_eq!(
            normalize_blob(Some(&WireBytes::Array(vec![1, 2, 3]))).unwrap(),
            Some("AQID".to_string())
        );
        assert_eq!(
            normalize_blob(Some(&WireBytes::text("AQID"))).unwrap(),
            Some("AQID".to_string())
        );
        assert!(normalize_blob(Some(&WireBytes::text("%%%"))).is_err());
    }

    #[test]
    fn test_instruction_defaults() {
        let program = bs58::decode(KEYS[3]).into_vec().unwrap();
        let instruction = WireInstruction {
            p: WireBytes::binary(program),
            a: vec![WireAccountMeta {
                p: WireBytes::text(KEYS[0]),
                s: false,
                w: true,
            }],
            d: None,
        };

        let normalized = normalize_instruction(&instruction).unwrap();
        assert_eq!(normalized.program_id, KEYS[3]);
        assert_eq!(normalized.data, "");
        assert_eq!(
            normalized.accounts,
            vec![NormalizedAccountMeta {
                pubkey: KEYS[0].to_string(),
                is_signer: false,
                is_writable: true,
            }]
        );
    }

    #[test]
    fn test_router_labels_fall_back_to_provider() {
        let mut route = SwapRoute::default();
        assert_eq!(router_labels("titan", &route), vec!["titan".to_string()]);

        route.steps = vec![
            RoutePlanStep { label: Some("Whirlpool".to_string()) },
            RoutePlanStep { label: None },
            RoutePlanStep { label: Some("Raydium CLMM".to_string()) },
        ];
        assert_eq!(
            router_labels("titan", &route),
            vec!["Whirlpool".to_string(), "Raydium CLMM".to_string()]
        );
    }

    #[test]
    fn test_compute_units_narrowing() {
        assert_eq!(normalize_compute_units(None).unwrap(), None);
        assert_eq!(
            normalize_compute_units(Some(&WireAmount::Float(210_000.0))).unwrap(),
            Some(210_000)
        );
        let err = normalize_compute_units(Some(&WireAmount::Signed(-1))).unwrap_err();
        assert!(matches!(err, QuoteError::Normalization { kind: Kind::AmountOverflow, .. }));
    }

    #[test]
    fn test_render_quote_status() {
        let route = SwapRoute {
            in_amount: Some(WireAmount::Unsigned(1_000_000_000)),
            out_amount: Some(WireAmount::Unsigned(150_250_000)),
            slippage_bps: Some(12),
            ..SwapRoute::default()
        };

        let quote_only = render_quote("metis", &route, "route-9", &request()).unwrap();
        assert_eq!(quote_only.status, QuoteStatus::QuoteOnly);
        assert!(!quote_only.executable);
        assert!(quote_only.simulated);
        assert_eq!(quote_only.amount_out, "150250000");
        assert_eq!(quote_only.in_amount, "1000000000");
        assert_eq!(quote_only.price_impact_bps, 12);
        assert_eq!(quote_only.routers, vec!["metis".to_string()]);
        assert_eq!(quote_only.route_id, "route-9");

        let executable = SwapRoute {
            transaction: Some(WireBytes::binary(vec![1, 2, 3, 4])),
            ..route
        };
        let result = render_quote("metis", &executable, "route-9", &request()).unwrap();
        assert_eq!(result.status, QuoteStatus::Executable);
        assert!(result.executable);
        assert_eq!(result.transaction_base64.as_deref(), Some("AQIDBA=="));
    }

    #[test]
    fn test_decode_base58_rejects_invalid_text() {
        assert_eq!(decode_base58("inputMint", KEYS[0]).unwrap().len(), 32);
        let err = decode_base58("inputMint", "0OIl").unwrap_err();
        assert!(matches!(err, QuoteError::Normalization { kind: Kind::InvalidBase58, .. }));
    }
}
