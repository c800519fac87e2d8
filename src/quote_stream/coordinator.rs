use quote_types::{FeeParams, QuoteRequest, QuoteResult};
use titan_wire::{
    QuoteUpdateParams, SwapMode, SwapParams, SwapQuoteRequest, SwapQuotes, TransactionParams,
    WireBytes,
};
use tracing::debug;

use crate::error::{NormalizationErrorKind, QuoteError, Result};
use crate::quote_stream::normalizer::{decode_base58, parse_decimal, render_quote};
use crate::quote_stream::selector::select_best_route;

/// Translates one caller request into the subscribe payload and turns a
/// quotes frame back into the caller-facing result.
#[derive(Debug, Clone)]
pub struct QuoteRequestCoordinator<'a> {
    request: &'a QuoteRequest,
    update: QuoteUpdateParams,
}

impl<'a> QuoteRequestCoordinator<'a> {
    pub fn new(request: &'a QuoteRequest, update: QuoteUpdateParams) -> Self {
        Self { request, update }
    }

    pub fn request(&self) -> &QuoteRequest {
        self.request
    }

    /// Subscribe payload for the request. Fails with a normalization error
    /// when a key or the amount does not decode.
    pub fn subscribe_payload(&self) -> Result<SwapQuoteRequest> {
        let request = self.request;

        let swap = SwapParams {
            input_mint: WireBytes::binary(decode_base58("inMint", &request.in_mint)?),
            output_mint: WireBytes::binary(decode_base58("outMint", &request.out_mint)?),
            amount: parse_amount_in(&request.amount_in)?,
            swap_mode: SwapMode::ExactIn,
            slippage_bps: request.slippage_bps,
        };

        let mut transaction = TransactionParams {
            user_public_key: WireBytes::binary(decode_base58(
                "userPublicKey",
                &request.requester_key,
            )?),
            fee_account: None,
            fee_bps: None,
            fee_from_input_mint: None,
            fee_mint: None,
        };
        if let Some(fee) = &request.fee {
            apply_fee(&mut transaction, fee)?;
        }

        Ok(SwapQuoteRequest {
            swap,
            transaction,
            update: self.update,
        })
    }

    /// Selects the best route of a quotes frame and renders it.
    pub fn on_quotes(&self, quotes: &SwapQuotes) -> Result<QuoteResult> {
        let (provider, route) = select_best_route(&quotes.quotes)?;
        debug!(provider, route_id = %quotes.id, "Rendering selected route");
        render_quote(provider, route, &quotes.id, self.request)
    }
}

fn parse_amount_in(amount_in: &str) -> Result<u64> {
    let amount = parse_decimal(amount_in)?;
    u64::try_from(&amount).map_err(|_| {
        QuoteError::normalization(
            NormalizationErrorKind::AmountOverflow,
            format!("amount {} does not fit an unsigned 64-bit value", amount),
        )
    })
}

fn apply_fee(transaction: &mut TransactionParams, fee: &FeeParams) -> Result<()> {
    transaction.fee_account = fee
        .fee_account
        .as_deref()
        .map(|account| decode_base58("feeAccount", account).map(WireBytes::binary))
        .transpose()?;
    transaction.fee_bps = Some(fee.fee_bps);
    transaction.fee_from_input_mint = Some(fee.fee_from_input_mint);
    transaction.fee_mint = Some(WireBytes::binary(decode_base58("feeMint", &fee.fee_mint)?));
    Ok(())
}
