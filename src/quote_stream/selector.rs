use std::collections::BTreeMap;

use num_bigint::BigInt;
use titan_wire::SwapRoute;
use tracing::debug;

use crate::error::{NormalizationErrorKind, QuoteError, Result};
use crate::quote_stream::normalizer::{optional_amount, transaction_base64};

/// Picks the route to return from one quotes frame.
///
/// Routes are ranked by output amount, highest first, with ties kept in
/// provider-id order. The first ranked route carrying a non-empty, decodable
/// transaction wins; when none does, the top-ranked route is returned.
pub fn select_best_route(
    quotes: &BTreeMap<String, SwapRoute>,
) -> Result<(&str, &SwapRoute)> {
    if quotes.is_empty() {
        return Err(QuoteError::normalization(
            NormalizationErrorKind::NoQuotes,
            "no quotes available",
        ));
    }

    let mut ranked = quotes
        .iter()
        .map(|(provider, route)| {
            optional_amount(route.out_amount.as_ref()).map(|out| (out, provider, route))
        })
        .collect::<Result<Vec<(BigInt, &String, &SwapRoute)>>>()?;
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    let pick = ranked
        .iter()
        .find(|(_, _, route)| transaction_base64(route).is_some())
        .unwrap_or(&ranked[0]);

    debug!(
        provider = %pick.1,
        out_amount = %pick.0,
        candidates = ranked.len(),
        "Selected route"
    );
    Ok((pick.1.as_str(), pick.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use titan_wire::{WireAmount, WireBytes};

    fn route(out: u64, tx: Option<Vec<u8>>) -> SwapRoute {
        SwapRoute {
            out_amount: Some(WireAmount::Unsigned(out)),
            transaction: tx.map(WireBytes::binary),
            ..SwapRoute::default()
        }
    }

    fn quotes(entries: Vec<(&str, SwapRoute)>) -> BTreeMap<String, SwapRoute> {
        entries
            .into_iter()
            .map(|(provider, route)| (provider.to_string(), route))
            .collect()
    }

    #[test]
    fn test_empty_quotes_fail() {
        let err = select_best_route(&BTreeMap::new()).unwrap_err();
        assert!(matches!(
            err,
            QuoteError::Normalization { kind: NormalizationErrorKind::NoQuotes, .. }
        ));
        assert!(err.to_string().contains("no quotes available"));
    }

    #[test]
    fn test_highest_executable_route_wins() {
        let quotes = quotes(vec![
            ("a", route(100, Some(vec![1]))),
            ("b", route(300, Some(vec![2]))),
            ("c", route(200, Some(vec![3]))),
        ]);

        let (provider, _) = select_best_route(&quotes).unwrap();
        assert_eq!(provider, "b");
    }

    #[test]
    fn test_executable_route_preferred_over_better_quote_only() {
        let quotes = quotes(vec![
            ("a", route(500, None)),
            ("b", route(400, Some(Vec::new()))),
            ("c", route(300, Some(vec![9]))),
        ]);

        let (provider, _) = select_best_route(&quotes).unwrap();
        assert_eq!(provider, "c");
    }

    #[test]
    fn test_falls_back_to_head_without_transactions() {
        let quotes = quotes(vec![("a", route(10, None)), ("b", route(20, None))]);

        let (provider, chosen) = select_best_route(&quotes).unwrap();
        assert_eq!(provider, "b");
        assert_eq!(chosen.out_amount, Some(WireAmount::Unsigned(20)));
    }

    #[test]
    fn test_ties_keep_provider_order() {
        let quotes = quotes(vec![
            ("zeta", route(50, Some(vec![1]))),
            ("alpha", route(50, Some(vec![1]))),
        ]);

        let (provider, _) = select_best_route(&quotes).unwrap();
        assert_eq!(provider, "alpha");
    }

    #[test]
    fn test_mixed_amount_shapes_compare_numerically() {
        let mut text = route(0, Some(vec![1]));
        text.out_amount = Some(WireAmount::Text("18446744073709551616".to_string()));
        let quotes = quotes(vec![("a", route(u64::MAX, Some(vec![1]))), ("b", text)]);

        let (provider, _) = select_best_route(&quotes).unwrap();
        assert_eq!(provider, "b");
    }
}
