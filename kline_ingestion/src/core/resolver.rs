// @file: kline_ingestion/src/core/resolver.rs
// @description: Maps business currencies onto live tradable exchange symbols.
// @author: LAS.

use crate::core::models::{ResolvedPair, SymbolMetadata};
use std::collections::HashSet;


//
// TYPE DEFINITIONS
//

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Sorted by symbol.
    pub resolved: Vec<ResolvedPair>,
    /// Encounter order of the input.
    pub unresolved: Vec<String>,
}


//
// PUBLIC INTERFACE
//

pub fn resolve_symbols(
    currencies: &[String],
    tradable: &[SymbolMetadata],
    quote_asset: &str,
) -> Resolution {
    // #1. Live symbols: TRADING status in the requested quote asset
    let live: HashSet<&str> = tradable
        .iter()
        .filter(|m| m.is_tradable_in(quote_asset))
        .map(|m| m.symbol.as_str())
        .collect();

    let mut resolution: Resolution = Resolution::default();
    let mut seen: HashSet<&str> = HashSet::new();

    // #2. Partition
    for currency in currencies {
        if currency == quote_asset || !seen.insert(currency.as_str()) {
            continue;
        }

        let candidate: String = format!("{}{}", currency, quote_asset);
        if live.contains(candidate.as_str()) {
            resolution.resolved.push(ResolvedPair {
                base_currency: currency.clone(),
                symbol: candidate,
            });
        } else {
            resolution.unresolved.push(currency.clone());
        }
    }

    // #3. Deterministic processing order
    resolution.resolved.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    resolution
}
