//! Static utility scores for supported tokens
//!
//! Served by the API next to prices; the resolver never reads it.

use crate::types::Symbol;
use serde::Serialize;

/// How useful a token is considered, 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UtilityScore {
    pub score: u8,
    pub category: &'static str,
}

const SCORES: &[(&str, u8, &str)] = &[
    ("ADA", 68, "smart-contract platform"),
    ("AVAX", 72, "smart-contract platform"),
    ("BNB", 78, "exchange token"),
    ("BTC", 95, "store of value"),
    ("DOGE", 40, "meme"),
    ("ETH", 93, "smart-contract platform"),
    ("LINK", 80, "oracle"),
    ("POL", 70, "scaling"),
    ("SOL", 85, "smart-contract platform"),
    ("USDC", 88, "stablecoin"),
    ("XRP", 65, "payments"),
];

/// Looks up the utility score of a symbol
pub fn score(symbol: &Symbol) -> Option<UtilityScore> {
    SCORES
        .iter()
        .find(|(s, _, _)| *s == symbol.as_str())
        .map(|(_, score, category)| UtilityScore {
            score: *score,
            category: *category,
        })
}
