//! Static mapping from token symbols to each provider's identifiers
//!
//! The registry is built once at startup and only read afterwards, so it is
//! shared behind an `Arc` without any locking.

use crate::{
    error::PriceError,
    types::{ProviderKind, Symbol},
};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Identifiers one symbol is known by, per provider
///
/// A provider may list several identifiers for the same token (a ticker that
/// was renamed on an exchange, for example). They are tried in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderIdentifiers {
    ids: HashMap<ProviderKind, Vec<String>>,
}

impl ProviderIdentifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the identifiers for one provider, replacing any previous list
    pub fn with(mut self, provider: ProviderKind, ids: &[&str]) -> Self {
        self.ids
            .insert(provider, ids.iter().map(|id| id.to_string()).collect());
        self
    }

    /// Identifiers for `provider` in lookup order, empty if it has none
    pub fn for_provider(&self, provider: ProviderKind) -> &[String] {
        self.ids.get(&provider).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Providers that know this symbol
    pub fn providers(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.ids
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(kind, _)| *kind)
    }
}

/// Read-only set of supported symbols
#[derive(Debug, Clone, Default)]
pub struct SymbolRegistry {
    entries: BTreeMap<Symbol, ProviderIdentifiers>,
}

impl SymbolRegistry {
    /// Builds a registry from explicit entries
    pub fn from_entries(entries: impl IntoIterator<Item = (Symbol, ProviderIdentifiers)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// The tokens the service supports out of the box
    ///
    /// CryptoCompare is listed for every symbol and acts as the last resort.
    pub fn builtin() -> Self {
        use ProviderKind::*;

        let table: &[(&str, &[&str], &[&str], &[&str], &[&str])] = &[
            ("BTC", &["bitcoin"], &["BTCUSDT"], &["BTC"], &["BTC"]),
            ("ETH", &["ethereum"], &["ETHUSDT"], &["ETH"], &["ETH"]),
            ("SOL", &["solana"], &["SOLUSDT"], &["SOL"], &["SOL"]),
            ("BNB", &["binancecoin"], &["BNBUSDT"], &["BNB"], &["BNB"]),
            ("XRP", &["ripple"], &["XRPUSDT"], &["XRP"], &["XRP"]),
            ("ADA", &["cardano"], &["ADAUSDT"], &["ADA"], &["ADA"]),
            ("DOGE", &["dogecoin"], &["DOGEUSDT"], &["DOGE"], &["DOGE"]),
            // MATIC was migrated to POL; Binance still answers for either ticker
            ("POL", &["polygon-ecosystem-token"], &["POLUSDT", "MATICUSDT"], &[], &["POL"]),
            ("AVAX", &["avalanche-2"], &["AVAXUSDT"], &["AVAX"], &["AVAX"]),
            ("LINK", &["chainlink"], &["LINKUSDT"], &["LINK"], &["LINK"]),
            ("USDC", &["usd-coin"], &["USDCUSDT"], &[], &["USDC"]),
        ];

        let entries = table
            .iter()
            .filter_map(|(symbol, coingecko, binance, hyperliquid, cryptocompare)| {
                let ids = ProviderIdentifiers::new()
                    .with(CoinGecko, coingecko)
                    .with(Binance, binance)
                    .with(Hyperliquid, hyperliquid)
                    .with(CryptoCompare, cryptocompare);
                Symbol::parse(symbol).ok().map(|symbol| (symbol, ids))
            });

        Self::from_entries(entries)
    }

    /// Loads a registry from JSON
    ///
    /// Expected shape: `{ "BTC": { "coingecko": ["bitcoin"], "binance": ["BTCUSDT"] } }`.
    pub fn from_json(json: &str) -> Result<Self, PriceError> {
        let raw: BTreeMap<String, BTreeMap<String, Vec<String>>> = serde_json::from_str(json)
            .map_err(|e| PriceError::registry(format!("malformed registry JSON: {}", e)))?;

        let mut entries = BTreeMap::new();
        for (raw_symbol, providers) in raw {
            let symbol = Symbol::parse(&raw_symbol)?;
            let mut ids = ProviderIdentifiers::new();
            for (provider_name, provider_ids) in providers {
                let provider = provider_name
                    .parse::<ProviderKind>()
                    .map_err(|e| PriceError::registry(format!("{}: {}", symbol, e)))?;
                if provider_ids.is_empty() || provider_ids.iter().any(|id| id.trim().is_empty()) {
                    return Err(PriceError::registry(format!(
                        "{}: empty identifier for {}",
                        symbol, provider
                    )));
                }
                ids.ids.insert(provider, provider_ids);
            }
            if entries.insert(symbol.clone(), ids).is_some() {
                return Err(PriceError::registry(format!("duplicate symbol {}", symbol)));
            }
        }

        if entries.is_empty() {
            return Err(PriceError::registry("registry defines no symbols"));
        }

        Ok(Self { entries })
    }

    /// Loads a registry from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PriceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| PriceError::registry(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Looks up the provider identifiers for a symbol
    pub fn lookup(&self, symbol: &Symbol) -> Result<&ProviderIdentifiers, PriceError> {
        self.entries
            .get(symbol)
            .ok_or_else(|| PriceError::unsupported(symbol.as_str()))
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.entries.contains_key(symbol)
    }

    /// Supported symbols in sorted order
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
