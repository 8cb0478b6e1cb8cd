//! Types shared across the registry, cache, fetchers and resolver

use crate::error::{PriceError, ProviderError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Canonical token ticker, 2-10 uppercase ASCII letters or digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Minimum accepted symbol length
    pub const MIN_LEN: usize = 2;
    /// Maximum accepted symbol length
    pub const MAX_LEN: usize = 10;

    /// Parses a raw symbol, normalizing it to uppercase
    ///
    /// Surrounding whitespace is ignored. Anything other than 2-10 ASCII
    /// alphanumerics is rejected.
    pub fn parse(raw: &str) -> Result<Self, PriceError> {
        let normalized = raw.trim().to_ascii_uppercase();
        let valid_len = (Self::MIN_LEN..=Self::MAX_LEN).contains(&normalized.len());
        if !valid_len || !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PriceError::invalid_symbol(raw));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = PriceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl FromStr for Symbol {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Upstream price sources known to the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// CoinGecko simple price API
    CoinGecko,
    /// Binance spot ticker
    Binance,
    /// Hyperliquid mid prices
    Hyperliquid,
    /// CryptoCompare single price API
    CryptoCompare,
}

impl ProviderKind {
    /// Get the provider name as used in quotes, logs and configuration
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::CoinGecko => "coingecko",
            ProviderKind::Binance => "binance",
            ProviderKind::Hyperliquid => "hyperliquid",
            ProviderKind::CryptoCompare => "cryptocompare",
        }
    }

    /// Get all known providers
    pub fn all() -> &'static [ProviderKind] {
        &[
            ProviderKind::CoinGecko,
            ProviderKind::Binance,
            ProviderKind::Hyperliquid,
            ProviderKind::CryptoCompare,
        ]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| format!("unknown provider '{}'", s.trim()))
    }
}

/// How a quote was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteOrigin {
    /// Fetched from a provider during this resolution
    Fetched,
    /// Served from a cache entry inside the freshness window
    Cached,
    /// Served from a cache entry outside the freshness window
    Stale,
    /// No provider and no cache entry had a price
    Unavailable,
}

/// Resolved price for a symbol, possibly empty
///
/// `price_usd` and `source` are either both present or both absent. The
/// constructors are the only way to build a quote, which keeps them paired.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    symbol: Symbol,
    price_usd: Option<Decimal>,
    source: Option<ProviderKind>,
    observed_at: DateTime<Utc>,
    origin: QuoteOrigin,
}

impl PriceQuote {
    /// Create a quote carrying a price
    pub fn present(
        symbol: Symbol,
        price_usd: Decimal,
        source: ProviderKind,
        observed_at: DateTime<Utc>,
        origin: QuoteOrigin,
    ) -> Self {
        Self {
            symbol,
            price_usd: Some(price_usd),
            source: Some(source),
            observed_at,
            origin,
        }
    }

    /// Create an explicit "no price available" quote
    pub fn unavailable(symbol: Symbol, observed_at: DateTime<Utc>) -> Self {
        Self {
            symbol,
            price_usd: None,
            source: None,
            observed_at,
            origin: QuoteOrigin::Unavailable,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn price_usd(&self) -> Option<Decimal> {
        self.price_usd
    }

    pub fn source(&self) -> Option<ProviderKind> {
        self.source
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn origin(&self) -> QuoteOrigin {
        self.origin
    }

    /// True if the quote carries a price
    pub fn is_available(&self) -> bool {
        self.price_usd.is_some()
    }
}

/// Converts a provider's floating point price into a non-negative decimal
pub fn decimal_from_f64(value: f64) -> Result<Decimal, ProviderError> {
    let amount = Decimal::try_from(value)
        .map_err(|e| ProviderError::InvalidResponse(format!("price {} not representable: {}", value, e)))?;
    ensure_non_negative(amount)
}

/// Parses a provider's string price into a non-negative decimal
pub fn decimal_from_str(value: &str) -> Result<Decimal, ProviderError> {
    let trimmed = value.trim();
    let amount = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|e| ProviderError::InvalidResponse(format!("price '{}' not parseable: {}", value, e)))?;
    ensure_non_negative(amount)
}

fn ensure_non_negative(amount: Decimal) -> Result<Decimal, ProviderError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ProviderError::NegativePrice(amount.to_string()));
    }
    Ok(amount)
}

/// Events published by the resolver
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceEvent {
    /// A provider returned a price and the cache was updated
    PriceUpdated {
        id: Uuid,
        symbol: Symbol,
        old_price_usd: Option<Decimal>,
        new_price_usd: Decimal,
        source: ProviderKind,
        timestamp: DateTime<Utc>,
    },

    /// Every provider was absent and a stale cache entry was served
    ServedStale {
        id: Uuid,
        symbol: Symbol,
        price_usd: Decimal,
        source: ProviderKind,
        observed_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// No provider and no cache entry could supply a price
    PriceUnavailable {
        id: Uuid,
        symbol: Symbol,
        timestamp: DateTime<Utc>,
    },
}

impl PriceEvent {
    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            PriceEvent::PriceUpdated { id, .. } => *id,
            PriceEvent::ServedStale { id, .. } => *id,
            PriceEvent::PriceUnavailable { id, .. } => *id,
        }
    }

    /// Get the symbol the event concerns
    pub fn symbol(&self) -> &Symbol {
        match self {
            PriceEvent::PriceUpdated { symbol, .. } => symbol,
            PriceEvent::ServedStale { symbol, .. } => symbol,
            PriceEvent::PriceUnavailable { symbol, .. } => symbol,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            PriceEvent::PriceUpdated { .. } => "PRICE_UPDATED",
            PriceEvent::ServedStale { .. } => "SERVED_STALE",
            PriceEvent::PriceUnavailable { .. } => "PRICE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for PriceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceEvent::PriceUpdated {
                symbol,
                new_price_usd,
                source,
                ..
            } => write!(f, "Price updated: {} = ${:.2} ({})", symbol, new_price_usd, source),
            PriceEvent::ServedStale {
                symbol,
                price_usd,
                observed_at,
                ..
            } => write!(
                f,
                "Stale price served: {} = ${:.2} (observed {})",
                symbol, price_usd, observed_at
            ),
            PriceEvent::PriceUnavailable { symbol, .. } => {
                write!(f, "No price available for {}", symbol)
            }
        }
    }
}

/// Overall system health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Every supported symbol has a fresh price
    Healthy,
    /// Some symbols are stale or not yet resolved
    Degraded,
    /// No price has been resolved yet
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
