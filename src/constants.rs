//! Default settings for the price resolver
//!
//! These are the compile-time defaults behind [`ResolverConfig::default`].
//! Every duration and the provider order can be overridden at runtime
//! through [`ResolverConfig::from_env`].
//!
//! [`ResolverConfig::default`]: crate::config::ResolverConfig
//! [`ResolverConfig::from_env`]: crate::config::ResolverConfig::from_env

use crate::types::ProviderKind;

/// How long a cached price counts as fresh (in seconds)
pub const FRESHNESS_WINDOW_SECS: u64 = 120;

/// HTTP request timeout for a single provider call (in milliseconds)
pub const REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Provider priority, most complete first, guaranteed fallback last
pub const DEFAULT_PROVIDER_ORDER: &[ProviderKind] = &[
    ProviderKind::CoinGecko,
    ProviderKind::Binance,
    ProviderKind::Hyperliquid,
    ProviderKind::CryptoCompare,
];

/// Capacity of the price event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko API endpoint for simple price queries
pub const COINGECKO_SIMPLE_PRICE_ENDPOINT: &str = "/simple/price";

/// Binance spot API base URL
pub const BINANCE_API_URL: &str = "https://api.binance.com";

/// Binance endpoint for the latest ticker price
pub const BINANCE_TICKER_PRICE_ENDPOINT: &str = "/api/v3/ticker/price";

/// Hyperliquid API base URL
pub const HYPERLIQUID_API_URL: &str = "https://api.hyperliquid.xyz/info";

/// CryptoCompare API base URL
pub const CRYPTOCOMPARE_API_URL: &str = "https://min-api.cryptocompare.com";

/// CryptoCompare endpoint for single-symbol prices
pub const CRYPTOCOMPARE_PRICE_ENDPOINT: &str = "/data/price";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "token-price-service/0.1.0";
