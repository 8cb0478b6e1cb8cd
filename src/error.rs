//! Error types for the token price service

use thiserror::Error;

/// Errors that can occur when querying a single upstream provider
///
/// These never leave the fetcher: [`ProviderFetcher`] logs them and reports
/// the attempt as absent so the fallback chain can move on.
///
/// [`ProviderFetcher`]: crate::provider::ProviderFetcher
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,

    /// Provider reported a price below zero
    #[error("Negative price: {0}")]
    NegativePrice(String),
}

/// Errors returned to callers of the resolver and the registry loader
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Symbol does not match the accepted format
    #[error("Invalid symbol: {symbol}")]
    InvalidSymbol { symbol: String },

    /// Symbol is well-formed but not in the registry
    #[error("Token not supported: {symbol}")]
    UnsupportedSymbol { symbol: String },

    /// Registry definition could not be loaded
    #[error("Invalid registry: {0}")]
    Registry(String),
}

impl PriceError {
    /// Creates an InvalidSymbol error
    pub fn invalid_symbol(symbol: &str) -> Self {
        Self::InvalidSymbol {
            symbol: symbol.to_string(),
        }
    }

    /// Creates an UnsupportedSymbol error
    pub fn unsupported(symbol: &str) -> Self {
        Self::UnsupportedSymbol {
            symbol: symbol.to_string(),
        }
    }

    /// Creates a Registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }
}
