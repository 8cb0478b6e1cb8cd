//! Fetcher abstraction over the upstream price providers
//!
//! Two seams live here:
//!
//! - [`PriceSource`] is the raw HTTP adapter for one provider. It answers for
//!   a single provider-specific identifier and may fail in any way.
//! - [`PriceFetcher`] is what the resolver calls. Its contract is total: it
//!   always returns a [`FetchOutcome`], never an error.
//!
//! [`ProviderFetcher`] joins the two, doing the registry lookup, trying
//! alternate identifiers in order and folding every failure into
//! [`FetchOutcome::Absent`].

use crate::{
    error::ProviderError,
    registry::SymbolRegistry,
    types::{ProviderKind, Symbol},
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// Result of asking one provider for one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The provider returned a usable price
    Present {
        price_usd: Decimal,
        source: ProviderKind,
    },
    /// The provider had nothing usable for the symbol
    Absent,
}

/// Fetches a price for a symbol from exactly one provider
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// The provider this fetcher queries
    fn provider(&self) -> ProviderKind;

    /// Fetches the current USD price for a symbol
    ///
    /// Implementations must not fail: errors, timeouts and unknown symbols
    /// are all reported as [`FetchOutcome::Absent`].
    async fn fetch(&self, symbol: &Symbol) -> FetchOutcome;
}

/// Raw access to one provider's price endpoint
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// The provider behind this source
    fn provider(&self) -> ProviderKind;

    /// Fetches the USD price for a provider-specific identifier
    ///
    /// # Arguments
    /// * `provider_id` - The identifier as the provider knows it (e.g. "bitcoin", "BTCUSDT")
    async fn fetch_usd_price(&self, provider_id: &str) -> Result<Decimal, ProviderError>;
}

/// [`PriceFetcher`] backed by a [`PriceSource`] and the symbol registry
pub struct ProviderFetcher {
    source: Arc<dyn PriceSource>,
    registry: Arc<SymbolRegistry>,
    timeout: Duration,
}

impl ProviderFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    /// * `source` - The provider adapter
    /// * `registry` - Where provider identifiers are looked up
    /// * `timeout` - Upper bound for one `fetch`, alternates included
    pub fn new(source: Arc<dyn PriceSource>, registry: Arc<SymbolRegistry>, timeout: Duration) -> Self {
        Self {
            source,
            registry,
            timeout,
        }
    }

    /// Tries each identifier in order, returning the first price
    async fn first_price(&self, symbol: &Symbol, ids: &[String]) -> FetchOutcome {
        let provider = self.provider();

        for provider_id in ids {
            match self.source.fetch_usd_price(provider_id).await {
                Ok(price_usd) => {
                    tracing::debug!(
                        symbol = %symbol,
                        provider = %provider,
                        provider_id = %provider_id,
                        price_usd = %price_usd,
                        "Fetched price"
                    );
                    return FetchOutcome::Present {
                        price_usd,
                        source: provider,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        symbol = %symbol,
                        provider = %provider,
                        provider_id = %provider_id,
                        error = %e,
                        "Provider failed to fetch price"
                    );
                }
            }
        }

        FetchOutcome::Absent
    }
}

#[async_trait]
impl PriceFetcher for ProviderFetcher {
    fn provider(&self) -> ProviderKind {
        self.source.provider()
    }

    /// The timeout covers all alternate identifiers together
    async fn fetch(&self, symbol: &Symbol) -> FetchOutcome {
        let provider = self.provider();
        let ids = self
            .registry
            .lookup(symbol)
            .map(|ids| ids.for_provider(provider))
            .unwrap_or(&[]);

        if ids.is_empty() {
            tracing::debug!(symbol = %symbol, provider = %provider, "No identifier for provider, skipping");
            return FetchOutcome::Absent;
        }

        match tokio::time::timeout(self.timeout, self.first_price(symbol, ids)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    symbol = %symbol,
                    provider = %provider,
                    timeout_ms = self.timeout.as_millis() as u64,
                    error = %ProviderError::Timeout,
                    "Provider failed to fetch price"
                );
                FetchOutcome::Absent
            }
        }
    }
}
