//! Binance spot ticker price source

use crate::{
    constants::{BINANCE_API_URL, BINANCE_TICKER_PRICE_ENDPOINT},
    error::ProviderError,
    provider::PriceSource,
    providers::http::{build_client, read_success_body},
    types::{decimal_from_str, ProviderKind},
};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Binance `ticker/price` response
#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    price: String,
}

/// Binance price source, keyed by USDT pair ("BTCUSDT")
///
/// USDT pairs are taken as USD.
pub struct BinanceSource {
    client: Client,
    base_url: String,
}

impl BinanceSource {
    /// Creates a new Binance source
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_base_url(timeout, BINANCE_API_URL)
    }

    /// Creates a source against a different API host
    pub fn with_base_url(timeout: Duration, base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

fn parse_response(body: &str, pair: &str) -> Result<Decimal, ProviderError> {
    let ticker: TickerPrice = serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "Failed to parse Binance response: {}. Response: {}",
            e, body
        ))
    })?;

    if !ticker.symbol.eq_ignore_ascii_case(pair) {
        return Err(ProviderError::InvalidResponse(format!(
            "Binance answered for {} instead of {}",
            ticker.symbol, pair
        )));
    }

    decimal_from_str(&ticker.price)
}

#[async_trait]
impl PriceSource for BinanceSource {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Binance
    }

    async fn fetch_usd_price(&self, provider_id: &str) -> Result<Decimal, ProviderError> {
        let url = format!("{}{}", self.base_url, BINANCE_TICKER_PRICE_ENDPOINT);
        tracing::debug!(url = %url, pair = provider_id, "Fetching price from Binance");

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", provider_id)])
            .send()
            .await
            .map_err(ProviderError::NetworkError)?;

        let body = read_success_body(response, self.provider()).await?;
        parse_response(&body, provider_id)
    }
}
