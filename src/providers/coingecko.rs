//! CoinGecko price source

use crate::{
    constants::{COINGECKO_API_URL, COINGECKO_SIMPLE_PRICE_ENDPOINT},
    error::ProviderError,
    provider::PriceSource,
    providers::http::{build_client, read_success_body},
    types::{decimal_from_f64, ProviderKind},
};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// CoinGecko API response for simple price queries
#[derive(Debug, Deserialize)]
struct CoinGeckoResponse {
    #[serde(flatten)]
    prices: HashMap<String, CoinGeckoPriceData>,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoPriceData {
    usd: Option<f64>,
}

/// CoinGecko price source, keyed by CoinGecko coin id ("bitcoin")
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
}

impl CoinGeckoSource {
    /// Creates a new CoinGecko source
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_base_url(timeout, COINGECKO_API_URL)
    }

    /// Creates a source against a different API host
    pub fn with_base_url(timeout: Duration, base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

/// Extracts the USD price for `id` from a simple price response
fn parse_response(body: &str, id: &str) -> Result<Decimal, ProviderError> {
    let response: CoinGeckoResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "Failed to parse CoinGecko response: {}. Response: {}",
            e, body
        ))
    })?;

    let usd = response
        .prices
        .get(id)
        .and_then(|data| data.usd)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("No USD price for {} from CoinGecko", id)))?;

    decimal_from_f64(usd)
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    fn provider(&self) -> ProviderKind {
        ProviderKind::CoinGecko
    }

    async fn fetch_usd_price(&self, provider_id: &str) -> Result<Decimal, ProviderError> {
        let url = format!("{}{}", self.base_url, COINGECKO_SIMPLE_PRICE_ENDPOINT);
        tracing::debug!(url = %url, id = provider_id, "Fetching price from CoinGecko");

        let response = self
            .client
            .get(&url)
            .query(&[("ids", provider_id), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(ProviderError::NetworkError)?;

        let body = read_success_body(response, self.provider()).await?;
        parse_response(&body, provider_id)
    }
}
