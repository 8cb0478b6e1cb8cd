//! CryptoCompare price source
//!
//! Lists every token the service supports, which is why it sits last in the
//! default provider order.

use crate::{
    constants::{CRYPTOCOMPARE_API_URL, CRYPTOCOMPARE_PRICE_ENDPOINT},
    error::ProviderError,
    provider::PriceSource,
    providers::http::{build_client, read_success_body},
    types::{decimal_from_f64, ProviderKind},
};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;

/// CryptoCompare price source, keyed by ticker ("BTC")
pub struct CryptoCompareSource {
    client: Client,
    base_url: String,
}

impl CryptoCompareSource {
    /// Creates a new CryptoCompare source
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_base_url(timeout, CRYPTOCOMPARE_API_URL)
    }

    /// Creates a source against a different API host
    pub fn with_base_url(timeout: Duration, base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

/// Parses `{"USD": 123.4}`
///
/// Failures come back with HTTP 200 and a `{"Response": "Error"}` body.
fn parse_response(body: &str, ticker: &str) -> Result<Decimal, ProviderError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "Failed to parse CryptoCompare response: {}. Response: {}",
            e, body
        ))
    })?;

    if value["Response"].as_str() == Some("Error") {
        return Err(ProviderError::ApiError(
            value["Message"]
                .as_str()
                .unwrap_or("unknown CryptoCompare error")
                .to_string(),
        ));
    }

    let usd = value["USD"]
        .as_f64()
        .ok_or_else(|| ProviderError::InvalidResponse(format!("No USD price for {} from CryptoCompare", ticker)))?;

    decimal_from_f64(usd)
}

#[async_trait]
impl PriceSource for CryptoCompareSource {
    fn provider(&self) -> ProviderKind {
        ProviderKind::CryptoCompare
    }

    async fn fetch_usd_price(&self, provider_id: &str) -> Result<Decimal, ProviderError> {
        let url = format!("{}{}", self.base_url, CRYPTOCOMPARE_PRICE_ENDPOINT);
        tracing::debug!(url = %url, ticker = provider_id, "Fetching price from CryptoCompare");

        let response = self
            .client
            .get(&url)
            .query(&[("fsym", provider_id), ("tsyms", "USD")])
            .send()
            .await
            .map_err(ProviderError::NetworkError)?;

        let body = read_success_body(response, self.provider()).await?;
        parse_response(&body, provider_id)
    }
}
