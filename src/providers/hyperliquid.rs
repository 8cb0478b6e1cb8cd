//! Hyperliquid mid price source

use crate::{
    constants::HYPERLIQUID_API_URL,
    error::ProviderError,
    provider::PriceSource,
    providers::http::{build_client, read_success_body},
    types::{decimal_from_str, ProviderKind},
};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Hyperliquid API request for info
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum HyperliquidRequest {
    AllMids,
}

/// Hyperliquid API response for allMids
/// Returns a map of coin to mid price as string
#[derive(Debug, Deserialize)]
struct AllMidsResponse(HashMap<String, String>);

/// Hyperliquid price source, keyed by coin name ("BTC")
///
/// Only lists coins with a perpetual market, so it covers fewer tokens than
/// the other providers.
pub struct HyperliquidSource {
    client: Client,
    url: String,
}

impl HyperliquidSource {
    /// Creates a new Hyperliquid source
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_url(timeout, HYPERLIQUID_API_URL)
    }

    /// Creates a source against a different info endpoint
    pub fn with_url(timeout: Duration, url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
        })
    }
}

fn parse_response(body: &str, coin: &str) -> Result<Decimal, ProviderError> {
    let mids: AllMidsResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "Failed to parse Hyperliquid response: {}. Response: {}",
            e, body
        ))
    })?;

    let mid = mids
        .0
        .get(coin)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("No mid price for {} from Hyperliquid", coin)))?;

    decimal_from_str(mid)
}

#[async_trait]
impl PriceSource for HyperliquidSource {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Hyperliquid
    }

    async fn fetch_usd_price(&self, provider_id: &str) -> Result<Decimal, ProviderError> {
        tracing::debug!(url = %self.url, coin = provider_id, "Fetching price from Hyperliquid");

        let response = self
            .client
            .post(&self.url)
            .json(&HyperliquidRequest::AllMids)
            .send()
            .await
            .map_err(ProviderError::NetworkError)?;

        let body = read_success_body(response, self.provider()).await?;
        parse_response(&body, provider_id)
    }
}
