//! HTTP plumbing shared by the provider adapters

use crate::{constants::USER_AGENT, error::ProviderError, types::ProviderKind};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Builds the HTTP client a provider uses for every request
pub(crate) fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(ProviderError::NetworkError)
}

/// Reads the body of a successful response
///
/// 429 maps to [`ProviderError::RateLimitExceeded`], any other non-2xx status
/// to [`ProviderError::ApiError`] carrying the body.
pub(crate) async fn read_success_body(
    response: Response,
    provider: ProviderKind,
) -> Result<String, ProviderError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimitExceeded);
    }

    if !status.is_success() {
        return Err(ProviderError::ApiError(format!(
            "{} HTTP {}: {}",
            provider,
            status,
            response.text().await.unwrap_or_default()
        )));
    }

    response.text().await.map_err(ProviderError::NetworkError)
}
