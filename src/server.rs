//! HTTP API over the price resolver
//!
//! Routes:
//!
//! - `GET /` service status
//! - `GET /hello/{name}` greeting
//! - `GET /price/{symbol}` single quote
//! - `GET /prices` quotes for every supported token
//! - `GET /utility/{symbol}` static utility score
//! - `GET /health` cache health
//! - `GET /metrics` provider attempt metrics
//!
//! Symbols are parsed here, before the resolver is called. A quote without a
//! price is still a 200 response.

use crate::{
    config::ResolverConfig,
    error::PriceError,
    metrics::ProviderMetrics,
    registry::SymbolRegistry,
    resolver::PriceResolver,
    types::{ComponentHealth, PriceQuote, Symbol},
    utility::{self, UtilityScore},
};
use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Settings for the `price-server` binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// JSON registry replacing the built-in symbol table
    pub registry_path: Option<PathBuf>,
    pub resolver: ResolverConfig,
}

impl ServerConfig {
    /// Reads the process environment
    ///
    /// Invalid resolver values are only reported through `tracing`, so the
    /// subscriber has to be installed first.
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr: SocketAddr = std::env::var("PRICE_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
            .parse()
            .context("Invalid PRICE_LISTEN_ADDR")?;
        let registry_path = std::env::var("PRICE_REGISTRY_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            listen_addr,
            registry_path,
            resolver: ResolverConfig::from_env(),
        })
    }

    /// Loads the configured registry, or the built-in one
    pub fn load_registry(&self) -> Result<SymbolRegistry, PriceError> {
        match &self.registry_path {
            Some(path) => SymbolRegistry::from_path(path),
            None => Ok(SymbolRegistry::builtin()),
        }
    }
}

/// Errors returned by API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Price(#[from] PriceError),
    #[error("{0}")]
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Price(PriceError::InvalidSymbol { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Price(PriceError::UnsupportedSymbol { .. }) => StatusCode::NOT_FOUND,
            ApiError::Price(PriceError::Registry(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

type AppState = Arc<PriceResolver>;

/// Builds the API router
pub fn app_router(resolver: Arc<PriceResolver>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/hello/{name}", get(say_hello))
        .route("/price/{symbol}", get(get_price))
        .route("/prices", get(get_all_prices))
        .route("/utility/{symbol}", get(get_utility))
        .route("/health", get(get_health))
        .route("/metrics", get(get_metrics))
        .with_state(resolver)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Token price service",
        "status": "online",
    }))
}

async fn say_hello(Path(name): Path<String>) -> Json<Value> {
    Json(json!({ "message": format!("Hello {}!", name) }))
}

async fn get_price(
    State(resolver): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<PriceQuote>> {
    let symbol = Symbol::parse(&raw)?;
    let quote = resolver.resolve(&symbol).await?;
    Ok(Json(quote))
}

async fn get_all_prices(State(resolver): State<AppState>) -> Json<BTreeMap<Symbol, PriceQuote>> {
    Json(resolver.resolve_all().await)
}

#[derive(Serialize)]
struct UtilityResponse {
    symbol: Symbol,
    #[serde(flatten)]
    utility: UtilityScore,
}

async fn get_utility(
    State(resolver): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<UtilityResponse>> {
    let symbol = Symbol::parse(&raw)?;
    resolver.registry().lookup(&symbol)?;
    let utility = utility::score(&symbol)
        .ok_or_else(|| ApiError::NotFound(format!("No utility score for {}", symbol)))?;
    Ok(Json(UtilityResponse { symbol, utility }))
}

async fn get_health(State(resolver): State<AppState>) -> Json<ComponentHealth> {
    Json(resolver.health_check().await)
}

async fn get_metrics(State(resolver): State<AppState>) -> Json<Vec<ProviderMetrics>> {
    Json(resolver.provider_metrics().await)
}

/// Builds the resolver and serves the API until Ctrl-C
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let registry = Arc::new(config.load_registry()?);
    let resolver = Arc::new(PriceResolver::from_config(&config.resolver, registry)?);
    let router = app_router(resolver);

    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
