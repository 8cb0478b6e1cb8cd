//! # Token Price Service
//!
//! USD prices for a fixed set of crypto tokens, sourced from several
//! independent upstream providers.
//!
//! A [`PriceResolver`] answers each request from a short-lived cache and, on
//! a miss, asks the providers one at a time in priority order. When every
//! provider fails it falls back to the last known price, however old, and
//! only then reports that no price is available.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use token_price_service::{PriceResolver, ResolverConfig, Symbol, SymbolRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(SymbolRegistry::builtin());
//! let resolver = PriceResolver::from_config(&ResolverConfig::from_env(), registry)?;
//!
//! // Get a single price
//! let quote = resolver.resolve(&Symbol::parse("SOL")?).await?;
//! if let (Some(price), Some(source)) = (quote.price_usd(), quote.source()) {
//!     println!("SOL: ${:.2} from {}", price, source);
//! }
//!
//! // Get all prices
//! for (symbol, quote) in resolver.resolve_all().await {
//!     println!("{}: {:?}", symbol, quote.price_usd());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Provider failures never reach the caller. The only error from
//! [`PriceResolver::resolve`] is an unsupported symbol:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use token_price_service::{PriceError, PriceResolver, ResolverConfig, Symbol, SymbolRegistry};
//! # async fn example(resolver: PriceResolver) -> Result<(), PriceError> {
//! match resolver.resolve(&Symbol::parse("PEPE")?).await {
//!     Ok(quote) if quote.is_available() => println!("{:?}", quote.price_usd()),
//!     Ok(_) => println!("No price available right now"),
//!     Err(PriceError::UnsupportedSymbol { symbol }) => println!("{} is not supported", symbol),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Adding New Providers
//!
//! 1. Add a variant to [`ProviderKind`]
//! 2. Implement [`PriceSource`](provider::PriceSource) under `providers/`
//! 3. Wire it into [`providers::source_for`] and list its ids in the registry

pub mod cache;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod types;
pub mod utility;

// Re-export commonly used types
pub use cache::{CacheEntry, PriceCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ResolverConfig;
pub use error::{PriceError, ProviderError};
pub use metrics::ProviderMetrics;
pub use provider::{FetchOutcome, PriceFetcher, PriceSource, ProviderFetcher};
pub use registry::{ProviderIdentifiers, SymbolRegistry};
pub use resolver::PriceResolver;
pub use types::{
    ComponentHealth, HealthStatus, PriceEvent, PriceQuote, ProviderKind, QuoteOrigin, Symbol,
};
