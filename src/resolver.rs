//! Price resolution engine
//!
//! Resolving a symbol goes through these steps, stopping at the first one
//! that produces a price:
//!
//! 1. Unsupported symbols are rejected before the cache or any provider is
//!    touched.
//! 2. A fresh cache entry is returned without any network call.
//! 3. Fetchers are asked one after another in priority order. The first
//!    price is written to the cache and returned; later fetchers are never
//!    called.
//! 4. If every fetcher is absent, the cached entry is served whatever its
//!    age (subject to `max_stale_age`).
//! 5. Otherwise an explicit "unavailable" quote is returned.
//!
//! ```text
//! resolve(symbol)
//!     ↓ registry miss → PriceError::UnsupportedSymbol
//! PriceCache::get_fresh ── hit → Cached quote
//!     ↓ miss
//! fetcher 1 → fetcher 2 → ... → fetcher N   (sequential, first Present wins)
//!     ↓ all Absent                ↓ Present → PriceCache::put → Fetched quote
//! PriceCache::get_any ── hit → Stale quote
//!     ↓ miss
//! Unavailable quote
//! ```

use crate::{
    cache::{CacheEntry, PriceCache},
    clock::{Clock, SystemClock},
    config::ResolverConfig,
    constants::EVENT_CHANNEL_CAPACITY,
    error::{PriceError, ProviderError},
    metrics::{MetricsCollector, ProviderMetrics},
    provider::{FetchOutcome, PriceFetcher, ProviderFetcher},
    providers::source_for,
    registry::SymbolRegistry,
    types::{
        ComponentHealth, HealthStatus, PriceEvent, PriceQuote, ProviderKind, QuoteOrigin, Symbol,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use uuid::Uuid;

/// A fetcher together with the metrics of its attempts
struct RankedFetcher {
    fetcher: Arc<dyn PriceFetcher>,
    metrics: MetricsCollector,
}

/// Resolves token prices from the cache and an ordered chain of fetchers
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use token_price_service::{PriceResolver, ResolverConfig, Symbol, SymbolRegistry};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Arc::new(SymbolRegistry::builtin());
/// let resolver = PriceResolver::from_config(&ResolverConfig::default(), registry)?;
///
/// let quote = resolver.resolve(&Symbol::parse("BTC")?).await?;
/// match quote.price_usd() {
///     Some(price) => println!("BTC: ${:.2}", price),
///     None => println!("BTC: no price available"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct PriceResolver {
    registry: Arc<SymbolRegistry>,
    cache: Arc<PriceCache>,
    fetchers: Vec<RankedFetcher>,
    max_stale_age: Option<Duration>,
    events: broadcast::Sender<PriceEvent>,
}

impl PriceResolver {
    /// Creates a resolver over explicit fetchers
    ///
    /// # Arguments
    /// * `registry` - Supported symbols
    /// * `cache` - Price cache, also the resolver's clock
    /// * `fetchers` - Fetchers in priority order, most preferred first
    pub fn new(
        registry: Arc<SymbolRegistry>,
        cache: Arc<PriceCache>,
        fetchers: Vec<Arc<dyn PriceFetcher>>,
    ) -> Self {
        let fetchers = fetchers
            .into_iter()
            .map(|fetcher| RankedFetcher {
                metrics: MetricsCollector::new(fetcher.provider()),
                fetcher,
            })
            .collect();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            registry,
            cache,
            fetchers,
            max_stale_age: None,
            events,
        }
    }

    /// Creates a resolver that queries the live providers
    ///
    /// Providers are consulted in `config.provider_order`.
    pub fn from_config(
        config: &ResolverConfig,
        registry: Arc<SymbolRegistry>,
    ) -> Result<Self, ProviderError> {
        Self::from_config_with_clock(config, registry, Arc::new(SystemClock))
    }

    /// Like [`from_config`](Self::from_config) with an explicit clock
    pub fn from_config_with_clock(
        config: &ResolverConfig,
        registry: Arc<SymbolRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ProviderError> {
        let fetchers = config
            .provider_order
            .iter()
            .map(|provider| {
                let source = source_for(*provider, config.request_timeout)?;
                let fetcher: Arc<dyn PriceFetcher> = Arc::new(ProviderFetcher::new(
                    source,
                    registry.clone(),
                    config.request_timeout,
                ));
                Ok(fetcher)
            })
            .collect::<Result<Vec<_>, ProviderError>>()?;

        let cache = Arc::new(PriceCache::new(config.freshness_window, clock));

        tracing::info!(
            providers = ?config.provider_order,
            freshness_window_secs = config.freshness_window.as_secs(),
            request_timeout_ms = config.request_timeout.as_millis() as u64,
            symbols = registry.len(),
            "Price resolver configured"
        );

        Ok(Self::new(registry, cache, fetchers).with_max_stale_age(config.max_stale_age))
    }

    /// Stops serving stale entries older than `max_age`
    pub fn with_max_stale_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_stale_age = max_age;
        self
    }

    pub fn registry(&self) -> &Arc<SymbolRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<PriceCache> {
        &self.cache
    }

    /// Providers in the order they are consulted
    pub fn provider_order(&self) -> Vec<ProviderKind> {
        self.fetchers.iter().map(|f| f.fetcher.provider()).collect()
    }

    /// Subscribes to price events
    pub fn subscribe(&self) -> broadcast::Receiver<PriceEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: PriceEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Resolves the current price of a symbol
    ///
    /// Only an unsupported symbol is an error. A symbol that no provider and
    /// no cache entry can price yields a quote without price or source.
    pub async fn resolve(&self, symbol: &Symbol) -> Result<PriceQuote, PriceError> {
        self.registry.lookup(symbol)?;
        Ok(self.resolve_registered(symbol).await)
    }

    /// Resolves every symbol in the registry
    ///
    /// Symbols are resolved concurrently and independently: a symbol whose
    /// providers all fail or time out gets its own fallback quote and does
    /// not affect the others.
    pub async fn resolve_all(&self) -> BTreeMap<Symbol, PriceQuote> {
        let resolutions = self.registry.symbols().map(|symbol| async move {
            let quote = self.resolve_registered(symbol).await;
            (symbol.clone(), quote)
        });

        join_all(resolutions).await.into_iter().collect()
    }

    async fn resolve_registered(&self, symbol: &Symbol) -> PriceQuote {
        if let Some(entry) = self.cache.get_fresh(symbol).await {
            tracing::debug!(symbol = %symbol, source = %entry.source, "Serving fresh cached price");
            return quote_from_entry(symbol, entry, QuoteOrigin::Cached);
        }

        if let Some(quote) = self.fetch_through_chain(symbol).await {
            return quote;
        }

        self.fallback_to_cache(symbol).await
    }

    /// Walks the fetchers in order and caches the first price found
    async fn fetch_through_chain(&self, symbol: &Symbol) -> Option<PriceQuote> {
        for ranked in &self.fetchers {
            let started = Instant::now();
            let outcome = ranked.fetcher.fetch(symbol).await;
            let present = matches!(outcome, FetchOutcome::Present { .. });
            ranked.metrics.record_request(started.elapsed(), present).await;

            match outcome {
                FetchOutcome::Present { price_usd, source } => {
                    let observed_at = self.cache.now();
                    let previous = self.cache.get_any(symbol).await;
                    if !self.cache.put(symbol, price_usd, source, observed_at).await {
                        return Some(self.newer_entry(symbol, price_usd, source, observed_at).await);
                    }

                    tracing::debug!(
                        symbol = %symbol,
                        source = %source,
                        price_usd = %price_usd,
                        latency_ms = started.elapsed().as_millis() as u64,
                        "Resolved price from provider"
                    );
                    self.publish(PriceEvent::PriceUpdated {
                        id: Uuid::new_v4(),
                        symbol: symbol.clone(),
                        old_price_usd: previous.map(|entry| entry.price_usd),
                        new_price_usd: price_usd,
                        source,
                        timestamp: Utc::now(),
                    });

                    return Some(PriceQuote::present(
                        symbol.clone(),
                        price_usd,
                        source,
                        observed_at,
                        QuoteOrigin::Fetched,
                    ));
                }
                FetchOutcome::Absent => {
                    tracing::debug!(
                        symbol = %symbol,
                        provider = %ranked.fetcher.provider(),
                        "Provider absent, trying next"
                    );
                }
            }
        }

        None
    }

    /// Quote for a fetch that lost the race against a newer cached entry
    async fn newer_entry(
        &self,
        symbol: &Symbol,
        price_usd: Decimal,
        source: ProviderKind,
        observed_at: DateTime<Utc>,
    ) -> PriceQuote {
        match self.cache.get_any(symbol).await {
            Some(entry) => {
                tracing::debug!(
                    symbol = %symbol,
                    source = %source,
                    cached_observed_at = %entry.observed_at,
                    "Newer price already cached, discarding fetched price"
                );
                quote_from_entry(symbol, entry, QuoteOrigin::Cached)
            }
            None => PriceQuote::present(symbol.clone(), price_usd, source, observed_at, QuoteOrigin::Fetched),
        }
    }

    /// Serves whatever the cache holds once every provider is absent
    async fn fallback_to_cache(&self, symbol: &Symbol) -> PriceQuote {
        let now = self.cache.now();

        match self.cache.get_any(symbol).await {
            Some(entry) if self.within_stale_limit(&entry) => {
                let origin = if self.cache.is_fresh(entry.observed_at) {
                    // Another resolution refreshed the entry meanwhile
                    QuoteOrigin::Cached
                } else {
                    QuoteOrigin::Stale
                };
                tracing::warn!(
                    symbol = %symbol,
                    source = %entry.source,
                    observed_at = %entry.observed_at,
                    "All providers absent, serving cached price"
                );
                if origin == QuoteOrigin::Stale {
                    self.publish(PriceEvent::ServedStale {
                        id: Uuid::new_v4(),
                        symbol: symbol.clone(),
                        price_usd: entry.price_usd,
                        source: entry.source,
                        observed_at: entry.observed_at,
                        timestamp: Utc::now(),
                    });
                }
                quote_from_entry(symbol, entry, origin)
            }
            Some(entry) => {
                tracing::warn!(
                    symbol = %symbol,
                    observed_at = %entry.observed_at,
                    "All providers absent and cached price is too old to serve"
                );
                self.unavailable(symbol, now)
            }
            None => {
                tracing::warn!(symbol = %symbol, "All providers absent and nothing cached");
                self.unavailable(symbol, now)
            }
        }
    }

    fn within_stale_limit(&self, entry: &CacheEntry) -> bool {
        let Some(max_age) = self.max_stale_age else {
            return true;
        };
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => self.cache.now().signed_duration_since(entry.observed_at) <= max_age,
            Err(_) => true,
        }
    }

    fn unavailable(&self, symbol: &Symbol, now: DateTime<Utc>) -> PriceQuote {
        self.publish(PriceEvent::PriceUnavailable {
            id: Uuid::new_v4(),
            symbol: symbol.clone(),
            timestamp: Utc::now(),
        });
        PriceQuote::unavailable(symbol.clone(), now)
    }

    /// Gets attempt metrics for every provider, in priority order
    pub async fn provider_metrics(&self) -> Vec<ProviderMetrics> {
        let mut result = Vec::with_capacity(self.fetchers.len());
        for ranked in &self.fetchers {
            result.push(ranked.metrics.get_metrics().await);
        }
        result
    }

    /// Reports how much of the registry the cache can currently serve
    ///
    /// # Returns
    /// `Healthy` when every symbol is fresh, `Unhealthy` when nothing has
    /// been cached yet, `Degraded` otherwise.
    pub async fn health_check(&self) -> ComponentHealth {
        let snapshot = self.cache.snapshot().await;

        let mut fresh = Vec::new();
        let mut stale = Vec::new();
        let mut missing = Vec::new();
        for symbol in self.registry.symbols() {
            match snapshot.get(symbol) {
                Some(entry) if self.cache.is_fresh(entry.observed_at) => fresh.push(symbol.to_string()),
                Some(_) => stale.push(symbol.to_string()),
                None => missing.push(symbol.to_string()),
            }
        }

        let status = if stale.is_empty() && missing.is_empty() {
            HealthStatus::Healthy
        } else if fresh.is_empty() && stale.is_empty() {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Degraded
        };

        let message = match status {
            HealthStatus::Healthy => "All supported tokens have fresh prices".to_string(),
            HealthStatus::Degraded => format!(
                "{} stale and {} unresolved of {} tokens",
                stale.len(),
                missing.len(),
                self.registry.len()
            ),
            HealthStatus::Unhealthy => "No prices resolved yet".to_string(),
        };

        let providers: Vec<&str> = self.provider_order().iter().map(|p| p.name()).collect();
        let mut details = HashMap::new();
        details.insert("fresh".to_string(), serde_json::json!(fresh));
        details.insert("stale".to_string(), serde_json::json!(stale));
        details.insert("unresolved".to_string(), serde_json::json!(missing));
        details.insert("providers".to_string(), serde_json::json!(providers));
        details.insert(
            "freshness_window_secs".to_string(),
            serde_json::json!(self.cache.freshness_window().as_secs()),
        );

        ComponentHealth {
            name: "price_resolver".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: Utc::now(),
        }
    }
}

fn quote_from_entry(symbol: &Symbol, entry: CacheEntry, origin: QuoteOrigin) -> PriceQuote {
    PriceQuote::present(
        symbol.clone(),
        entry.price_usd,
        entry.source,
        entry.observed_at,
        origin,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::provider::mock::{MockFetcher, MockReply, MockSource};
    use crate::registry::ProviderIdentifiers;

    const ORDER: [ProviderKind; 4] = [
        ProviderKind::CoinGecko,
        ProviderKind::Binance,
        ProviderKind::Hyperliquid,
        ProviderKind::CryptoCompare,
    ];

    struct Harness {
        clock: Arc<ManualClock>,
        cache: Arc<PriceCache>,
        fetchers: Vec<Arc<MockFetcher>>,
        resolver: PriceResolver,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(PriceCache::new(Duration::from_secs(120), clock.clone()));
        let fetchers: Vec<Arc<MockFetcher>> =
            ORDER.iter().map(|p| Arc::new(MockFetcher::new(*p))).collect();
        let resolver = PriceResolver::new(
            Arc::new(SymbolRegistry::builtin()),
            cache.clone(),
            fetchers
                .iter()
                .map(|f| f.clone() as Arc<dyn PriceFetcher>)
                .collect(),
        );
        Harness {
            clock,
            cache,
            fetchers,
            resolver,
        }
    }

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn total_calls(h: &Harness) -> usize {
        h.fetchers.iter().map(|f| f.call_count()).sum()
    }

    #[tokio::test]
    async fn test_every_registered_symbol_resolves_without_error() {
        let h = harness();
        h.fetchers[0].set_price(&sym("BTC"), Decimal::from(67000));

        let symbols: Vec<Symbol> = h.resolver.registry().symbols().cloned().collect();
        for symbol in &symbols {
            let quote = h.resolver.resolve(symbol).await.unwrap();
            assert_eq!(quote.symbol(), symbol);
            assert_eq!(quote.price_usd().is_some(), quote.source().is_some());
        }
    }

    #[tokio::test]
    async fn test_fresh_cache_hit_skips_providers() {
        let h = harness();
        let btc = sym("BTC");
        h.fetchers[0].set_price(&btc, Decimal::from(67000));

        let first = h.resolver.resolve(&btc).await.unwrap();
        assert_eq!(first.origin(), QuoteOrigin::Fetched);

        for fetcher in &h.fetchers {
            fetcher.clear();
        }
        h.clock.advance(chrono::Duration::seconds(60));
        let calls_before = total_calls(&h);

        let second = h.resolver.resolve(&btc).await.unwrap();
        assert_eq!(second.origin(), QuoteOrigin::Cached);
        assert_eq!(second.price_usd(), first.price_usd());
        assert_eq!(second.source(), first.source());
        assert_eq!(second.observed_at(), first.observed_at());
        assert_eq!(total_calls(&h), calls_before);
    }

    #[tokio::test]
    async fn test_fallback_stops_at_first_present_provider() {
        let h = harness();
        let eth = sym("ETH");
        h.fetchers[2].set_price(&eth, Decimal::new(312015, 2));
        h.fetchers[3].set_price(&eth, Decimal::from(1));

        let quote = h.resolver.resolve(&eth).await.unwrap();

        assert_eq!(quote.source(), Some(ProviderKind::Hyperliquid));
        assert_eq!(quote.price_usd(), Some(Decimal::new(312015, 2)));
        assert_eq!(h.fetchers[0].calls_for(&eth), 1);
        assert_eq!(h.fetchers[1].calls_for(&eth), 1);
        assert_eq!(h.fetchers[2].calls_for(&eth), 1);
        assert_eq!(h.fetchers[3].call_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_entry_served_when_all_providers_absent() {
        let h = harness();
        let sol = sym("SOL");
        let observed_at = h.clock.now();
        h.cache
            .put(&sol, Decimal::new(15025, 2), ProviderKind::Binance, observed_at)
            .await;
        h.clock.advance(chrono::Duration::seconds(121));

        let quote = h.resolver.resolve(&sol).await.unwrap();

        assert_eq!(quote.origin(), QuoteOrigin::Stale);
        assert_eq!(quote.price_usd(), Some(Decimal::new(15025, 2)));
        assert_eq!(quote.source(), Some(ProviderKind::Binance));
        assert_eq!(quote.observed_at(), observed_at);
        for fetcher in &h.fetchers {
            assert_eq!(fetcher.calls_for(&sol), 1);
        }
    }

    #[tokio::test]
    async fn test_cold_total_failure_is_an_empty_quote() {
        let h = harness();
        let quote = h.resolver.resolve(&sym("DOGE")).await.unwrap();

        assert_eq!(quote.origin(), QuoteOrigin::Unavailable);
        assert_eq!(quote.price_usd(), None);
        assert_eq!(quote.source(), None);
    }

    #[tokio::test]
    async fn test_successful_fetch_writes_through() {
        let h = harness();
        let ada = sym("ADA");
        h.fetchers[1].set_price(&ada, Decimal::new(45, 2));
        let before = h.clock.now();

        h.resolver.resolve(&ada).await.unwrap();

        let entry = h.cache.get_any(&ada).await.unwrap();
        assert_eq!(entry.source, ProviderKind::Binance);
        assert_eq!(entry.price_usd, Decimal::new(45, 2));
        assert!(entry.observed_at >= before);
    }

    #[tokio::test]
    async fn test_expired_entry_refreshed_from_providers() {
        let h = harness();
        let btc = sym("BTC");
        h.fetchers[0].set_price(&btc, Decimal::from(60000));
        h.resolver.resolve(&btc).await.unwrap();

        h.clock.advance(chrono::Duration::seconds(300));
        h.fetchers[0].set_price(&btc, Decimal::from(61000));

        let quote = h.resolver.resolve(&btc).await.unwrap();
        assert_eq!(quote.origin(), QuoteOrigin::Fetched);
        assert_eq!(quote.price_usd(), Some(Decimal::from(61000)));
        assert_eq!(h.fetchers[0].calls_for(&btc), 2);
    }

    #[tokio::test]
    async fn test_unsupported_symbol_touches_nothing() {
        let h = harness();
        let result = h.resolver.resolve(&sym("NOPE")).await;

        assert_eq!(result, Err(PriceError::unsupported("NOPE")));
        assert_eq!(total_calls(&h), 0);
        assert!(h.cache.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_max_stale_age_suppresses_ancient_entries() {
        let h = harness();
        let resolver = PriceResolver::new(
            h.resolver.registry().clone(),
            h.cache.clone(),
            h.fetchers
                .iter()
                .map(|f| f.clone() as Arc<dyn PriceFetcher>)
                .collect(),
        )
        .with_max_stale_age(Some(Duration::from_secs(3600)));

        let xrp = sym("XRP");
        h.cache
            .put(&xrp, Decimal::new(52, 2), ProviderKind::CoinGecko, h.clock.now())
            .await;

        h.clock.advance(chrono::Duration::minutes(30));
        let quote = resolver.resolve(&xrp).await.unwrap();
        assert_eq!(quote.origin(), QuoteOrigin::Stale);

        h.clock.advance(chrono::Duration::days(2));
        let quote = resolver.resolve(&xrp).await.unwrap();
        assert_eq!(quote.origin(), QuoteOrigin::Unavailable);
        // The entry itself is kept
        assert!(h.cache.get_any(&xrp).await.is_some());
    }

    #[tokio::test]
    async fn test_resolve_all_isolates_failing_symbol() {
        let h = harness();
        let symbols: Vec<Symbol> = h.resolver.registry().symbols().cloned().collect();
        let broken = sym("LINK");
        for symbol in symbols.iter().filter(|s| **s != broken) {
            h.fetchers[3].set_price(symbol, Decimal::from(10));
        }

        let quotes = h.resolver.resolve_all().await;

        assert_eq!(quotes.len(), symbols.len());
        for (symbol, quote) in &quotes {
            if *symbol == broken {
                assert_eq!(quote.origin(), QuoteOrigin::Unavailable);
            } else {
                assert_eq!(quote.price_usd(), Some(Decimal::from(10)));
                assert_eq!(quote.source(), Some(ProviderKind::CryptoCompare));
            }
        }
    }

    #[tokio::test]
    async fn test_resolve_all_with_hanging_provider() {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(PriceCache::new(Duration::from_secs(120), clock));
        let registry = Arc::new(SymbolRegistry::from_entries(
            ["BTC", "ETH", "SOL"].iter().map(|s| {
                (
                    sym(s),
                    ProviderIdentifiers::new().with(ProviderKind::CryptoCompare, &[*s]),
                )
            }),
        ));
        let source = Arc::new(MockSource::new(ProviderKind::CryptoCompare));
        source.reply("BTC", MockReply::Price(Decimal::from(67000)));
        source.reply("ETH", MockReply::Hang);
        source.reply("SOL", MockReply::Price(Decimal::from(150)));
        let fetcher: Arc<dyn PriceFetcher> = Arc::new(ProviderFetcher::new(
            source,
            registry.clone(),
            Duration::from_millis(50),
        ));
        let resolver = PriceResolver::new(registry, cache, vec![fetcher]);

        let quotes = resolver.resolve_all().await;

        assert_eq!(quotes[&sym("BTC")].price_usd(), Some(Decimal::from(67000)));
        assert_eq!(quotes[&sym("SOL")].price_usd(), Some(Decimal::from(150)));
        assert_eq!(quotes[&sym("ETH")].origin(), QuoteOrigin::Unavailable);
    }

    #[tokio::test]
    async fn test_resolve_all_runs_symbols_concurrently() {
        let h = harness();
        for fetcher in &h.fetchers {
            fetcher.set_delay(Duration::from_millis(100));
        }
        for symbol in h.resolver.registry().symbols() {
            h.fetchers[0].set_price(symbol, Decimal::ONE);
        }

        let started = Instant::now();
        let quotes = h.resolver.resolve_all().await;

        assert!(quotes.values().all(|q| q.is_available()));
        // Sequential resolution of 11 symbols would take over a second
        assert!(started.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_events_published() {
        let h = harness();
        let mut events = h.resolver.subscribe();
        let bnb = sym("BNB");

        h.fetchers[0].set_price(&bnb, Decimal::from(600));
        h.resolver.resolve(&bnb).await.unwrap();
        let updated = events.recv().await.unwrap();
        assert_eq!(updated.symbol(), &bnb);
        match updated.clone() {
            PriceEvent::PriceUpdated {
                symbol,
                old_price_usd,
                new_price_usd,
                source,
                ..
            } => {
                assert_eq!(symbol, bnb);
                assert_eq!(old_price_usd, None);
                assert_eq!(new_price_usd, Decimal::from(600));
                assert_eq!(source, ProviderKind::CoinGecko);
            }
            other => panic!("unexpected event {}", other),
        }

        h.fetchers[0].clear();
        h.clock.advance(chrono::Duration::seconds(200));
        h.resolver.resolve(&bnb).await.unwrap();
        let stale = events.recv().await.unwrap();
        assert_eq!(stale.event_type(), "SERVED_STALE");
        assert_eq!(stale.symbol(), &bnb);
        assert_ne!(stale.id(), updated.id());

        h.resolver.resolve(&sym("AVAX")).await.unwrap();
        let unavailable = events.recv().await.unwrap();
        assert_eq!(unavailable.event_type(), "PRICE_UNAVAILABLE");
        assert_eq!(unavailable.symbol(), &sym("AVAX"));
    }

    #[tokio::test]
    async fn test_fetch_older_than_cached_entry_is_not_published() {
        let h = harness();
        let link = sym("LINK");
        h.fetchers[0].set_price(&link, Decimal::from(14));
        h.fetchers[0].set_delay(Duration::from_millis(100));
        let mut events = h.resolver.subscribe();
        let newer = h.clock.now() + chrono::Duration::seconds(10);

        // Another writer stores a newer price while the fetch is in flight
        let (quote, stored) = tokio::join!(h.resolver.resolve(&link), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            h.cache
                .put(&link, Decimal::from(15), ProviderKind::CryptoCompare, newer)
                .await
        });
        assert!(stored);

        let quote = quote.unwrap();
        assert_eq!(quote.origin(), QuoteOrigin::Cached);
        assert_eq!(quote.price_usd(), Some(Decimal::from(15)));
        assert_eq!(quote.source(), Some(ProviderKind::CryptoCompare));
        assert_eq!(quote.observed_at(), newer);
        assert!(events.try_recv().is_err());

        let entry = h.cache.get_any(&link).await.unwrap();
        assert_eq!(entry.observed_at, newer);
    }

    #[tokio::test]
    async fn test_metrics_count_absent_attempts() {
        let h = harness();
        let eth = sym("ETH");
        h.fetchers[1].set_price(&eth, Decimal::from(3000));
        h.resolver.resolve(&eth).await.unwrap();

        let metrics = h.resolver.provider_metrics().await;
        assert_eq!(metrics.len(), 4);
        assert_eq!(metrics[0].provider, ProviderKind::CoinGecko);
        assert_eq!(metrics[0].failed_requests, 1);
        assert_eq!(metrics[1].total_requests, 1);
        assert_eq!(metrics[1].failed_requests, 0);
        assert_eq!(metrics[2].total_requests, 0);
    }

    #[tokio::test]
    async fn test_health_follows_cache_state() {
        let h = harness();
        assert_eq!(h.resolver.health_check().await.status, HealthStatus::Unhealthy);

        h.fetchers[0].set_price(&sym("BTC"), Decimal::from(67000));
        h.resolver.resolve(&sym("BTC")).await.unwrap();
        assert_eq!(h.resolver.health_check().await.status, HealthStatus::Degraded);

        for symbol in h.resolver.registry().symbols() {
            h.fetchers[0].set_price(symbol, Decimal::ONE);
        }
        h.resolver.resolve_all().await;
        let health = h.resolver.health_check().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.details["providers"][3], "cryptocompare");
    }

    #[test]
    fn test_from_config_follows_provider_order() {
        let config = ResolverConfig::default()
            .with_provider_order(vec![ProviderKind::Binance, ProviderKind::CryptoCompare]);
        let resolver =
            PriceResolver::from_config(&config, Arc::new(SymbolRegistry::builtin())).unwrap();
        assert_eq!(
            resolver.provider_order(),
            vec![ProviderKind::Binance, ProviderKind::CryptoCompare]
        );
    }
}
