//! Runtime configuration for the resolver
//!
//! Defaults come from [`crate::constants`]. Each value can be overridden from
//! the environment:
//!
//! | Variable                   | Meaning                                   |
//! |----------------------------|-------------------------------------------|
//! | `PRICE_FRESHNESS_SECS`     | freshness window                          |
//! | `PRICE_REQUEST_TIMEOUT_MS` | per-request provider timeout              |
//! | `PRICE_PROVIDER_ORDER`     | comma separated provider names            |
//! | `PRICE_MAX_STALE_SECS`     | oldest stale entry still served, optional |
//!
//! Invalid values are logged and ignored.

use crate::{
    constants::{DEFAULT_PROVIDER_ORDER, FRESHNESS_WINDOW_SECS, REQUEST_TIMEOUT_MS},
    types::ProviderKind,
};
use std::time::Duration;

pub const ENV_FRESHNESS_SECS: &str = "PRICE_FRESHNESS_SECS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "PRICE_REQUEST_TIMEOUT_MS";
pub const ENV_PROVIDER_ORDER: &str = "PRICE_PROVIDER_ORDER";
pub const ENV_MAX_STALE_SECS: &str = "PRICE_MAX_STALE_SECS";

/// Settings consumed by [`PriceResolver`](crate::resolver::PriceResolver)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// How long a cached price is served without contacting providers
    pub freshness_window: Duration,
    /// Upper bound for one provider request
    pub request_timeout: Duration,
    /// Providers in the order they are consulted
    pub provider_order: Vec<ProviderKind>,
    /// Stale entries older than this are not served; `None` serves any age
    pub max_stale_age: Option<Duration>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            freshness_window: Duration::from_secs(FRESHNESS_WINDOW_SECS),
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
            provider_order: DEFAULT_PROVIDER_ORDER.to_vec(),
            max_stale_age: None,
        }
    }
}

impl ResolverConfig {
    /// Builds the configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(secs) = parse_u64(&lookup, ENV_FRESHNESS_SECS) {
            config.freshness_window = Duration::from_secs(secs);
        }

        if let Some(ms) = parse_u64(&lookup, ENV_REQUEST_TIMEOUT_MS) {
            if ms == 0 {
                tracing::warn!(var = ENV_REQUEST_TIMEOUT_MS, "Timeout must be positive, using default");
            } else {
                config.request_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(raw) = lookup(ENV_PROVIDER_ORDER) {
            match parse_provider_order(&raw) {
                Ok(order) => config.provider_order = order,
                Err(e) => {
                    tracing::warn!(var = ENV_PROVIDER_ORDER, value = %raw, error = %e, "Ignoring invalid provider order")
                }
            }
        }

        if let Some(secs) = parse_u64(&lookup, ENV_MAX_STALE_SECS) {
            config.max_stale_age = Some(Duration::from_secs(secs));
        }

        config
    }

    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_provider_order(mut self, order: Vec<ProviderKind>) -> Self {
        self.provider_order = order;
        self
    }

    pub fn with_max_stale_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_stale_age = max_age;
        self
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(var = key, value = %raw, error = %e, "Ignoring invalid number");
            None
        }
    }
}

/// Parses "coingecko,binance,..." keeping the first occurrence of each name
pub fn parse_provider_order(raw: &str) -> Result<Vec<ProviderKind>, String> {
    let mut order = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let provider = name.parse::<ProviderKind>()?;
        if !order.contains(&provider) {
            order.push(provider);
        }
    }
    if order.is_empty() {
        return Err("no providers listed".to_string());
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ResolverConfig::default());
        assert_eq!(config.freshness_window, Duration::from_secs(120));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.provider_order.last(), Some(&ProviderKind::CryptoCompare));
        assert_eq!(config.max_stale_age, None);
    }

    #[test]
    fn test_overrides() {
        let config = ResolverConfig::from_lookup(lookup(&[
            (ENV_FRESHNESS_SECS, "30"),
            (ENV_REQUEST_TIMEOUT_MS, "750"),
            (ENV_PROVIDER_ORDER, "binance, cryptocompare"),
            (ENV_MAX_STALE_SECS, "86400"),
        ]));
        assert_eq!(config.freshness_window, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_millis(750));
        assert_eq!(
            config.provider_order,
            vec![ProviderKind::Binance, ProviderKind::CryptoCompare]
        );
        assert_eq!(config.max_stale_age, Some(Duration::from_secs(86400)));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ResolverConfig::from_lookup(lookup(&[
            (ENV_FRESHNESS_SECS, "soon"),
            (ENV_REQUEST_TIMEOUT_MS, "0"),
            (ENV_PROVIDER_ORDER, "binance,kraken"),
        ]));
        assert_eq!(config, ResolverConfig::default());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_invalid_values_are_logged() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let config = tracing::subscriber::with_default(subscriber, || {
            ResolverConfig::from_lookup(lookup(&[
                (ENV_FRESHNESS_SECS, "soon"),
                (ENV_PROVIDER_ORDER, "kraken"),
            ]))
        });
        assert_eq!(config, ResolverConfig::default());

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Ignoring invalid number"));
        assert!(output.contains(ENV_FRESHNESS_SECS));
        assert!(output.contains("Ignoring invalid provider order"));
        assert!(output.contains("kraken"));
    }

    #[test]
    fn test_builders() {
        let config = ResolverConfig::default()
            .with_freshness_window(Duration::from_secs(1))
            .with_request_timeout(Duration::from_millis(20))
            .with_provider_order(vec![ProviderKind::Hyperliquid])
            .with_max_stale_age(Some(Duration::from_secs(60)));
        assert_eq!(config.freshness_window, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_millis(20));
        assert_eq!(config.provider_order, vec![ProviderKind::Hyperliquid]);
        assert_eq!(config.max_stale_age, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_provider_order_dedupes() {
        assert_eq!(
            parse_provider_order("binance,coingecko,binance").unwrap(),
            vec![ProviderKind::Binance, ProviderKind::CoinGecko]
        );
        assert!(parse_provider_order(" , ").is_err());
    }
}
