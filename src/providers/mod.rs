//! Upstream price source implementations

mod http;

pub mod binance;
pub mod coingecko;
pub mod cryptocompare;
pub mod hyperliquid;

pub use binance::BinanceSource;
pub use coingecko::CoinGeckoSource;
pub use cryptocompare::CryptoCompareSource;
pub use hyperliquid::HyperliquidSource;

use crate::{error::ProviderError, provider::PriceSource, types::ProviderKind};
use std::sync::Arc;
use std::time::Duration;

/// Builds the live HTTP source for a provider
pub fn source_for(
    provider: ProviderKind,
    timeout: Duration,
) -> Result<Arc<dyn PriceSource>, ProviderError> {
    let source: Arc<dyn PriceSource> = match provider {
        ProviderKind::CoinGecko => Arc::new(CoinGeckoSource::new(timeout)?),
        ProviderKind::Binance => Arc::new(BinanceSource::new(timeout)?),
        ProviderKind::Hyperliquid => Arc::new(HyperliquidSource::new(timeout)?),
        ProviderKind::CryptoCompare => Arc::new(CryptoCompareSource::new(timeout)?),
    };
    Ok(source)
}
