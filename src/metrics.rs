//! Per-provider attempt metrics
//!
//! Tracks latency percentiles and success rates for every fetcher the
//! resolver calls. An attempt that comes back absent counts as a failure.

use crate::types::ProviderKind;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

/// Attempts kept for the latency percentiles
const MAX_SAMPLES: usize = 100;

/// Metrics for a single provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderMetrics {
    /// The provider
    pub provider: ProviderKind,
    /// 50th percentile latency of successful attempts in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency of successful attempts in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of attempts tracked
    pub total_requests: u64,
    /// Number of attempts that returned no price
    pub failed_requests: u64,
}

impl ProviderMetrics {
    /// Creates metrics with no data
    pub fn empty(provider: ProviderKind) -> Self {
        Self {
            provider,
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_requests: 0,
            failed_requests: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Attempt {
    latency_ms: f64,
    present: bool,
}

#[derive(Debug, Default)]
struct Counters {
    samples: VecDeque<Attempt>,
    total_requests: u64,
    failed_requests: u64,
}

/// Attempt history of one provider
pub struct MetricsCollector {
    provider: ProviderKind,
    counters: RwLock<Counters>,
}

impl MetricsCollector {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            counters: RwLock::new(Counters {
                samples: VecDeque::with_capacity(MAX_SAMPLES),
                ..Counters::default()
            }),
        }
    }

    /// Records one fetch attempt; `present` is false for an absent outcome
    pub async fn record_request(&self, duration: Duration, present: bool) {
        let mut counters = self.counters.write().await;

        counters.total_requests += 1;
        if !present {
            counters.failed_requests += 1;
        }

        if counters.samples.len() >= MAX_SAMPLES {
            counters.samples.pop_front();
        }
        counters.samples.push_back(Attempt {
            latency_ms: duration.as_secs_f64() * 1000.0,
            present,
        });
    }

    /// Summarizes the recorded attempts
    pub async fn get_metrics(&self) -> ProviderMetrics {
        let counters = self.counters.read().await;

        if counters.samples.is_empty() {
            return ProviderMetrics::empty(self.provider);
        }

        let mut latencies: Vec<f64> = counters
            .samples
            .iter()
            .filter(|a| a.present)
            .map(|a| a.latency_ms)
            .collect();
        latencies.sort_by(f64::total_cmp);

        let total = counters.total_requests;
        let failed = counters.failed_requests;

        ProviderMetrics {
            provider: self.provider,
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate: (total - failed) as f64 / total as f64,
            total_requests: total,
            failed_requests: failed,
        }
    }
}

/// Nearest-rank percentile of sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let rank = (p / 100.0 * sorted_values.len() as f64).ceil() as usize;
    sorted_values[rank.clamp(1, sorted_values.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_collector() {
        let collector = MetricsCollector::new(ProviderKind::Binance);

        collector.record_request(Duration::from_millis(100), true).await;
        collector.record_request(Duration::from_millis(200), true).await;
        collector.record_request(Duration::from_millis(150), false).await;

        let metrics = collector.get_metrics().await;

        assert_eq!(metrics.provider, ProviderKind::Binance);
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.failed_requests, 1);
        assert!(metrics.success_rate > 0.6 && metrics.success_rate < 0.7);
    }

    #[tokio::test]
    async fn test_empty_metrics() {
        let collector = MetricsCollector::new(ProviderKind::CoinGecko);
        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.success_rate, 1.0);
    }

    #[tokio::test]
    async fn test_sample_window_is_bounded() {
        let collector = MetricsCollector::new(ProviderKind::Hyperliquid);
        for _ in 0..(MAX_SAMPLES + 20) {
            collector.record_request(Duration::from_millis(10), true).await;
        }
        assert_eq!(collector.counters.read().await.samples.len(), MAX_SAMPLES);
        assert_eq!(collector.get_metrics().await.total_requests, (MAX_SAMPLES + 20) as u64);
    }

    #[test]
    fn test_percentile() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 50.0), 5.0);
        assert_eq!(percentile(&values, 99.0), 10.0);
    }
}
