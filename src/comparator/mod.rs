//! Client for the simulated market-comparison service.
//!
//! Each candidate probe is individually bounded by a per-call timeout and
//! retried with capped exponential backoff; the whole comparison is
//! bounded by an overall deadline. Failures never surface as errors:
//! exhausted probes come back as stale deltas, so the caller always gets
//! partial results rather than all-or-nothing.

pub mod endpoint;

pub use endpoint::{QuoteEndpoint, QuoteError, SimulatedEndpoint, SimulatedEndpointConfig};

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tokio::time::Instant;

use crate::models::{ComparisonDelta, MarketTrend, PricingRecord, Provider, TrendDirection};
use crate::money::UsdPerHour;

/// Retry, timeout, and concurrency knobs. Deliberately configuration
/// rather than hidden constants.
#[derive(Debug, Clone)]
pub struct ComparatorConfig {
    /// Budget for a single fetch attempt.
    pub call_timeout: Duration,
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// First backoff delay; doubles per retry.
    pub backoff_base: Duration,
    /// Backoff never exceeds this.
    pub backoff_cap: Duration,
    /// Simultaneous in-flight probes.
    pub max_concurrency: usize,
    /// Wall-clock budget for the whole comparison.
    pub overall_timeout: Duration,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_millis(500),
            max_retries: 2,
            backoff_base: Duration::from_millis(50),
            backoff_cap: Duration::from_millis(400),
            max_concurrency: 5,
            overall_timeout: Duration::from_secs(3),
        }
    }
}

/// Deltas for every candidate, in input order, plus whether the overall
/// deadline cut the comparison short.
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub deltas: Vec<ComparisonDelta>,
    pub timed_out: bool,
}

/// Resilient client over a [`QuoteEndpoint`].
pub struct MarketComparator {
    endpoint: Arc<dyn QuoteEndpoint>,
    config: ComparatorConfig,
}

impl MarketComparator {
    pub fn new(endpoint: Arc<dyn QuoteEndpoint>, config: ComparatorConfig) -> Self {
        Self { endpoint, config }
    }

    /// Probe every candidate against the baseline price. Always returns
    /// one delta per candidate; unresolved candidates are stale.
    pub async fn compare(
        &self,
        baseline: &PricingRecord,
        candidates: &[PricingRecord],
    ) -> ComparisonOutcome {
        let deadline = Instant::now() + self.config.overall_timeout;
        let baseline_price = baseline.price_per_hour;

        // `buffered` keeps output in candidate order while running up to
        // max_concurrency probes at once.
        let mut probes = stream::iter(candidates.to_vec())
            .map(|candidate| self.probe(baseline_price, candidate))
            .buffered(self.config.max_concurrency.max(1));

        let mut deltas: Vec<ComparisonDelta> = Vec::with_capacity(candidates.len());
        let mut timed_out = false;

        loop {
            match tokio::time::timeout_at(deadline, probes.next()).await {
                Ok(Some(delta)) => deltas.push(delta),
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    break;
                }
            }
        }

        if timed_out {
            tracing::warn!(
                resolved = deltas.len(),
                total = candidates.len(),
                "comparison deadline hit, abandoning in-flight probes"
            );
            for candidate in &candidates[deltas.len()..] {
                deltas.push(ComparisonDelta::stale(candidate.provider));
            }
        }

        ComparisonOutcome { deltas, timed_out }
    }

    /// One candidate: per-attempt timeout, capped exponential backoff
    /// between attempts, stale delta when every attempt fails.
    async fn probe(&self, baseline_price: UsdPerHour, candidate: PricingRecord) -> ComparisonDelta {
        let mut backoff = self.config.backoff_base;

        for attempt in 0..=self.config.max_retries {
            let call = self
                .endpoint
                .fetch_quote(candidate.provider, &candidate.instance_type);

            match tokio::time::timeout(self.config.call_timeout, call).await {
                Ok(Ok(quote)) => {
                    let percent = percent_vs_baseline(baseline_price, quote);
                    return ComparisonDelta::fresh(candidate.provider, quote, percent);
                }
                Ok(Err(e)) => {
                    tracing::debug!(
                        provider = %candidate.provider,
                        instance = %candidate.instance_type,
                        attempt,
                        error = %e,
                        "quote attempt failed"
                    );
                }
                Err(_) => {
                    tracing::debug!(
                        provider = %candidate.provider,
                        instance = %candidate.instance_type,
                        attempt,
                        "quote attempt timed out"
                    );
                }
            }

            if attempt < self.config.max_retries {
                tokio::time::sleep(backoff.min(self.config.backoff_cap)).await;
                backoff = (backoff * 2).min(self.config.backoff_cap);
            }
        }

        ComparisonDelta::stale(candidate.provider)
    }

    /// Static market-trend commentary for a provider.
    pub fn market_trend(&self, provider: Provider) -> MarketTrend {
        let (direction, commentary) = match provider {
            Provider::Aws => (
                TrendDirection::Stable,
                "High demand keeps prices steady; good spot availability",
            ),
            Provider::Azure => (
                TrendDirection::Rising,
                "AI workload demand is pushing GPU prices upward",
            ),
            Provider::Gcp => (
                TrendDirection::Stable,
                "Competitive pricing with sustained committed-use discounts",
            ),
        };

        MarketTrend {
            provider,
            direction,
            commentary,
        }
    }
}

/// `(candidate − baseline) / baseline · 100`; positive means the
/// candidate is more expensive than the baseline.
fn percent_vs_baseline(baseline: UsdPerHour, candidate: UsdPerHour) -> f64 {
    (candidate.to_float() - baseline.to_float()) / baseline.to_float() * 100.0
}
