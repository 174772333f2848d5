//! Domain types shared across the catalog, knowledge index, comparator,
//! and aggregator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::money::UsdPerHour;

/// Cloud provider. Closed set: dataset rows naming anything else fail
/// validation at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "Azure")]
    Azure,
    #[serde(rename = "GCP")]
    Gcp,
}

impl Provider {
    /// All providers, in tie-break (lexicographic name) order.
    pub const ALL: [Provider; 3] = [Provider::Aws, Provider::Azure, Provider::Gcp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "AWS",
            Provider::Azure => "Azure",
            Provider::Gcp => "GCP",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(Provider::Aws),
            "azure" => Ok(Provider::Azure),
            "gcp" => Ok(Provider::Gcp),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// One row of the pricing catalog. Immutable once loaded; identified by
/// `(provider, instance_type, region)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRecord {
    pub provider: Provider,
    pub instance_type: String,
    pub gpu_model: String,
    pub price_per_hour: UsdPerHour,
    pub region: String,
}

impl PricingRecord {
    /// Identity key within the catalog.
    pub fn key(&self) -> (Provider, &str, &str) {
        (self.provider, &self.instance_type, &self.region)
    }
}

/// A short cost-optimization passage, retrievable by semantic similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

/// A snippet paired with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSnippet {
    pub snippet: KnowledgeSnippet,
    pub score: f32,
}

/// Simulated market observation for one candidate, relative to the
/// baseline record. Scoped to a single recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonDelta {
    pub provider: Provider,
    /// Observed market price; absent when the probe went stale.
    pub price_per_hour: Option<UsdPerHour>,
    /// Positive means more expensive than baseline.
    pub percent_vs_baseline: Option<f64>,
    pub is_stale: bool,
}

impl ComparisonDelta {
    pub fn fresh(provider: Provider, price: UsdPerHour, percent_vs_baseline: f64) -> Self {
        Self {
            provider,
            price_per_hour: Some(price),
            percent_vs_baseline: Some(percent_vs_baseline),
            is_stale: false,
        }
    }

    /// Probe abandoned after retries or deadline; no usable observation.
    pub fn stale(provider: Provider) -> Self {
        Self {
            provider,
            price_per_hour: None,
            percent_vs_baseline: None,
            is_stale: true,
        }
    }
}

/// Structured query accepted by the aggregator (and the HTTP surface).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuery {
    pub gpu_model: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Defaults to all providers when absent.
    #[serde(default)]
    pub providers: Option<Vec<Provider>>,
}

impl PriceQuery {
    pub fn for_model(gpu_model: impl Into<String>) -> Self {
        Self {
            gpu_model: gpu_model.into(),
            region: None,
            providers: None,
        }
    }
}

/// Non-fatal failure kinds absorbed into a degraded recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    ComparatorTimeout,
    ComparatorCallFailed,
    RetrievalUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Stable,
    Falling,
}

/// Simulated market-trend commentary for one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketTrend {
    pub provider: Provider,
    pub direction: TrendDirection,
    pub commentary: &'static str,
}

/// Final aggregated answer. Constructed fresh per request, never mutated
/// afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub query: PriceQuery,
    pub cheapest: PricingRecord,
    pub baseline: PricingRecord,
    /// `round₁((baseline − cheapest) / baseline · 100)`; 0 when the
    /// baseline is the cheapest record.
    pub savings_percent: f64,
    pub supporting_snippets: Vec<ScoredSnippet>,
    pub comparator_deltas: Vec<ComparisonDelta>,
    pub baseline_trend: Option<MarketTrend>,
    pub degraded: bool,
    pub degraded_reasons: BTreeSet<DegradedReason>,
}
