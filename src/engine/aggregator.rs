//! Merges catalog, knowledge, and comparator results into one answer.
//!
//! The aggregator owns its three sources directly (assembled once at
//! startup) and processes one request per call: catalog lookup first,
//! then comparison and retrieval concurrently, then a deterministic
//! merge. Sub-component failure degrades the result; only an empty
//! catalog match aborts.

use std::collections::BTreeSet;

use crate::catalog::PricingCatalog;
use crate::comparator::MarketComparator;
use crate::knowledge::KnowledgeIndex;
use crate::models::{DegradedReason, PriceQuery, PricingRecord, Provider, Recommendation};
use crate::money::UsdPerHour;

use super::RecommendError;

/// Request lifecycle, traced for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    Pending,
    CatalogResolved,
    SourcesAttempted,
    Aggregated,
    Failed,
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Provider whose record anchors the savings computation when it
    /// appears among the matches.
    pub baseline_provider: Provider,
    /// Knowledge snippets to attach per recommendation.
    pub top_k: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            baseline_provider: Provider::Aws,
            top_k: 3,
        }
    }
}

pub struct Aggregator {
    catalog: PricingCatalog,
    index: KnowledgeIndex,
    comparator: MarketComparator,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(
        catalog: PricingCatalog,
        index: KnowledgeIndex,
        comparator: MarketComparator,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            catalog,
            index,
            comparator,
            config,
        }
    }

    pub fn catalog(&self) -> &PricingCatalog {
        &self.catalog
    }

    pub fn index(&self) -> &KnowledgeIndex {
        &self.index
    }

    /// Produce a recommendation for a structured query.
    ///
    /// Callers always receive either a complete (possibly degraded)
    /// recommendation or [`RecommendError::NoMatchingInstance`]; repeated
    /// calls against the same catalog yield the same `cheapest` and
    /// `savings_percent` regardless of comparator randomness.
    pub async fn recommend(&self, query: &PriceQuery) -> Result<Recommendation, RecommendError> {
        tracing::debug!(state = ?RequestState::Pending, gpu_model = %query.gpu_model, "recommendation requested");

        let matches = self.catalog.lookup(
            &query.gpu_model,
            query.region.as_deref(),
            query.providers.as_deref(),
        );

        let Some(cheapest) = matches.first().cloned() else {
            tracing::warn!(state = ?RequestState::Failed, gpu_model = %query.gpu_model, "no catalog match");
            return Err(RecommendError::NoMatchingInstance {
                gpu_model: query.gpu_model.clone(),
                region: query.region.clone(),
            });
        };
        tracing::debug!(state = ?RequestState::CatalogResolved, matches = matches.len(), "catalog resolved");

        let baseline = matches
            .iter()
            .find(|r| r.provider == self.config.baseline_provider)
            .cloned()
            .unwrap_or_else(|| cheapest.clone());

        let candidates: Vec<PricingRecord> = matches
            .iter()
            .filter(|r| **r != baseline)
            .cloned()
            .collect();

        let retrieval_key = retrieval_key(query);

        // Comparison and retrieval are independent; run them together.
        let (comparison, retrieval) = tokio::join!(
            self.comparator.compare(&baseline, &candidates),
            async { self.index.search(&retrieval_key, self.config.top_k) },
        );
        tracing::debug!(
            state = ?RequestState::SourcesAttempted,
            deltas = comparison.deltas.len(),
            snippets = retrieval.hits.len(),
            "sources attempted"
        );

        let mut degraded_reasons: BTreeSet<DegradedReason> = BTreeSet::new();
        if comparison.timed_out {
            degraded_reasons.insert(DegradedReason::ComparatorTimeout);
        }
        let stale = comparison.deltas.iter().filter(|d| d.is_stale).count();
        if stale > 0 {
            degraded_reasons.insert(DegradedReason::ComparatorCallFailed);
        }
        // Every probe exhausted its budget: report it as a comparator
        // timeout alongside the per-call failures.
        if !candidates.is_empty() && stale == candidates.len() {
            degraded_reasons.insert(DegradedReason::ComparatorTimeout);
        }
        if retrieval.unavailable {
            degraded_reasons.insert(DegradedReason::RetrievalUnavailable);
        }

        let savings_percent = savings_percent(baseline.price_per_hour, cheapest.price_per_hour);
        let baseline_trend = Some(self.comparator.market_trend(baseline.provider));
        let degraded = !degraded_reasons.is_empty();

        tracing::info!(
            state = ?RequestState::Aggregated,
            cheapest_provider = %cheapest.provider,
            savings_percent,
            degraded,
            "recommendation aggregated"
        );

        Ok(Recommendation {
            query: query.clone(),
            cheapest,
            baseline,
            savings_percent,
            supporting_snippets: retrieval.hits,
            comparator_deltas: comparison.deltas,
            baseline_trend,
            degraded,
            degraded_reasons,
        })
    }
}

/// Deterministic text key for knowledge retrieval, derived from the query.
pub fn retrieval_key(query: &PriceQuery) -> String {
    match &query.region {
        Some(region) => format!("{} cost optimization {}", query.gpu_model, region),
        None => format!("{} cost optimization", query.gpu_model),
    }
}

/// `round₁((baseline − cheapest) / baseline · 100)`. Zero when the
/// baseline already is the cheapest option.
fn savings_percent(baseline: UsdPerHour, cheapest: UsdPerHour) -> f64 {
    if !baseline.is_positive() || baseline == cheapest {
        return 0.0;
    }
    let raw = (baseline.to_float() - cheapest.to_float()) / baseline.to_float() * 100.0;
    (raw * 10.0).round() / 10.0
}
