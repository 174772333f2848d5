//! End-to-end recommendation flow against deterministic stubs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gpu_advisor::catalog::PricingCatalog;
use gpu_advisor::comparator::{ComparatorConfig, MarketComparator, QuoteEndpoint, QuoteError};
use gpu_advisor::engine::{Aggregator, AggregatorConfig, RecommendError};
use gpu_advisor::knowledge::{EmbedError, EmbeddingProvider, KnowledgeIndex};
use gpu_advisor::models::{DegradedReason, KnowledgeSnippet, PriceQuery, PricingRecord, Provider};
use gpu_advisor::money::UsdPerHour;

// ----------------------------------------------------------------------------
// Deterministic stubs
// ----------------------------------------------------------------------------

/// Keyword-axis embedder; no model download, fully deterministic.
struct StubEmbedder;

impl EmbeddingProvider for StubEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                vec![
                    t.matches("cost").count() as f32,
                    t.matches("spot").count() as f32,
                    t.matches("v100").count() as f32,
                    1.0,
                ]
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        4
    }
}

/// Quote endpoint answering instantly from a fixed book; `fail_all`
/// forces every probe to error.
struct StubEndpoint {
    quotes: HashMap<(Provider, String), UsdPerHour>,
    fail_all: bool,
}

impl StubEndpoint {
    fn from_catalog(catalog: &PricingCatalog) -> Arc<Self> {
        Arc::new(Self {
            quotes: catalog
                .records()
                .iter()
                .map(|r| ((r.provider, r.instance_type.clone()), r.price_per_hour))
                .collect(),
            fail_all: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            quotes: HashMap::new(),
            fail_all: true,
        })
    }
}

#[async_trait]
impl QuoteEndpoint for StubEndpoint {
    async fn fetch_quote(
        &self,
        provider: Provider,
        instance_type: &str,
    ) -> Result<UsdPerHour, QuoteError> {
        if self.fail_all {
            return Err(QuoteError::ServiceFailure {
                provider,
                instance_type: instance_type.to_string(),
            });
        }
        self.quotes
            .get(&(provider, instance_type.to_string()))
            .copied()
            .ok_or(QuoteError::UnknownInstance {
                provider,
                instance_type: instance_type.to_string(),
            })
    }
}

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

fn record(
    provider: Provider,
    instance_type: &str,
    gpu_model: &str,
    price: f64,
    region: &str,
) -> PricingRecord {
    PricingRecord {
        provider,
        instance_type: instance_type.into(),
        gpu_model: gpu_model.into(),
        price_per_hour: UsdPerHour::from_float(price),
        region: region.into(),
    }
}

fn v100_catalog() -> PricingCatalog {
    PricingCatalog::from_records(vec![
        record(Provider::Aws, "p3.2xlarge", "V100", 3.06, "us-east-1"),
        record(Provider::Azure, "NC6s_v3", "V100", 2.80, "eastus"),
        record(Provider::Gcp, "n1-standard-8-v100", "V100", 2.90, "us-central1"),
    ])
    .unwrap()
}

fn snippets() -> Vec<KnowledgeSnippet> {
    vec![
        KnowledgeSnippet {
            id: "spot".into(),
            text: "spot instances reduce cost".into(),
            tags: Default::default(),
        },
        KnowledgeSnippet {
            id: "v100".into(),
            text: "v100 cost guidance".into(),
            tags: Default::default(),
        },
    ]
}

fn fast_comparator_config() -> ComparatorConfig {
    ComparatorConfig {
        call_timeout: Duration::from_millis(100),
        max_retries: 2,
        backoff_base: Duration::from_millis(1),
        backoff_cap: Duration::from_millis(5),
        max_concurrency: 5,
        overall_timeout: Duration::from_secs(2),
    }
}

fn aggregator(catalog: PricingCatalog, endpoint: Arc<dyn QuoteEndpoint>) -> Aggregator {
    let index = KnowledgeIndex::build(snippets(), Arc::new(StubEmbedder)).unwrap();
    let comparator = MarketComparator::new(endpoint, fast_comparator_config());
    Aggregator::new(catalog, index, comparator, AggregatorConfig::default())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_v100_scenario_matches_expected_answer() {
    let catalog = v100_catalog();
    let endpoint = StubEndpoint::from_catalog(&catalog);
    let aggregator = aggregator(catalog, endpoint);

    let rec = aggregator
        .recommend(&PriceQuery::for_model("V100"))
        .await
        .unwrap();

    assert_eq!(rec.cheapest.provider, Provider::Azure);
    assert_eq!(rec.cheapest.price_per_hour, UsdPerHour::from_float(2.80));
    assert_eq!(rec.baseline.provider, Provider::Aws);
    assert_eq!(rec.baseline.price_per_hour, UsdPerHour::from_float(3.06));
    assert!((rec.savings_percent - 8.5).abs() < 0.05);

    assert!(!rec.degraded);
    assert!(rec.degraded_reasons.is_empty());
    // One delta per non-baseline match, all fresh.
    assert_eq!(rec.comparator_deltas.len(), 2);
    assert!(rec.comparator_deltas.iter().all(|d| !d.is_stale));
    assert!(rec.supporting_snippets.len() <= 3);
    assert!(rec.baseline_trend.is_some());
}

#[tokio::test]
async fn test_unknown_model_is_hard_failure() {
    let catalog = v100_catalog();
    assert!(catalog.lookup("H100", None, None).is_empty());

    let endpoint = StubEndpoint::from_catalog(&catalog);
    let aggregator = aggregator(catalog, endpoint);

    let err = aggregator
        .recommend(&PriceQuery::for_model("H100"))
        .await
        .unwrap_err();

    assert!(matches!(err, RecommendError::NoMatchingInstance { .. }));
}

#[tokio::test]
async fn test_total_comparator_failure_degrades_but_answers() {
    let aggregator = aggregator(v100_catalog(), StubEndpoint::failing());

    let rec = aggregator
        .recommend(&PriceQuery::for_model("V100"))
        .await
        .unwrap();

    assert!(rec.degraded);
    assert!(rec.degraded_reasons.contains(&DegradedReason::ComparatorTimeout));
    assert!(
        rec.degraded_reasons
            .contains(&DegradedReason::ComparatorCallFailed)
    );
    assert!(rec.comparator_deltas.iter().all(|d| d.is_stale));

    // Catalog-derived answer is untouched by comparator failure.
    assert_eq!(rec.cheapest.provider, Provider::Azure);
    assert!((rec.savings_percent - 8.5).abs() < 0.05);
}

#[tokio::test]
async fn test_retrieval_unavailable_degrades_but_answers() {
    let catalog = v100_catalog();
    let endpoint = StubEndpoint::from_catalog(&catalog);

    let aggregator = Aggregator::new(
        catalog,
        KnowledgeIndex::unavailable(),
        MarketComparator::new(endpoint, fast_comparator_config()),
        AggregatorConfig::default(),
    );

    let rec = aggregator
        .recommend(&PriceQuery::for_model("V100"))
        .await
        .unwrap();

    assert!(rec.degraded);
    assert!(
        rec.degraded_reasons
            .contains(&DegradedReason::RetrievalUnavailable)
    );
    assert!(rec.supporting_snippets.is_empty());
    assert_eq!(rec.cheapest.provider, Provider::Azure);
}

#[tokio::test]
async fn test_repeated_queries_are_idempotent() {
    let catalog = v100_catalog();
    let endpoint = StubEndpoint::from_catalog(&catalog);
    let aggregator = aggregator(catalog, endpoint);
    let query = PriceQuery::for_model("V100");

    let first = aggregator.recommend(&query).await.unwrap();
    let second = aggregator.recommend(&query).await.unwrap();

    assert_eq!(first.cheapest, second.cheapest);
    assert_eq!(first.baseline, second.baseline);
    assert_eq!(first.savings_percent, second.savings_percent);
}

#[tokio::test]
async fn test_provider_filter_limits_candidates() {
    let catalog = v100_catalog();
    let endpoint = StubEndpoint::from_catalog(&catalog);
    let aggregator = aggregator(catalog, endpoint);

    let query = PriceQuery {
        gpu_model: "V100".into(),
        region: None,
        providers: Some(vec![Provider::Aws, Provider::Gcp]),
    };
    let rec = aggregator.recommend(&query).await.unwrap();

    // Azure excluded: GCP is now cheapest against the AWS baseline.
    assert_eq!(rec.cheapest.provider, Provider::Gcp);
    assert!((rec.savings_percent - 5.2).abs() < 0.05);
}

#[tokio::test]
async fn test_baseline_falls_back_to_cheapest_when_absent() {
    let catalog = PricingCatalog::from_records(vec![
        record(Provider::Azure, "NC6s_v3", "V100", 2.80, "eastus"),
        record(Provider::Gcp, "n1-standard-8-v100", "V100", 2.90, "us-central1"),
    ])
    .unwrap();
    let endpoint = StubEndpoint::from_catalog(&catalog);
    let aggregator = aggregator(catalog, endpoint);

    let rec = aggregator
        .recommend(&PriceQuery::for_model("V100"))
        .await
        .unwrap();

    // No AWS record: baseline is the cheapest itself, savings zero.
    assert_eq!(rec.baseline, rec.cheapest);
    assert_eq!(rec.savings_percent, 0.0);
}

/// Property check over randomly generated catalogs: the cheapest record
/// is always the minimum of the matching set and the savings figure
/// always matches the formula.
#[tokio::test]
async fn test_randomized_catalogs_hold_invariants() {
    let mut rng = StdRng::seed_from_u64(42);

    for round in 0..50 {
        let mut records = Vec::new();
        let mut instance_id = 0u32;
        for provider in Provider::ALL {
            let count = rng.random_range(1..=3);
            for _ in 0..count {
                instance_id += 1;
                records.push(record(
                    provider,
                    &format!("type-{instance_id}"),
                    "V100",
                    rng.random_range(0.5..40.0),
                    "r1",
                ));
            }
        }

        let catalog = PricingCatalog::from_records(records.clone()).unwrap();
        let endpoint = StubEndpoint::from_catalog(&catalog);
        let aggregator = aggregator(catalog.clone(), endpoint);

        let rec = aggregator
            .recommend(&PriceQuery::for_model("V100"))
            .await
            .unwrap();

        let min_price = records
            .iter()
            .map(|r| r.price_per_hour)
            .min()
            .unwrap();
        assert_eq!(
            rec.cheapest.price_per_hour, min_price,
            "round {round}: cheapest is not the minimum"
        );

        let baseline = rec.baseline.price_per_hour.to_float();
        let cheapest = rec.cheapest.price_per_hour.to_float();
        let expected = (baseline - cheapest) / baseline * 100.0;
        assert!(
            (rec.savings_percent - expected).abs() < 0.05,
            "round {round}: savings {} vs expected {expected}",
            rec.savings_percent
        );

        // Lookup ordering invariant.
        let matches = catalog.lookup("V100", None, None);
        assert!(
            matches
                .windows(2)
                .all(|w| w[0].price_per_hour <= w[1].price_per_hour),
            "round {round}: lookup not sorted"
        );
    }
}
