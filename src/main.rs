use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use gpu_advisor::api::{self, state::AppState};
use gpu_advisor::comparator::{MarketComparator, SimulatedEndpoint};
use gpu_advisor::config::AdvisorConfig;
use gpu_advisor::engine::Aggregator;
use gpu_advisor::knowledge::{self, FastembedProvider, KnowledgeIndex};
use gpu_advisor::catalog::PricingCatalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AdvisorConfig::from_env();

    // Catalog load is the only fatal startup step: no partial catalog.
    let catalog = PricingCatalog::load(&config.pricing_path)?;
    tracing::info!(records = catalog.len(), path = %config.pricing_path, "pricing catalog loaded");

    let index = build_index(&config);

    let endpoint = SimulatedEndpoint::from_catalog(&catalog, config.endpoint_config());
    let comparator = MarketComparator::new(Arc::new(endpoint), config.comparator_config());

    let aggregator = Aggregator::new(catalog, index, comparator, config.aggregator_config());
    let state = Arc::new(AppState::new(aggregator));

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the knowledge index. Retrieval is a degradable source, so any
/// failure here downgrades to an unavailable index instead of aborting.
fn build_index(config: &AdvisorConfig) -> KnowledgeIndex {
    let snippets = match knowledge::load_snippets(&config.knowledge_path) {
        Ok(snippets) => snippets,
        Err(e) => {
            tracing::warn!(error = %e, "knowledge dataset unavailable, retrieval disabled");
            return KnowledgeIndex::unavailable();
        }
    };

    let provider = match FastembedProvider::new() {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            tracing::warn!(error = %e, "embedding model unavailable, retrieval disabled");
            return KnowledgeIndex::unavailable();
        }
    };

    match KnowledgeIndex::build(snippets, provider) {
        Ok(index) => {
            tracing::info!(snippets = index.len(), "knowledge index built");
            index
        }
        Err(e) => {
            tracing::warn!(error = %e, "knowledge index build failed, retrieval disabled");
            KnowledgeIndex::unavailable()
        }
    }
}
