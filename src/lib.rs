//! Cloud GPU pricing advisor.
//!
//! Answers "which GPU instance is cheapest / best-suited" from three
//! sources: a static price catalog, a semantic index of cost-optimization
//! tips, and a simulated external market-comparison service. The
//! aggregator merges them deterministically and degrades gracefully when
//! the non-catalog sources fail.

pub mod api;
pub mod catalog;
pub mod comparator;
pub mod config;
pub mod engine;
pub mod knowledge;
pub mod models;
pub mod money;

pub use catalog::{CatalogError, PricingCatalog};
pub use comparator::{ComparatorConfig, MarketComparator, SimulatedEndpoint};
pub use config::AdvisorConfig;
pub use engine::{Aggregator, AggregatorConfig, RecommendError};
pub use knowledge::{KnowledgeIndex, RetrievalOutcome};
pub use models::{PriceQuery, PricingRecord, Provider, Recommendation};
pub use money::UsdPerHour;
