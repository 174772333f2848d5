//! Recommendation orchestration.

pub mod aggregator;

pub use aggregator::{Aggregator, AggregatorConfig};

use thiserror::Error;

/// Request-level failures surfaced to the caller. Everything else the
/// sub-components can get wrong is absorbed into the recommendation's
/// `degraded` fields instead.
#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("no instance matches gpu model '{gpu_model}'{}", region_suffix(.region))]
    NoMatchingInstance {
        gpu_model: String,
        region: Option<String>,
    },
}

fn region_suffix(region: &Option<String>) -> String {
    match region {
        Some(r) => format!(" in region '{r}'"),
        None => String::new(),
    }
}
