//! Environment-driven configuration.
//!
//! Every knob has a default; `ADVISOR_*` variables override them. Parse
//! failures fall back to the default with a warning rather than aborting
//! startup.

use std::time::Duration;

use crate::comparator::{ComparatorConfig, SimulatedEndpointConfig};
use crate::engine::AggregatorConfig;
use crate::models::Provider;

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// Address the HTTP surface binds to.
    pub bind_addr: String,
    /// Pricing dataset path.
    pub pricing_path: String,
    /// Knowledge snippet dataset path.
    pub knowledge_path: String,

    /// Savings are computed against this provider's record when present.
    pub baseline_provider: Provider,
    /// Snippets attached per recommendation.
    pub top_k: usize,

    // Simulated endpoint
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    pub failure_probability: f64,
    pub quote_jitter: f64,
    /// Fixed RNG seed for reproducible runs; unset seeds from the OS.
    pub seed: Option<u64>,

    // Comparator resilience
    pub call_timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub max_concurrency: usize,
    pub overall_timeout_ms: u64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        let endpoint = SimulatedEndpointConfig::default();
        let comparator = ComparatorConfig::default();
        let aggregator = AggregatorConfig::default();

        Self {
            bind_addr: "0.0.0.0:8080".into(),
            pricing_path: "data/pricing.json".into(),
            knowledge_path: "data/knowledge.json".into(),

            baseline_provider: aggregator.baseline_provider,
            top_k: aggregator.top_k,

            latency_min_ms: endpoint.latency_min_ms,
            latency_max_ms: endpoint.latency_max_ms,
            failure_probability: endpoint.failure_probability,
            quote_jitter: endpoint.quote_jitter,
            seed: None,

            call_timeout_ms: comparator.call_timeout.as_millis() as u64,
            max_retries: comparator.max_retries,
            backoff_base_ms: comparator.backoff_base.as_millis() as u64,
            backoff_cap_ms: comparator.backoff_cap.as_millis() as u64,
            max_concurrency: comparator.max_concurrency,
            overall_timeout_ms: comparator.overall_timeout.as_millis() as u64,
        }
    }
}

impl AdvisorConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: env_string("ADVISOR_BIND", defaults.bind_addr),
            pricing_path: env_string("ADVISOR_PRICING_PATH", defaults.pricing_path),
            knowledge_path: env_string("ADVISOR_KNOWLEDGE_PATH", defaults.knowledge_path),

            baseline_provider: env_parse("ADVISOR_BASELINE_PROVIDER", defaults.baseline_provider),
            top_k: env_parse("ADVISOR_TOP_K", defaults.top_k),

            latency_min_ms: env_parse("ADVISOR_LATENCY_MIN_MS", defaults.latency_min_ms),
            latency_max_ms: env_parse("ADVISOR_LATENCY_MAX_MS", defaults.latency_max_ms),
            failure_probability: env_parse("ADVISOR_FAILURE_PROBABILITY", defaults.failure_probability),
            quote_jitter: env_parse("ADVISOR_QUOTE_JITTER", defaults.quote_jitter),
            seed: std::env::var("ADVISOR_SEED")
                .ok()
                .and_then(|v| v.parse().ok()),

            call_timeout_ms: env_parse("ADVISOR_CALL_TIMEOUT_MS", defaults.call_timeout_ms),
            max_retries: env_parse("ADVISOR_MAX_RETRIES", defaults.max_retries),
            backoff_base_ms: env_parse("ADVISOR_BACKOFF_BASE_MS", defaults.backoff_base_ms),
            backoff_cap_ms: env_parse("ADVISOR_BACKOFF_CAP_MS", defaults.backoff_cap_ms),
            max_concurrency: env_parse("ADVISOR_MAX_CONCURRENCY", defaults.max_concurrency),
            overall_timeout_ms: env_parse("ADVISOR_OVERALL_TIMEOUT_MS", defaults.overall_timeout_ms),
        }
    }

    pub fn endpoint_config(&self) -> SimulatedEndpointConfig {
        SimulatedEndpointConfig {
            latency_min_ms: self.latency_min_ms,
            latency_max_ms: self.latency_max_ms,
            failure_probability: self.failure_probability,
            quote_jitter: self.quote_jitter,
            seed: self.seed,
        }
    }

    pub fn comparator_config(&self) -> ComparatorConfig {
        ComparatorConfig {
            call_timeout: Duration::from_millis(self.call_timeout_ms),
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_cap: Duration::from_millis(self.backoff_cap_ms),
            max_concurrency: self.max_concurrency,
            overall_timeout: Duration::from_millis(self.overall_timeout_ms),
        }
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            baseline_provider: self.baseline_provider,
            top_k: self.top_k,
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr + std::fmt::Debug>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, raw, default = ?default, "unparseable config value, using default");
                default
            }
        },
        Err(_) => default,
    }
}
