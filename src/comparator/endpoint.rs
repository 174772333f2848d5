//! Simulated market-quote endpoint.
//!
//! [`QuoteEndpoint`] is the network boundary the comparator talks to; in
//! this system it is backed by [`SimulatedEndpoint`], which injects random
//! latency and failure from a seedable RNG so tests can force
//! deterministic sequences.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::catalog::PricingCatalog;
use crate::models::Provider;
use crate::money::UsdPerHour;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("quote service failed for {provider} {instance_type}")]
    ServiceFailure {
        provider: Provider,
        instance_type: String,
    },

    #[error("no market quote for {provider} {instance_type}")]
    UnknownInstance {
        provider: Provider,
        instance_type: String,
    },
}

/// Remote price-comparison service, as seen by the comparator. Request is
/// `(provider, instance_type)`, response a market price per hour.
#[async_trait]
pub trait QuoteEndpoint: Send + Sync {
    async fn fetch_quote(
        &self,
        provider: Provider,
        instance_type: &str,
    ) -> Result<UsdPerHour, QuoteError>;
}

/// Knobs for the simulated service.
#[derive(Debug, Clone)]
pub struct SimulatedEndpointConfig {
    /// Injected latency range per call, milliseconds.
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    /// Probability a call fails outright (0.0 to 1.0).
    pub failure_probability: f64,
    /// Max fraction the market quote deviates from the listed price.
    pub quote_jitter: f64,
    /// Fixed seed for reproducible behavior; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulatedEndpointConfig {
    fn default() -> Self {
        Self {
            latency_min_ms: 50,
            latency_max_ms: 400,
            failure_probability: 0.15,
            quote_jitter: 0.03,
            seed: None,
        }
    }
}

/// In-process stand-in for the external comparison service. Holds a quote
/// book derived from the catalog at construction; per-call latency and
/// failure are drawn from the RNG.
pub struct SimulatedEndpoint {
    quotes: HashMap<(Provider, String), UsdPerHour>,
    config: SimulatedEndpointConfig,
    rng: Mutex<StdRng>,
}

impl SimulatedEndpoint {
    pub fn new(
        quotes: HashMap<(Provider, String), UsdPerHour>,
        config: SimulatedEndpointConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            quotes,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Build the quote book from catalog prices with a fixed per-entry
    /// jitter, so the "market" disagrees slightly with the listing.
    pub fn from_catalog(catalog: &PricingCatalog, config: SimulatedEndpointConfig) -> Self {
        let mut seed_rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let jitter = config.quote_jitter.abs();
        let quotes = catalog
            .records()
            .iter()
            .map(|r| {
                let factor = if jitter > 0.0 {
                    1.0 + seed_rng.random_range(-jitter..=jitter)
                } else {
                    1.0
                };
                (
                    (r.provider, r.instance_type.clone()),
                    r.price_per_hour.scaled(factor),
                )
            })
            .collect();

        Self::new(quotes, config)
    }

    fn draw(&self) -> (Duration, bool) {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            // A poisoned RNG just means another call panicked mid-draw;
            // fall back to failing this call.
            Err(_) => return (Duration::ZERO, true),
        };

        let min = self.config.latency_min_ms.min(self.config.latency_max_ms);
        let max = self.config.latency_max_ms.max(self.config.latency_min_ms);
        let latency = Duration::from_millis(rng.random_range(min..=max));
        let failed = self.config.failure_probability > 0.0
            && rng.random_bool(self.config.failure_probability.clamp(0.0, 1.0));

        (latency, failed)
    }
}

#[async_trait]
impl QuoteEndpoint for SimulatedEndpoint {
    async fn fetch_quote(
        &self,
        provider: Provider,
        instance_type: &str,
    ) -> Result<UsdPerHour, QuoteError> {
        let (latency, failed) = self.draw();
        tokio::time::sleep(latency).await;

        if failed {
            return Err(QuoteError::ServiceFailure {
                provider,
                instance_type: instance_type.to_string(),
            });
        }

        self.quotes
            .get(&(provider, instance_type.to_string()))
            .copied()
            .ok_or_else(|| QuoteError::UnknownInstance {
                provider,
                instance_type: instance_type.to_string(),
            })
    }
}
