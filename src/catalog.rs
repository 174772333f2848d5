//! Static pricing catalog.
//!
//! Loaded once at startup from a JSON array of [`PricingRecord`]s and
//! immutable afterwards. Validation is all-or-nothing: a single bad row
//! rejects the whole dataset, so the catalog never serves partial data.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::models::{PricingRecord, Provider};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read pricing dataset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("pricing dataset is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("record {index} ({provider} {instance_type} in {region}): price must be positive")]
    NonPositivePrice {
        index: usize,
        provider: Provider,
        instance_type: String,
        region: String,
    },

    #[error("record {index} ({provider} {instance_type} in {region}): duplicate catalog key")]
    DuplicateKey {
        index: usize,
        provider: Provider,
        instance_type: String,
        region: String,
    },
}

/// In-memory table of GPU instance prices. Safe for unlimited concurrent
/// readers; no writers after construction.
#[derive(Debug, Clone)]
pub struct PricingCatalog {
    records: Vec<PricingRecord>,
}

impl PricingCatalog {
    /// Load and validate the dataset. Any failure here is fatal for the
    /// component: a catalog that fails to load serves no requests.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let records: Vec<PricingRecord> = serde_json::from_str(&raw)?;
        Self::from_records(records)
    }

    /// Validate an already-deserialized dataset.
    pub fn from_records(records: Vec<PricingRecord>) -> Result<Self, CatalogError> {
        let mut seen: HashSet<(Provider, String, String)> = HashSet::new();

        for (index, record) in records.iter().enumerate() {
            if !record.price_per_hour.is_positive() {
                return Err(CatalogError::NonPositivePrice {
                    index,
                    provider: record.provider,
                    instance_type: record.instance_type.clone(),
                    region: record.region.clone(),
                });
            }
            let key = (
                record.provider,
                record.instance_type.clone(),
                record.region.clone(),
            );
            if !seen.insert(key) {
                return Err(CatalogError::DuplicateKey {
                    index,
                    provider: record.provider,
                    instance_type: record.instance_type.clone(),
                    region: record.region.clone(),
                });
            }
        }

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PricingRecord] {
        &self.records
    }

    /// Find records for a GPU model, optionally narrowed by region and
    /// provider set. Matching is case-insensitive. Results are sorted
    /// ascending by price, ties broken by provider name.
    ///
    /// An unknown model yields an empty vec, never an error: callers
    /// distinguish "no match" by emptiness.
    pub fn lookup(
        &self,
        gpu_model: &str,
        region: Option<&str>,
        providers: Option<&[Provider]>,
    ) -> Vec<PricingRecord> {
        let mut matches: Vec<PricingRecord> = self
            .records
            .iter()
            .filter(|r| r.gpu_model.eq_ignore_ascii_case(gpu_model))
            .filter(|r| region.is_none_or(|reg| r.region.eq_ignore_ascii_case(reg)))
            .filter(|r| providers.is_none_or(|set| set.contains(&r.provider)))
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            a.price_per_hour
                .cmp(&b.price_per_hour)
                .then_with(|| a.provider.as_str().cmp(b.provider.as_str()))
        });
        matches
    }
}
