//! Embedding provider boundary.
//!
//! The index depends on an embedding capability it does not implement;
//! [`EmbeddingProvider`] is the seam, [`FastembedProvider`] the production
//! implementation.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("failed to initialize embedding model: {0}")]
    Init(#[from] anyhow::Error),

    #[error("embedding generation failed: {0}")]
    Embed(String),
}

/// Turns text into fixed-length vectors. Implementations must be safe to
/// share across concurrent requests.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, in order.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;

    fn dimension(&self) -> usize;
}

/// Wraps a fastembed model. Holds loaded model weights in memory.
pub struct FastembedProvider {
    model: Mutex<TextEmbedding>,
    dimension: usize,
}

impl FastembedProvider {
    /// Initialize with BGE-small-en-v1.5 (384 dimensions).
    pub fn new() -> Result<Self, EmbedError> {
        Self::with_model(EmbeddingModel::BGESmallENV15)
    }

    pub fn with_model(model_name: EmbeddingModel) -> Result<Self, EmbedError> {
        let dimension = embedding_dimension(&model_name).ok_or_else(|| {
            EmbedError::Init(anyhow::anyhow!(
                "unsupported embedding model: {model_name:?}"
            ))
        })?;
        let model =
            TextEmbedding::try_new(InitOptions::new(model_name).with_show_download_progress(true))?;

        Ok(Self {
            model: Mutex::new(model),
            dimension,
        })
    }
}

impl EmbeddingProvider for FastembedProvider {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbedError::Embed("embedding model lock poisoned".into()))?;

        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbedError::Embed(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn embedding_dimension(model: &EmbeddingModel) -> Option<usize> {
    match model {
        EmbeddingModel::BGESmallENV15 => Some(384),
        EmbeddingModel::BGEBaseENV15 => Some(768),
        EmbeddingModel::BGELargeENV15 => Some(1024),
        EmbeddingModel::AllMiniLML6V2 => Some(384),
        EmbeddingModel::AllMiniLML12V2 => Some(384),
        _ => None,
    }
}
