//! Semantic knowledge base of cost-optimization guidance.
//!
//! Snippets are embedded once at build; the index is read-only afterwards
//! and safe for unlimited concurrent readers. Retrieval failures never
//! propagate as errors: a search against an unavailable provider returns
//! an empty, flagged outcome so catalog and comparator results are never
//! blocked on retrieval.

pub mod embedder;

pub use embedder::{EmbedError, EmbeddingProvider, FastembedProvider};

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::models::{KnowledgeSnippet, ScoredSnippet};

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("failed to read knowledge dataset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("knowledge dataset is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Embed(#[from] EmbedError),
}

/// Load the snippet dataset (`[{id, text, tags}]`). Embeddings are not
/// part of the file; they are computed at index build.
pub fn load_snippets(path: impl AsRef<Path>) -> Result<Vec<KnowledgeSnippet>, KnowledgeError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Result of one similarity search. `unavailable` is set when the
/// embedding provider could not serve the query.
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub hits: Vec<ScoredSnippet>,
    pub unavailable: bool,
}

impl RetrievalOutcome {
    fn unavailable() -> Self {
        Self {
            hits: Vec::new(),
            unavailable: true,
        }
    }
}

struct IndexEntry {
    snippet: KnowledgeSnippet,
    embedding: Vec<f32>,
}

/// In-memory vector-similarity index over knowledge snippets.
pub struct KnowledgeIndex {
    entries: Vec<IndexEntry>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl KnowledgeIndex {
    /// Embed all snippets and build the index. Fails only when the
    /// provider cannot embed the corpus; callers that want to keep
    /// serving fall back to [`KnowledgeIndex::unavailable`].
    pub fn build(
        snippets: Vec<KnowledgeSnippet>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, EmbedError> {
        let texts: Vec<&str> = snippets.iter().map(|s| s.text.as_str()).collect();
        let embeddings = embedder.embed(&texts)?;

        if embeddings.len() != snippets.len() {
            return Err(EmbedError::Embed(format!(
                "provider returned {} vectors for {} snippets",
                embeddings.len(),
                snippets.len()
            )));
        }

        let entries = snippets
            .into_iter()
            .zip(embeddings)
            .map(|(snippet, embedding)| IndexEntry { snippet, embedding })
            .collect();

        Ok(Self {
            entries,
            embedder: Some(embedder),
        })
    }

    /// Index with no provider: every search reports `unavailable`. Used
    /// when the embedding model cannot be initialized at startup.
    pub fn unavailable() -> Self {
        Self {
            entries: Vec::new(),
            embedder: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_available(&self) -> bool {
        self.embedder.is_some()
    }

    /// Nearest snippets by cosine similarity, descending, at most
    /// `max(top_k, 1)` hits. Provider failure degrades to an empty,
    /// flagged outcome instead of an error.
    pub fn search(&self, query_text: &str, top_k: usize) -> RetrievalOutcome {
        let top_k = top_k.max(1);

        let Some(embedder) = &self.embedder else {
            return RetrievalOutcome::unavailable();
        };

        let query_embedding = match embedder.embed(&[query_text]) {
            Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
            Ok(_) => {
                tracing::warn!("embedding provider returned no vector for query");
                return RetrievalOutcome::unavailable();
            }
            Err(e) => {
                tracing::warn!(error = %e, "embedding provider unavailable, skipping retrieval");
                return RetrievalOutcome::unavailable();
            }
        };

        let mut hits: Vec<ScoredSnippet> = self
            .entries
            .iter()
            .map(|entry| ScoredSnippet {
                snippet: entry.snippet.clone(),
                score: cosine_similarity(&query_embedding, &entry.embedding),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);

        RetrievalOutcome {
            hits,
            unavailable: false,
        }
    }
}

/// Cosine similarity; 0 for mismatched lengths or zero-norm vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
