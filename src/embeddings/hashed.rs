//! Deterministic local embedding generation
//!
//! Hashing-based embeddings for offline operation and tests. Similar texts
//! share character n-grams and words, so they land on overlapping dimensions
//! and score higher under cosine similarity than unrelated texts. Not a
//! substitute for a real embedding model, but deterministic and free.

use crate::embeddings::{EmbeddingService, EMBEDDING_DIM};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Local hashing embedder producing normalized fixed-dimension vectors
pub struct HashedEmbeddingService {
    dimensions: usize,
}

impl HashedEmbeddingService {
    pub fn new() -> Self {
        Self {
            dimensions: EMBEDDING_DIM,
        }
    }

    /// Use a non-standard dimension (tests exercising dimension checks)
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];

        let text_lower = text.to_lowercase();
        let chars: Vec<char> = text_lower.chars().collect();

        // Character n-gram hashing
        for window_size in 2..=4 {
            for window in chars.windows(window_size) {
                let mut hasher = DefaultHasher::new();
                window.iter().collect::<String>().hash(&mut hasher);
                let dim = (hasher.finish() as usize) % self.dimensions;
                embedding[dim] += 1.0;
            }
        }

        // Word-level hashing, weighted above n-grams
        for word in text_lower.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let dim = (hasher.finish() as usize) % self.dimensions;
            embedding[dim] += 2.0;
        }

        // Normalize to unit length
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in &mut embedding {
                *val /= magnitude;
            }
        }

        embedding
    }
}

impl Default for HashedEmbeddingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for HashedEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "hashed-ngram"
    }
}
