//! Remote embedding service over a Voyage-style HTTP API
//!
//! Generates fixed-size semantic embeddings for entry content. One request
//! per call, no internal retries: retry policy belongs to the caller.

use crate::embeddings::{EmbeddingService, EMBEDDING_DIM};
use crate::error::{RecollectError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Maximum texts per batch request
const MAX_BATCH_SIZE: usize = 128;

/// Request timeout duration
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP embedding service
pub struct RemoteEmbeddingService {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl RemoteEmbeddingService {
    /// Create a new remote embedding service
    ///
    /// # Arguments
    /// * `api_key` - API key for the embedding provider
    /// * `model` - Model name (defaults to "voyage-3-large")
    /// * `base_url` - API base URL (defaults to the Voyage AI endpoint)
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(RecollectError::Validation(
                "embedding API key cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RecollectError::Embedding(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| "voyage-3-large".to_string()),
            base_url: base_url.unwrap_or_else(|| "https://api.voyageai.com/v1".to_string()),
            dimensions: EMBEDDING_DIM,
        })
    }

    async fn request(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        debug!("Requesting {} embeddings from {}", texts.len(), self.model);

        let body = EmbeddingRequest {
            input: texts,
            model: self.model.clone(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RecollectError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or_else(|| "no error detail".to_string());
            return Err(RecollectError::Embedding(format!(
                "embedding API returned {}: {}",
                status, detail
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RecollectError::Embedding(e.to_string()))?;

        // The API may reorder results; put them back by index
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);

        for d in &data {
            if d.embedding.len() != self.dimensions {
                return Err(RecollectError::Embedding(format!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.dimensions,
                    d.embedding.len()
                )));
            }
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingService for RemoteEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.request(vec![text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| RecollectError::Embedding("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH_SIZE) {
            let owned: Vec<String> = chunk.iter().map(|t| t.to_string()).collect();
            let embeddings = self.request(owned).await?;
            if embeddings.len() != chunk.len() {
                return Err(RecollectError::Embedding(format!(
                    "embedding count mismatch: requested {}, got {}",
                    chunk.len(),
                    embeddings.len()
                )));
            }
            all.extend(embeddings);
        }
        Ok(all)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_is_rejected() {
        let result = RemoteEmbeddingService::new(String::new(), None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let service =
            RemoteEmbeddingService::new("key".to_string(), None, None).unwrap();
        assert_eq!(service.model_name(), "voyage-3-large");
        assert_eq!(service.dimensions(), EMBEDDING_DIM);
    }
}
