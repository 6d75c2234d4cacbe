//! REST vector backend
//!
//! Client for a Pinecone-style vector database HTTP API. All persistence is
//! delegated here; the client performs no internal retries and surfaces the
//! first failing call verbatim, prefixed with the failing phase.

use crate::backend::{ConnectionStatus, QueryMatch, QueryOptions, VectorBackend};
use crate::error::{RecollectError, Result};
use crate::types::{RecordMetadata, RelationshipRef, VectorRecord};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Request timeout duration
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Vector database client over HTTP
pub struct RestVectorBackend {
    client: Client,
    base_url: String,
    api_key: String,
    namespace: Option<String>,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ApiMatch>,
}

#[derive(Deserialize)]
struct ApiMatch {
    id: String,
    score: f32,
    metadata: Option<RecordMetadata>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    ids: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: std::collections::HashMap<String, VectorRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id: &'a str,
    set_metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

impl RestVectorBackend {
    /// Create a new REST backend client
    ///
    /// # Arguments
    /// * `base_url` - Index endpoint, e.g. `https://my-index.svc.pinecone.io`
    /// * `api_key` - API key sent as the `Api-Key` header
    /// * `namespace` - Optional namespace all operations are scoped to
    pub fn new(base_url: String, api_key: String, namespace: Option<String>) -> Result<Self> {
        if base_url.is_empty() {
            return Err(RecollectError::Validation(
                "vector backend URL cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RecollectError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            namespace,
            connected: AtomicBool::new(false),
            last_error: RwLock::new(None),
        })
    }

    async fn record_failure(&self, phase: &str, message: String) -> RecollectError {
        warn!("{} failed: {}", phase, message);
        self.connected.store(false, Ordering::Relaxed);
        *self.last_error.write().await = Some(message.clone());
        RecollectError::Backend(format!("{} failed: {}", phase, message))
    }

    async fn record_success(&self) {
        self.connected.store(true, Ordering::Relaxed);
        *self.last_error.write().await = None;
    }

    async fn post_json<B: Serialize>(
        &self,
        phase: &str,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let response = match self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.record_failure(phase, e.to_string()).await),
        };

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(self
                .record_failure(phase, format!("HTTP {}: {}", status, detail))
                .await);
        }

        self.record_success().await;
        Ok(response)
    }
}

#[async_trait]
impl VectorBackend for RestVectorBackend {
    async fn initialize(&self) -> Result<()> {
        info!("Initializing vector backend at {}", self.base_url);
        self.post_json("backend initialization", "/describe_index_stats", &serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        debug!("Upserting {} records", records.len());
        let request = UpsertRequest {
            vectors: records,
            namespace: self.namespace.as_deref(),
        };
        self.post_json("vector upsert", "/vectors/upsert", &request)
            .await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], options: &QueryOptions) -> Result<Vec<QueryMatch>> {
        let request = QueryRequest {
            vector,
            top_k: options.top_k,
            include_metadata: true,
            filter: options.filter.as_ref(),
            namespace: self.namespace.as_deref(),
        };

        let response = self.post_json("similarity query", "/query", &request).await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| RecollectError::Backend(format!("similarity query failed: {}", e)))?;

        debug!("Query returned {} matches", parsed.matches.len());
        Ok(parsed
            .matches
            .into_iter()
            .map(|m| QueryMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata,
            })
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        debug!("Deleting {} records", ids.len());
        let request = DeleteRequest {
            ids,
            namespace: self.namespace.as_deref(),
        };
        self.post_json("vector delete", "/vectors/delete", &request)
            .await?;
        Ok(())
    }

    async fn track_relationship(&self, source_id: &str, rel: &RelationshipRef) -> Result<()> {
        // The update endpoint replaces whole metadata keys, so fetch the
        // current relationship list, merge, and write it back.
        let phase = "relationship tracking";

        let fetch_url = format!(
            "{}/vectors/fetch?ids={}{}",
            self.base_url,
            source_id,
            self.namespace
                .as_deref()
                .map(|ns| format!("&namespace={ns}"))
                .unwrap_or_default()
        );

        let response = self
            .client
            .get(fetch_url)
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| RecollectError::Backend(format!("{} failed: {}", phase, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(self
                .record_failure(phase, format!("fetch returned HTTP {}", status))
                .await);
        }

        let fetched: FetchResponse = response
            .json()
            .await
            .map_err(|e| RecollectError::Backend(format!("{} failed: {}", phase, e)))?;

        let record = fetched.vectors.get(source_id).ok_or_else(|| {
            RecollectError::Backend(format!("{} failed: no record for source {}", phase, source_id))
        })?;

        let mut relationships = record
            .metadata
            .as_ref()
            .map(|m| m.relationships.clone())
            .unwrap_or_default();

        if let Some(existing) = relationships
            .iter_mut()
            .find(|r| r.target_id == rel.target_id && r.rel_type == rel.rel_type)
        {
            *existing = rel.clone();
        } else {
            relationships.push(rel.clone());
        }

        let request = UpdateRequest {
            id: source_id,
            set_metadata: serde_json::json!({ "relationships": relationships }),
            namespace: self.namespace.as_deref(),
        };
        self.post_json(phase, "/vectors/update", &request).await?;
        Ok(())
    }

    async fn connection_status(&self) -> ConnectionStatus {
        ConnectionStatus {
            is_connected: self.connected.load(Ordering::Relaxed),
            last_error: self.last_error.read().await.clone(),
        }
    }
}
