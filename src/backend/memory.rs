//! In-memory vector backend
//!
//! HashMap-backed implementation of [`VectorBackend`] with brute-force cosine
//! similarity search. Used as the embedded mode for small datasets and as the
//! test double for everything above the backend boundary.

use crate::backend::{ConnectionStatus, QueryMatch, QueryOptions, VectorBackend};
use crate::embeddings::cosine_similarity;
use crate::error::{RecollectError, Result};
use crate::types::{RelationshipRef, VectorRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory vector store
#[derive(Default)]
pub struct InMemoryVectorBackend {
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryVectorBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Fetch one record by id (test and debugging convenience)
    pub async fn get(&self, id: &str) -> Option<VectorRecord> {
        self.records.read().await.get(id).cloned()
    }
}

#[async_trait]
impl VectorBackend for InMemoryVectorBackend {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut store = self.records.write().await;
        for record in records {
            store.insert(record.id.clone(), record.clone());
        }
        debug!("Upserted {} records ({} total)", records.len(), store.len());
        Ok(())
    }

    async fn query(&self, vector: &[f32], options: &QueryOptions) -> Result<Vec<QueryMatch>> {
        let store = self.records.read().await;

        let mut matches: Vec<QueryMatch> = store
            .values()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: record.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(options.top_k);

        debug!("Query returned {} matches", matches.len());
        Ok(matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut store = self.records.write().await;
        for id in ids {
            // Unknown ids are idempotent success
            store.remove(id);
        }
        Ok(())
    }

    async fn track_relationship(&self, source_id: &str, rel: &RelationshipRef) -> Result<()> {
        let mut store = self.records.write().await;
        let record = store.get_mut(source_id).ok_or_else(|| {
            RecollectError::Backend(format!(
                "relationship tracking failed: no record for source {}",
                source_id
            ))
        })?;

        let metadata = record.metadata.as_mut().ok_or_else(|| {
            RecollectError::Backend(format!(
                "relationship tracking failed: record {} has no metadata",
                source_id
            ))
        })?;

        // Replace an existing edge to the same target with the same type
        if let Some(existing) = metadata
            .relationships
            .iter_mut()
            .find(|r| r.target_id == rel.target_id && r.rel_type == rel.rel_type)
        {
            *existing = rel.clone();
        } else {
            metadata.relationships.push(rel.clone());
        }

        Ok(())
    }

    async fn connection_status(&self) -> ConnectionStatus {
        ConnectionStatus {
            is_connected: true,
            last_error: None,
        }
    }
}
