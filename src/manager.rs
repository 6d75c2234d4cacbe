//! Context manager
//!
//! Orchestrates every read and write against the vector backend and the
//! in-memory context graph. The core consistency rule: any backend failure
//! short-circuits before graph mutation, so the graph never reflects an entry
//! the backend rejected. No operation retries internally; retries are a
//! caller concern.

use crate::backend::{ConnectionStatus, QueryOptions, VectorBackend};
use crate::embeddings::EmbeddingService;
use crate::error::{RecollectError, Result};
use crate::graph::ContextGraph;
use crate::transform::{EntryTransformer, UPDATED_ATTR};
use crate::types::{
    now_millis, ContextEntry, ContextQuery, MetadataPatch, RelatedMemory, RelationshipRef,
    RetrieveOptions, RetrievedContext,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Orchestrator for context storage, retrieval, and relationship bookkeeping
pub struct ContextManager {
    backend: Arc<dyn VectorBackend>,
    embeddings: Arc<dyn EmbeddingService>,
    transformer: EntryTransformer,
    graph: RwLock<ContextGraph>,
}

impl ContextManager {
    pub fn new(backend: Arc<dyn VectorBackend>, embeddings: Arc<dyn EmbeddingService>) -> Self {
        let transformer = EntryTransformer::new(embeddings.clone());
        Self {
            backend,
            embeddings,
            transformer,
            graph: RwLock::new(ContextGraph::new()),
        }
    }

    /// Store a context entry
    ///
    /// Validates locally, writes to the backend (embedding the content when
    /// no vector is attached), persists each declared relationship, and only
    /// after every backend call has succeeded mutates the local graph.
    /// Returns the entry id (generated when the caller left it empty).
    pub async fn add_context(&self, mut entry: ContextEntry) -> Result<String> {
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }
        entry.validate()?;

        let record = self.transformer.to_record(&entry).await?;
        entry.vector = Some(record.values.clone());

        self.backend.upsert(std::slice::from_ref(&record)).await?;

        for rel in &entry.metadata.relationships {
            self.backend.track_relationship(&entry.id, rel).await?;
        }

        let mut graph = self.graph.write().await;
        graph.add_edges(&entry.id, &entry.metadata.relationships);
        let id = entry.id.clone();
        graph.upsert_node(entry);

        info!("Stored context entry {}", id);
        Ok(id)
    }

    /// Retrieve entries by similarity
    ///
    /// The query is either free text (embedded first) or a raw vector.
    /// Filtering by time range and type happens after retrieval; it never
    /// reduces what is requested from the backend, only what is returned.
    /// Hits lacking metadata are skipped with a warning. Related entries are
    /// resolved against the local graph only; targets not cached locally are
    /// silently omitted.
    pub async fn retrieve_context(
        &self,
        query: ContextQuery,
        options: RetrieveOptions,
    ) -> Result<Vec<RetrievedContext>> {
        let vector = match query {
            ContextQuery::Vector(vector) => {
                if vector.len() != self.embeddings.dimensions() {
                    return Err(RecollectError::Validation(format!(
                        "query vector dimension mismatch: expected {}, got {}",
                        self.embeddings.dimensions(),
                        vector.len()
                    )));
                }
                vector
            }
            ContextQuery::Text(text) => self.embeddings.embed(&text).await?,
        };

        let matches = self
            .backend
            .query(
                &vector,
                &QueryOptions {
                    top_k: options.top_k,
                    filter: None,
                },
            )
            .await?;

        let graph = self.graph.read().await;
        let mut results = Vec::with_capacity(matches.len());

        for hit in matches {
            let metadata = match hit.metadata {
                Some(metadata) => metadata,
                None => {
                    warn!("Skipping hit {} with no metadata", hit.id);
                    continue;
                }
            };

            let entry = EntryTransformer::entry_from_metadata(&hit.id, &metadata);

            let related = if options.include_related {
                entry
                    .metadata
                    .relationships
                    .iter()
                    .filter_map(|rel| graph.node(&rel.target_id).cloned())
                    .collect()
            } else {
                Vec::new()
            };

            results.push(RetrievedContext {
                entry,
                score: hit.score,
                related,
            });
        }

        if let Some(range) = options.time_range {
            results.retain(|r| range.contains(r.entry.metadata.timestamp));
        }
        if !options.context_types.is_empty() {
            results.retain(|r| options.context_types.contains(&r.entry.metadata.context_type));
        }

        debug!("Retrieval returned {} results after filtering", results.len());
        Ok(results)
    }

    /// Merge partial metadata over an existing entry and re-persist it
    ///
    /// Scalar fields are replaced, attributes merged key-wise, and the
    /// transient `_updated` attribute stamped with the current epoch ms.
    /// Relationships are never touched here; use
    /// [`set_relationships`](Self::set_relationships).
    pub async fn update_context_metadata(
        &self,
        id: &str,
        patch: MetadataPatch,
    ) -> Result<ContextEntry> {
        let mut updated = {
            let graph = self.graph.read().await;
            graph
                .node(id)
                .cloned()
                .ok_or_else(|| RecollectError::NotFound(id.to_string()))?
        };

        if let Some(context_type) = patch.context_type {
            updated.metadata.context_type = context_type;
        }
        if let Some(timestamp) = patch.timestamp {
            updated.metadata.timestamp = timestamp;
        }
        if let Some(tags) = patch.tags {
            updated.metadata.tags = tags;
        }
        if let Some(source) = patch.source {
            updated.metadata.source = Some(source);
        }
        if let Some(attributes) = patch.attributes {
            updated.metadata.attributes.extend(attributes);
        }
        updated
            .metadata
            .attributes
            .insert(UPDATED_ATTR.to_string(), json!(now_millis()));

        updated.validate()?;

        let record = self.transformer.to_record(&updated).await?;
        self.backend.upsert(std::slice::from_ref(&record)).await?;

        updated.vector = Some(record.values.clone());
        self.graph.write().await.upsert_node(updated.clone());

        debug!("Updated metadata for entry {}", id);
        Ok(updated)
    }

    /// Replace the full relationship list of an entry
    ///
    /// The rewrite path: the node's relationship list and all of its outgoing
    /// edges are replaced wholesale, persisted through the backend before the
    /// graph is touched.
    pub async fn set_relationships(
        &self,
        id: &str,
        relationships: Vec<RelationshipRef>,
    ) -> Result<()> {
        let mut updated = {
            let graph = self.graph.read().await;
            graph
                .node(id)
                .cloned()
                .ok_or_else(|| RecollectError::NotFound(id.to_string()))?
        };

        updated.metadata.relationships = relationships;
        updated.validate()?;

        let record = self.transformer.to_record(&updated).await?;
        self.backend.upsert(std::slice::from_ref(&record)).await?;

        updated.vector = Some(record.values.clone());
        let mut graph = self.graph.write().await;
        graph.replace_edges_from(id, &updated.metadata.relationships);
        graph.upsert_node(updated);

        Ok(())
    }

    /// Delete an entry
    ///
    /// Backend delete first; only on success are the node and every edge
    /// mentioning it removed from the graph. Deleting an id the backend does
    /// not hold is idempotent success.
    pub async fn delete_context(&self, id: &str) -> Result<()> {
        self.backend.delete(&[id.to_string()]).await?;

        let existed = self.graph.write().await.remove_node(id);
        if existed {
            info!("Deleted context entry {}", id);
        } else {
            debug!("Delete for {} had no local node", id);
        }
        Ok(())
    }

    /// Outgoing relationships of an entry, from the local graph
    pub async fn get_related_memories(&self, id: &str) -> Vec<RelatedMemory> {
        self.graph.read().await.related_of(id)
    }

    /// Last-known-good cached copy of an entry, if it was added here
    pub async fn get_cached(&self, id: &str) -> Option<ContextEntry> {
        self.graph.read().await.node(id).cloned()
    }

    /// Backend connection health passthrough
    pub async fn connection_status(&self) -> ConnectionStatus {
        self.backend.connection_status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryVectorBackend;
    use crate::embeddings::HashedEmbeddingService;

    fn manager_with_backend() -> (ContextManager, Arc<InMemoryVectorBackend>) {
        let backend = Arc::new(InMemoryVectorBackend::new());
        let embeddings = Arc::new(HashedEmbeddingService::new());
        (
            ContextManager::new(backend.clone(), embeddings),
            backend,
        )
    }

    #[tokio::test]
    async fn test_add_generates_id_when_empty() {
        let (manager, backend) = manager_with_backend();
        let mut entry = ContextEntry::new("note body", "note");
        entry.id = String::new();

        let id = manager.add_context(entry).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(backend.count().await, 1);
        assert!(manager.get_cached(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_entry_before_storage() {
        let (manager, backend) = manager_with_backend();
        let mut entry = ContextEntry::new("bad", "note");
        entry.metadata.timestamp = -5;

        assert!(manager.add_context(entry).await.is_err());
        assert_eq!(backend.count().await, 0);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let (manager, _) = manager_with_backend();
        let err = manager
            .update_context_metadata("missing", MetadataPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RecollectError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_stamps_transient_attribute() {
        let (manager, _) = manager_with_backend();
        let id = manager
            .add_context(ContextEntry::new("body", "note"))
            .await
            .unwrap();

        let updated = manager
            .update_context_metadata(
                &id,
                MetadataPatch {
                    tags: Some(vec!["tagged".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.metadata.tags, vec!["tagged".to_string()]);
        assert!(updated.metadata.attributes.contains_key(UPDATED_ATTR));
    }

    #[tokio::test]
    async fn test_query_vector_dimension_checked() {
        let (manager, _) = manager_with_backend();
        let err = manager
            .retrieve_context(
                ContextQuery::Vector(vec![0.1; 3]),
                RetrieveOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RecollectError::Validation(_)));
    }
}
