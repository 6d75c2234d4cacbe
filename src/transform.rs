//! Bidirectional mapping between context entries and vector records
//!
//! `EntryTransformer` converts the legacy flat entry shape into the vector
//! backend's record shape and back, and is the single authority for whether a
//! transform lost information: every migrated item must pass [`validate`]
//! before it counts as processed.
//!
//! [`validate`]: EntryTransformer::validate

use crate::embeddings::{EmbeddingService, EMBEDDING_DIM};
use crate::error::{RecollectError, Result};
use crate::types::{ContextEntry, EntryMetadata, RecordMetadata, VectorRecord};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Attribute key stamped by metadata updates; excluded from round-trip checks
pub const UPDATED_ATTR: &str = "_updated";

/// Entry/record transformer
pub struct EntryTransformer {
    embeddings: Arc<dyn EmbeddingService>,
}

impl EntryTransformer {
    pub fn new(embeddings: Arc<dyn EmbeddingService>) -> Self {
        Self { embeddings }
    }

    /// Convert an entry into the backend's record shape
    ///
    /// Embeds the content when the entry carries no vector. The record's
    /// metadata mirrors the entry content so the record is self-describing.
    pub async fn to_record(&self, entry: &ContextEntry) -> Result<VectorRecord> {
        let values = match &entry.vector {
            Some(vector) => vector.clone(),
            None => {
                debug!("Embedding content for entry {}", entry.id);
                self.embeddings
                    .embed(&entry.content)
                    .await
                    .map_err(|e| RecollectError::Embedding(format!(
                        "failed to embed entry {}: {}",
                        entry.id, e
                    )))?
            }
        };

        Ok(VectorRecord {
            id: entry.id.clone(),
            values,
            metadata: Some(RecordMetadata {
                content: entry.content.clone(),
                context_type: entry.metadata.context_type.clone(),
                timestamp: entry.metadata.timestamp,
                tags: entry.metadata.tags.clone(),
                source: entry.metadata.source.clone(),
                relationships: entry.metadata.relationships.clone(),
                attributes: entry.metadata.attributes.clone(),
            }),
        })
    }

    /// Convert a record back into an entry, field-for-field inverse of
    /// [`to_record`](Self::to_record)
    pub fn to_entry(&self, record: &VectorRecord) -> Result<ContextEntry> {
        let metadata = record
            .metadata
            .as_ref()
            .ok_or_else(|| RecollectError::MissingMetadata(record.id.clone()))?;

        let mut entry = Self::entry_from_metadata(&record.id, metadata);
        entry.vector = Some(record.values.clone());
        Ok(entry)
    }

    /// Rebuild an entry from record metadata alone
    ///
    /// Similarity queries return metadata without the stored vector, so the
    /// reconstructed entry carries no embedding.
    pub fn entry_from_metadata(id: &str, metadata: &RecordMetadata) -> ContextEntry {
        ContextEntry {
            id: id.to_string(),
            content: metadata.content.clone(),
            vector: None,
            metadata: EntryMetadata {
                context_type: metadata.context_type.clone(),
                timestamp: metadata.timestamp,
                tags: metadata.tags.clone(),
                source: metadata.source.clone(),
                relationships: metadata.relationships.clone(),
                attributes: metadata.attributes.clone(),
            },
        }
    }

    /// Check that a transform preserved the entry
    ///
    /// True only when id, content, type, and timestamp match exactly, the
    /// vector has exactly [`EMBEDDING_DIM`] elements, and tags, source,
    /// relationships, and attributes survive the round trip. The transient
    /// `_updated` attribute is ignored on both sides.
    pub fn validate(&self, entry: &ContextEntry, record: &VectorRecord) -> bool {
        let metadata = match &record.metadata {
            Some(metadata) => metadata,
            None => return false,
        };

        if record.id != entry.id
            || metadata.content != entry.content
            || metadata.context_type != entry.metadata.context_type
            || metadata.timestamp != entry.metadata.timestamp
        {
            return false;
        }

        if record.values.len() != EMBEDDING_DIM {
            return false;
        }

        metadata.tags == entry.metadata.tags
            && metadata.source == entry.metadata.source
            && metadata.relationships == entry.metadata.relationships
            && without_updated(&metadata.attributes) == without_updated(&entry.metadata.attributes)
    }
}

fn without_updated(attributes: &HashMap<String, Value>) -> HashMap<&str, &Value> {
    attributes
        .iter()
        .filter(|(key, _)| key.as_str() != UPDATED_ATTR)
        .map(|(key, value)| (key.as_str(), value))
        .collect()
}
