//! Core data types for the Recollect context memory system
//!
//! This module defines the fundamental data structures used throughout
//! recollect: context entries, relationship references, vector records, and
//! the migration progress/snapshot types. Wire field names match the legacy
//! flat representation (camelCase, `type` for the classification field) so
//! existing exports deserialize unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::embeddings::EMBEDDING_DIM;
use crate::error::{RecollectError, Result};

/// Current time as epoch milliseconds, the unit entry timestamps use.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Directed, typed, weighted link from the owning entry to another entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRef {
    /// Id of the entry this relationship points at
    pub target_id: String,

    /// Relationship classification (e.g., "references", "extends")
    #[serde(rename = "type")]
    pub rel_type: String,

    /// Link strength, 0.0 - 1.0
    pub strength: f32,
}

impl RelationshipRef {
    pub fn new(target_id: impl Into<String>, rel_type: impl Into<String>, strength: f32) -> Self {
        Self {
            target_id: target_id.into(),
            rel_type: rel_type.into(),
            strength,
        }
    }
}

/// Structured metadata attached to every context entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    /// Entry classification (free-form, e.g., "decision", "code_pattern")
    #[serde(rename = "type")]
    pub context_type: String,

    /// Creation timestamp in epoch milliseconds
    pub timestamp: i64,

    /// Categorization tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Where the entry came from (file path, tool name, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Declared relationships to other entries
    #[serde(default)]
    pub relationships: Vec<RelationshipRef>,

    /// Free-form attribute bag
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

/// The canonical unit of memory: text content plus metadata and an optional
/// embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    /// Opaque unique id, caller-assigned or generated
    pub id: String,

    /// Arbitrary text body
    pub content: String,

    /// Fixed-length embedding; absent until embedded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,

    pub metadata: EntryMetadata,
}

impl ContextEntry {
    /// Create an entry with a generated id and the current timestamp
    pub fn new(content: impl Into<String>, context_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            vector: None,
            metadata: EntryMetadata {
                context_type: context_type.into(),
                timestamp: now_millis(),
                tags: Vec::new(),
                source: None,
                relationships: Vec::new(),
                attributes: HashMap::new(),
            },
        }
    }

    /// Reject malformed entries before any storage write
    ///
    /// Checks the timestamp, the vector dimension when a vector is attached,
    /// and relationship strength bounds.
    pub fn validate(&self) -> Result<()> {
        if self.metadata.timestamp <= 0 {
            return Err(RecollectError::Validation(format!(
                "invalid timestamp {} for entry {}",
                self.metadata.timestamp, self.id
            )));
        }

        if let Some(vector) = &self.vector {
            if vector.len() != EMBEDDING_DIM {
                return Err(RecollectError::Validation(format!(
                    "vector dimension mismatch for entry {}: expected {}, got {}",
                    self.id,
                    EMBEDDING_DIM,
                    vector.len()
                )));
            }
        }

        for rel in &self.metadata.relationships {
            if rel.target_id.is_empty() {
                return Err(RecollectError::Validation(format!(
                    "relationship on entry {} has an empty target id",
                    self.id
                )));
            }
            if !(0.0..=1.0).contains(&rel.strength) {
                return Err(RecollectError::Validation(format!(
                    "relationship strength {} on entry {} outside [0, 1]",
                    rel.strength, self.id
                )));
            }
        }

        Ok(())
    }
}

/// Metadata persisted on a vector record
///
/// Mirrors [`EntryMetadata`] plus the entry content, so a record is
/// self-describing without a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub content: String,

    #[serde(rename = "type")]
    pub context_type: String,

    pub timestamp: i64,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default)]
    pub relationships: Vec<RelationshipRef>,

    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

/// The vector backend's native shape: id, embedding values, metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecordMetadata>,
}

// === Retrieval ===

/// A retrieval query: free text (embedded first) or a raw vector
#[derive(Debug, Clone)]
pub enum ContextQuery {
    Text(String),
    Vector(Vec<f32>),
}

impl From<&str> for ContextQuery {
    fn from(text: &str) -> Self {
        ContextQuery::Text(text.to_string())
    }
}

impl From<String> for ContextQuery {
    fn from(text: String) -> Self {
        ContextQuery::Text(text)
    }
}

impl From<Vec<f32>> for ContextQuery {
    fn from(vector: Vec<f32>) -> Self {
        ContextQuery::Vector(vector)
    }
}

/// Inclusive timestamp window, epoch milliseconds on both bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// Options controlling a retrieval call
#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    /// How many hits to request from the backend
    pub top_k: usize,

    /// Post-filter: inclusive timestamp window
    pub time_range: Option<TimeRange>,

    /// Post-filter: keep only these entry types (empty = keep all)
    pub context_types: Vec<String>,

    /// Resolve each hit's relationships against the local graph
    pub include_related: bool,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            time_range: None,
            context_types: Vec::new(),
            include_related: false,
        }
    }
}

/// One retrieval hit: the reconstructed entry, its similarity score, and any
/// related entries resolved from the local graph.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedContext {
    pub entry: ContextEntry,
    pub score: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<ContextEntry>,
}

/// Related-memory lookup result: one outgoing edge of a graph node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedMemory {
    pub id: String,
    pub relationship: String,
    pub strength: f32,
}

/// Partial metadata update applied over an existing entry
///
/// `None` fields are left untouched; `attributes` are merged key-wise rather
/// than replaced. Relationships are deliberately absent: relationship edits go
/// through the explicit relationship calls on the manager.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    #[serde(rename = "type")]
    pub context_type: Option<String>,
    pub timestamp: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub source: Option<String>,
    pub attributes: Option<HashMap<String, Value>>,
}

// === Migration ===

/// Running totals for one `migrate` call
#[derive(Debug, Clone, Serialize)]
pub struct MigrationProgress {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<MigrationErrorRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl MigrationProgress {
    pub fn start(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            failed: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// One failed entry during migration, kept with the original data so the
/// caller can retry or inspect it.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationErrorRecord {
    pub id: String,
    pub error: String,
    pub entry: ContextEntry,
}

/// Lifecycle state recorded on each snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    InProgress,
    Completed,
    Failed,
    RolledBack,
}

/// Immutable, timestamped copy of migration progress
///
/// Snapshots are observability only; they are never consulted to resume or
/// recover a migration.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationSnapshot {
    pub taken_at: DateTime<Utc>,
    pub progress: MigrationProgress,
    pub state: MigrationState,
}

/// Options controlling one `migrate` call
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// Entries per batch (one upsert call per batch)
    pub batch_size: usize,

    /// Transform and validate only; never write to the backend
    pub validate_only: bool,

    /// Abort on the first failure and delete everything migrated so far
    pub rollback_on_error: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            validate_only: false,
            rollback_on_error: false,
        }
    }
}

/// Outcome of one `migrate` call
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub success: bool,
    pub progress: MigrationProgress,
    pub rollback_required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_roundtrips_legacy_field_names() {
        let json = serde_json::json!({
            "id": "e1",
            "content": "switched to tokio",
            "metadata": {
                "type": "decision",
                "timestamp": 1700000000000i64,
                "tags": ["async"],
                "relationships": [
                    {"targetId": "e0", "type": "references", "strength": 0.8}
                ]
            }
        });

        let entry: ContextEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.metadata.context_type, "decision");
        assert_eq!(entry.metadata.relationships[0].target_id, "e0");

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["metadata"]["type"], "decision");
        assert_eq!(back["metadata"]["relationships"][0]["targetId"], "e0");
    }

    #[test]
    fn test_validate_rejects_bad_timestamp() {
        let mut entry = ContextEntry::new("x", "note");
        entry.metadata.timestamp = 0;
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wrong_vector_dimension() {
        let mut entry = ContextEntry::new("x", "note");
        entry.vector = Some(vec![0.1; 42]);
        let err = entry.validate().unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_strength() {
        let mut entry = ContextEntry::new("x", "note");
        entry.metadata.relationships = vec![RelationshipRef::new("other", "references", 1.5)];
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_time_range_is_inclusive() {
        let range = TimeRange { start: 100, end: 200 };
        assert!(range.contains(100));
        assert!(range.contains(200));
        assert!(!range.contains(99));
        assert!(!range.contains(201));
    }

    #[test]
    fn test_migration_options_defaults() {
        let opts = MigrationOptions::default();
        assert_eq!(opts.batch_size, 50);
        assert!(!opts.validate_only);
        assert!(!opts.rollback_on_error);
    }
}
