//! Vector backend abstraction
//!
//! The backend owns durable `(id, vector, metadata)` storage and similarity
//! search. Everything above it consumes this trait by dependency injection,
//! so a REST-backed vector database and the in-memory test double are
//! interchangeable.

pub mod memory;
pub mod rest;

pub use memory::InMemoryVectorBackend;
pub use rest::RestVectorBackend;

use crate::error::Result;
use crate::types::{RecordMetadata, RelationshipRef, VectorRecord};
use async_trait::async_trait;
use serde_json::Value;

/// Options for a similarity query
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Maximum number of matches to return
    pub top_k: usize,

    /// Backend-native metadata filter, passed through opaquely
    pub filter: Option<Value>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            filter: None,
        }
    }
}

/// One similarity match returned by the backend
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Option<RecordMetadata>,
}

/// Backend connection health, as last observed
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub last_error: Option<String>,
}

/// Vector backend trait defining all required operations
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Verify connectivity and prepare the target index/namespace
    async fn initialize(&self) -> Result<()>;

    /// Insert or replace a batch of vector records
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Similarity search against stored vectors
    async fn query(&self, vector: &[f32], options: &QueryOptions) -> Result<Vec<QueryMatch>>;

    /// Delete records by id; deleting an unknown id is not an error
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Persist one relationship onto the source record's metadata
    async fn track_relationship(&self, source_id: &str, rel: &RelationshipRef) -> Result<()>;

    /// Last observed connection health
    async fn connection_status(&self) -> ConnectionStatus;
}
