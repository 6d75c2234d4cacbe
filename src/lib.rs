//! Recollect - Vector-Backed Development Context Memory
//!
//! Stores short pieces of development-related text ("context entries")
//! alongside vector embeddings and metadata, retrieves them by similarity
//! and structured filters, tracks typed relationships between entries, and
//! migrates a legacy flat representation into the vector-backed one.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (ContextEntry, VectorRecord, migration progress)
//! - **Backend**: Vector storage behind a trait (REST client, in-memory)
//! - **Embeddings**: Embedding generation (remote API, local hashing)
//! - **Manager**: Orchestrates reads/writes and the relationship graph
//! - **Migration**: Batch migration with snapshots and rollback
//!
//! # Example
//!
//! ```ignore
//! use recollect::{ContextEntry, ContextManager, InMemoryVectorBackend};
//! use recollect::embeddings::HashedEmbeddingService;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> recollect::Result<()> {
//!     let backend = Arc::new(InMemoryVectorBackend::new());
//!     let embeddings = Arc::new(HashedEmbeddingService::new());
//!     let manager = ContextManager::new(backend, embeddings);
//!
//!     let id = manager
//!         .add_context(ContextEntry::new(
//!             "Decided to use PostgreSQL for user data",
//!             "decision",
//!         ))
//!         .await?;
//!
//!     let results = manager
//!         .retrieve_context("database decisions".into(), Default::default())
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod graph;
pub mod manager;
pub mod migration;
pub mod transform;
pub mod types;

// Re-export commonly used types
pub use backend::{ConnectionStatus, InMemoryVectorBackend, QueryMatch, QueryOptions,
    RestVectorBackend, VectorBackend};
pub use config::RecollectConfig;
pub use embeddings::{EmbeddingService, EMBEDDING_DIM};
pub use error::{RecollectError, Result};
pub use graph::{ContextGraph, GraphEdge};
pub use manager::ContextManager;
pub use migration::MigrationEngine;
pub use transform::EntryTransformer;
pub use types::{
    ContextEntry, ContextQuery, EntryMetadata, MetadataPatch, MigrationOptions,
    MigrationProgress, MigrationReport, MigrationSnapshot, MigrationState, RelatedMemory,
    RelationshipRef, RetrieveOptions, RetrievedContext, TimeRange, VectorRecord,
};
