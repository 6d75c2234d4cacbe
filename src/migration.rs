//! Migration engine
//!
//! Drives bulk transformation of legacy flat entries into vector records in
//! fixed-size batches, with batch-level progress snapshots and compensating
//! rollback. Rollback is scoped to the vectors written by the current
//! `migrate` call; there is no persistent transaction log, so a crash
//! mid-migration leaves partially-migrated data behind. That limitation is
//! accepted.

use crate::backend::VectorBackend;
use crate::embeddings::EmbeddingService;
use crate::error::{RecollectError, Result};
use crate::transform::EntryTransformer;
use crate::types::{
    ContextEntry, MigrationErrorRecord, MigrationOptions, MigrationProgress, MigrationReport,
    MigrationSnapshot, MigrationState, VectorRecord,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Batch migration driver
///
/// One engine instance owns one snapshot history; run concurrent migrations
/// on separate instances.
pub struct MigrationEngine {
    backend: Arc<dyn VectorBackend>,
    transformer: EntryTransformer,
    snapshots: Vec<MigrationSnapshot>,
}

impl MigrationEngine {
    pub fn new(backend: Arc<dyn VectorBackend>, embeddings: Arc<dyn EmbeddingService>) -> Self {
        Self {
            backend,
            transformer: EntryTransformer::new(embeddings),
            snapshots: Vec::new(),
        }
    }

    /// Migrate legacy entries into the vector backend
    ///
    /// Batches are processed strictly sequentially; each batch is upserted in
    /// one call so the batch is atomic from the engine's point of view. A
    /// failed entry is counted and skipped, or aborts the whole call when
    /// `rollback_on_error` is set. Any batch-level failure (such as a backend
    /// outage) aborts regardless.
    ///
    /// Returns an error only when the compensating rollback delete itself
    /// fails; every other outcome is reported through [`MigrationReport`].
    pub async fn migrate(
        &mut self,
        entries: Vec<ContextEntry>,
        options: MigrationOptions,
    ) -> Result<MigrationReport> {
        let batch_size = options.batch_size.max(1);
        info!(
            "Starting migration of {} entries (batch_size={}, validate_only={}, rollback_on_error={})",
            entries.len(),
            batch_size,
            options.validate_only,
            options.rollback_on_error
        );

        let mut progress = MigrationProgress::start(entries.len());
        self.take_snapshot(&progress, MigrationState::InProgress);

        // Every vector written by this call, kept for compensating rollback
        let mut migrated_ids: Vec<String> = Vec::new();
        let mut abort_error: Option<String> = None;

        'batches: for batch in entries.chunks(batch_size) {
            let mut batch_records: Vec<VectorRecord> = Vec::with_capacity(batch.len());

            for entry in batch {
                match self.transform_and_validate(entry).await {
                    Ok(record) => {
                        progress.processed += 1;
                        if !options.validate_only {
                            batch_records.push(record);
                        }
                    }
                    Err(e) => {
                        let message = e.to_string();
                        warn!("Entry {} failed migration: {}", entry.id, message);
                        progress.failed += 1;
                        progress.errors.push(MigrationErrorRecord {
                            id: entry.id.clone(),
                            error: message.clone(),
                            entry: entry.clone(),
                        });
                        if options.rollback_on_error {
                            abort_error = Some(message);
                            break 'batches;
                        }
                    }
                }
            }

            if !options.validate_only && !batch_records.is_empty() {
                if let Err(e) = self.backend.upsert(&batch_records).await {
                    abort_error = Some(e.to_string());
                    break 'batches;
                }
                migrated_ids.extend(batch_records.iter().map(|r| r.id.clone()));
            }

            // The unit of observable progress
            self.take_snapshot(&progress, MigrationState::InProgress);
            debug!(
                "Batch complete: {}/{} processed, {} failed",
                progress.processed, progress.total, progress.failed
            );
        }

        progress.finished_at = Some(Utc::now());

        if let Some(error) = abort_error {
            warn!("Migration aborted: {}", error);
            self.take_snapshot(&progress, MigrationState::Failed);

            if options.rollback_on_error && !migrated_ids.is_empty() {
                info!("Rolling back {} migrated vectors", migrated_ids.len());
                self.backend.delete(&migrated_ids).await.map_err(|e| {
                    RecollectError::Backend(format!("rollback delete failed: {}", e))
                })?;
                self.take_snapshot(&progress, MigrationState::RolledBack);
            }

            return Ok(MigrationReport {
                success: false,
                progress,
                rollback_required: options.rollback_on_error,
            });
        }

        self.take_snapshot(&progress, MigrationState::Completed);
        info!(
            "Migration complete: {} processed, {} failed",
            progress.processed, progress.failed
        );

        Ok(MigrationReport {
            success: progress.failed == 0,
            progress,
            rollback_required: false,
        })
    }

    async fn transform_and_validate(&self, entry: &ContextEntry) -> Result<VectorRecord> {
        let record = self.transformer.to_record(entry).await?;
        if !self.transformer.validate(entry, &record) {
            return Err(RecollectError::Transform(format!(
                "round-trip validation failed for entry {}",
                entry.id
            )));
        }
        Ok(record)
    }

    fn take_snapshot(&mut self, progress: &MigrationProgress, state: MigrationState) {
        self.snapshots.push(MigrationSnapshot {
            taken_at: Utc::now(),
            progress: progress.clone(),
            state,
        });
    }

    /// All snapshots taken over this engine's lifetime, oldest first
    pub fn snapshots(&self) -> &[MigrationSnapshot] {
        &self.snapshots
    }

    /// Most recent snapshot, if any migration has run
    pub fn latest_snapshot(&self) -> Option<&MigrationSnapshot> {
        self.snapshots.last()
    }
}
