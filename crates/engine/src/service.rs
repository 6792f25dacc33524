//! Record service: keeps the database rows and the receipt files consistent.
//!
//! The database side is transactional, the blob store is not. Every write
//! follows the same ordering: the new blob is written before the DB commit,
//! and a blob is deleted only once the DB outcome is known. A failure can
//! therefore leave an orphan file behind, but never a row pointing at a file
//! that was not written.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    BlobStore, CreateRecordCmd, EngineError, NewReceipt, Record, RecordKind, RecordPatch,
    RecordType, ResultEngine, UpdateRecordCmd,
    records::{normalize_description, validate_amount},
    repository::RecordRepository,
};

#[derive(Clone)]
pub struct RecordService {
    kind: RecordKind,
    repository: Arc<dyn RecordRepository>,
    blobs: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for RecordService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordService")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl RecordService {
    pub fn new(repository: Arc<dyn RecordRepository>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            kind: repository.kind(),
            repository,
            blobs,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Creates a record and stores its receipt.
    ///
    /// Validation happens before any side effect. If the DB transaction
    /// fails, the blob written for it is removed (best effort) and the DB
    /// error is returned.
    pub async fn create(&self, cmd: CreateRecordCmd) -> ResultEngine<Record> {
        let now = Utc::now();
        let record = Record::new(
            self.kind,
            cmd.amount,
            &cmd.description,
            &cmd.record_type,
            cmd.date,
            cmd.created_by,
            now,
        )?;
        let upload = cmd
            .receipt
            .ok_or_else(|| EngineError::Validation("receipt file is required".to_string()))?;

        let blob = self.blobs.save(&upload).await?;
        let locator = blob.locator.clone();
        let receipt = NewReceipt::from_blob(blob, record.created_by);

        match self.repository.create_with_receipt(&record, &receipt).await {
            Ok(created) => {
                tracing::info!(kind = %self.kind, id = created.id, "record created");
                Ok(created)
            }
            Err(err) => {
                self.discard_blob(&locator, "create failed").await;
                Err(err)
            }
        }
    }

    pub async fn get(&self, id: i64) -> ResultEngine<Record> {
        self.repository.get_by_id(id).await
    }

    pub async fn list(&self) -> ResultEngine<Vec<Record>> {
        self.repository.list().await
    }

    /// Applies a sparse patch and, optionally, replaces the receipt file.
    ///
    /// Only the creator may update. The previous blob is removed after the
    /// commit, and only when the new file has different content.
    ///
    /// An upload with the same checksum as the current file is not written
    /// through: its fresh blob is deleted and the receipt row keeps pointing
    /// at the existing blob instead of being rewritten to the new copy.
    pub async fn update(&self, cmd: UpdateRecordCmd) -> ResultEngine<Record> {
        let mut record = self.repository.get_by_id(cmd.id).await?;
        record.ensure_creator(cmd.user_id, "update")?;
        apply_patch(&mut record, &cmd.patch)?;

        let mut new_locator = None;
        let mut old_locator = None;
        let mut receipt = None;

        if let Some(upload) = &cmd.receipt {
            let mut current = record.receipt.clone().ok_or_else(|| {
                EngineError::Validation("receipt not found for this record".to_string())
            })?;
            let blob = self.blobs.save(upload).await?;

            if blob.checksum == current.checksum {
                self.discard_blob(&blob.locator, "duplicate of the current receipt")
                    .await;
            } else {
                old_locator = Some(current.locator.clone());
                new_locator = Some(blob.locator.clone());
                current.replace_blob(blob, cmd.user_id);
                receipt = Some(current);
            }
        }

        match self
            .repository
            .update_with_receipt(&record, receipt.as_ref())
            .await
        {
            Ok(updated) => {
                if let Some(old) = old_locator {
                    self.discard_blob(&old, "replaced by a new receipt").await;
                }
                tracing::info!(kind = %self.kind, id = updated.id, "record updated");
                Ok(updated)
            }
            Err(err) => {
                if let Some(new) = new_locator {
                    self.discard_blob(&new, "update failed").await;
                }
                Err(err)
            }
        }
    }

    /// Hides a record. Creator only; the receipt file is kept so the record
    /// can be restored.
    pub async fn soft_delete(&self, id: i64, user_id: i64) -> ResultEngine<()> {
        let record = self.repository.get_by_id(id).await?;
        record.ensure_creator(user_id, "delete")?;
        self.repository.soft_delete(id).await?;
        tracing::info!(kind = %self.kind, id, user_id, "record soft-deleted");
        Ok(())
    }

    /// Makes a soft-deleted record visible again.
    ///
    /// A record that was hard deleted (or never existed) is `NotFound`.
    pub async fn restore(&self, id: i64) -> ResultEngine<Record> {
        self.repository.get_by_id_with_deleted(id).await?;
        self.repository.restore(id).await?;
        tracing::info!(kind = %self.kind, id, "record restored");
        self.repository.get_by_id(id).await
    }

    /// Permanently removes an active record and its receipt file.
    pub async fn delete(&self, id: i64) -> ResultEngine<()> {
        let record = self.repository.get_by_id(id).await?;
        self.repository.delete(id).await?;
        if let Some(receipt) = &record.receipt {
            self.discard_blob(&receipt.locator, "record deleted").await;
        }
        tracing::info!(kind = %self.kind, id, "record deleted");
        Ok(())
    }

    /// Best-effort blob removal used on compensation paths.
    async fn discard_blob(&self, locator: &str, reason: &str) {
        if let Err(err) = self.blobs.delete(locator).await {
            tracing::warn!(
                kind = %self.kind,
                locator,
                reason,
                error = %err,
                "cannot delete receipt blob, leaving an orphan file"
            );
        }
    }
}

fn apply_patch(record: &mut Record, patch: &RecordPatch) -> ResultEngine<()> {
    let kind = record.kind;
    if let Some(amount) = patch.amount {
        record.amount = validate_amount(kind, amount)?;
    }
    if let Some(description) = &patch.description {
        record.description = normalize_description(kind, description)?;
    }
    if let Some(record_type) = &patch.record_type {
        record.record_type = RecordType::parse(kind, record_type)?;
    }
    if let Some(date) = patch.date {
        record.date = date;
    }
    Ok(())
}
