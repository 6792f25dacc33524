//! Persistence of a record paired 1:1 with its receipt row.
//!
//! The repository owns the only database transaction boundary of the
//! engine. One implementation exists per record kind, bound to `sea-orm`;
//! the record service only sees the [`RecordRepository`] capability so it
//! can be exercised against an in-memory fake.

use async_trait::async_trait;

use crate::{NewReceipt, Receipt, Record, RecordKind, ResultEngine};

mod sea;

pub use sea::{ExpenseRepository, IncomeRepository};

#[async_trait]
pub trait RecordRepository: Send + Sync {
    fn kind(&self) -> RecordKind;

    /// Active record by id, with its receipt. Soft-deleted rows are `NotFound`.
    async fn get_by_id(&self, id: i64) -> ResultEngine<Record>;

    /// Record by id including soft-deleted rows (used to restore).
    async fn get_by_id_with_deleted(&self, id: i64) -> ResultEngine<Record>;

    /// Active records, most recent first.
    async fn list(&self) -> ResultEngine<Vec<Record>>;

    /// Inserts the record and its receipt in one transaction.
    ///
    /// Returns the persisted record, with its id and receipt set.
    async fn create_with_receipt(&self, record: &Record, receipt: &NewReceipt)
    -> ResultEngine<Record>;

    /// Updates the mutable fields of an active record and, if given, upserts
    /// its receipt, in one transaction. Zero rows matched is `NotFound`.
    async fn update_with_receipt(
        &self,
        record: &Record,
        receipt: Option<&Receipt>,
    ) -> ResultEngine<Record>;

    /// Sets the soft-delete timestamp if it is not set yet.
    async fn soft_delete(&self, id: i64) -> ResultEngine<()>;

    /// Clears the soft-delete timestamp.
    async fn restore(&self, id: i64) -> ResultEngine<()>;

    /// Hard delete; the receipt row goes with it through the FK cascade.
    async fn delete(&self, id: i64) -> ResultEngine<()>;
}
