use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use blob::{BlobStore, LocalBlobStore, StoredBlob, checksum};
pub use commands::{CreateRecordCmd, ReceiptUpload, RecordPatch, UpdateRecordCmd};
pub use error::EngineError;
pub use money::MoneyCents;
pub use receipts::{MIME_PDF, NewReceipt, Receipt, ReceiptOwner};
pub use records::{ExpenseType, IncomeType, Record, RecordKind, RecordType};
pub use repository::{ExpenseRepository, IncomeRepository, RecordRepository};
pub use service::RecordService;

pub mod blob;
mod commands;
mod error;
pub mod expenses;
pub mod incomes;
mod money;
pub mod receipts;
mod records;
mod repository;
mod service;

type ResultEngine<T> = Result<T, EngineError>;

/// Default directory of the local blob store.
pub const DEFAULT_UPLOADS_DIR: &str = "./uploads";

/// Entry point of the bookkeeping core: one [`RecordService`] per record kind,
/// sharing the same database and blob store.
#[derive(Debug, Clone)]
pub struct Engine {
    incomes: RecordService,
    expenses: RecordService,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn incomes(&self) -> &RecordService {
        &self.incomes
    }

    pub fn expenses(&self) -> &RecordService {
        &self.expenses
    }

    pub fn records(&self, kind: RecordKind) -> &RecordService {
        match kind {
            RecordKind::Income => &self.incomes,
            RecordKind::Expense => &self.expenses,
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    blob_store: Option<Arc<dyn BlobStore>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Pass the receipt file store, [`LocalBlobStore`] on `./uploads` if unset.
    pub fn blob_store(mut self, store: Arc<dyn BlobStore>) -> EngineBuilder {
        self.blob_store = Some(store);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let blobs = self
            .blob_store
            .unwrap_or_else(|| Arc::new(LocalBlobStore::new(DEFAULT_UPLOADS_DIR)));
        let incomes = RecordService::new(
            Arc::new(IncomeRepository::new(self.database.clone())),
            blobs.clone(),
        );
        let expenses = RecordService::new(
            Arc::new(ExpenseRepository::new(self.database)),
            blobs,
        );
        Ok(Engine { incomes, expenses })
    }
}
