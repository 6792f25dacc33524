//! Receipt primitives.
//!
//! A [`Receipt`] is the PDF attachment proving a record. It is owned by
//! exactly one record: the `income_id`/`expense_id` columns are mutually
//! exclusive, which [`ReceiptOwner`] encodes in the type.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, RecordKind, ResultEngine, blob::StoredBlob};

/// MIME type of every receipt handled by the engine.
pub const MIME_PDF: &str = "application/pdf";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "owner", content = "id", rename_all = "snake_case")]
pub enum ReceiptOwner {
    Income(i64),
    Expense(i64),
}

impl ReceiptOwner {
    pub fn new(kind: RecordKind, record_id: i64) -> Self {
        match kind {
            RecordKind::Income => Self::Income(record_id),
            RecordKind::Expense => Self::Expense(record_id),
        }
    }

    /// Splits the owner into the `(income_id, expense_id)` column pair.
    pub(crate) fn columns(self) -> (Option<i64>, Option<i64>) {
        match self {
            Self::Income(id) => (Some(id), None),
            Self::Expense(id) => (None, Some(id)),
        }
    }

    pub(crate) fn from_columns(
        income_id: Option<i64>,
        expense_id: Option<i64>,
    ) -> ResultEngine<Self> {
        match (income_id, expense_id) {
            (Some(id), None) => Ok(Self::Income(id)),
            (None, Some(id)) => Ok(Self::Expense(id)),
            (Some(_), Some(_)) => Err(EngineError::Corrupted(
                "receipt owned by both an income and an expense".to_string(),
            )),
            (None, None) => Err(EngineError::Corrupted(
                "receipt without owning record".to_string(),
            )),
        }
    }
}

/// Receipt fields known before the owning record exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReceipt {
    pub file_name: String,
    pub locator: String,
    pub mime_type: String,
    pub uploaded_by: i64,
    pub checksum: String,
}

impl NewReceipt {
    pub fn from_blob(blob: StoredBlob, uploaded_by: i64) -> Self {
        Self {
            file_name: blob.name,
            locator: blob.locator,
            mime_type: MIME_PDF.to_string(),
            uploaded_by,
            checksum: blob.checksum,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub owner: ReceiptOwner,
    pub file_name: String,
    /// Where the blob store keeps the file (relative path or URL).
    pub locator: String,
    pub mime_type: String,
    pub uploaded_by: i64,
    /// Hex SHA-256 of the last committed blob.
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Receipt {
    /// Points the receipt at a freshly stored blob (in memory only).
    pub fn replace_blob(&mut self, blob: StoredBlob, uploaded_by: i64) {
        self.file_name = blob.name;
        self.locator = blob.locator;
        self.mime_type = MIME_PDF.to_string();
        self.uploaded_by = uploaded_by;
        self.checksum = blob.checksum;
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "receipts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub income_id: Option<i64>,
    pub expense_id: Option<i64>,
    pub file_name: String,
    pub locator: String,
    pub mime_type: String,
    pub uploaded_by: i64,
    pub checksum: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::incomes::Entity",
        from = "Column::IncomeId",
        to = "super::incomes::Column::Id",
        on_delete = "Cascade"
    )]
    Income,
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_delete = "Cascade"
    )]
    Expense,
}

impl Related<super::incomes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Income.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn for_new(receipt: &NewReceipt, owner: ReceiptOwner, now: DateTime<Utc>) -> Self {
        let (income_id, expense_id) = owner.columns();
        Self {
            id: ActiveValue::NotSet,
            income_id: ActiveValue::Set(income_id),
            expense_id: ActiveValue::Set(expense_id),
            file_name: ActiveValue::Set(receipt.file_name.clone()),
            locator: ActiveValue::Set(receipt.locator.clone()),
            mime_type: ActiveValue::Set(receipt.mime_type.clone()),
            uploaded_by: ActiveValue::Set(receipt.uploaded_by),
            checksum: ActiveValue::Set(receipt.checksum.clone()),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
    }
}

impl TryFrom<Model> for Receipt {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            owner: ReceiptOwner::from_columns(model.income_id, model.expense_id)?,
            file_name: model.file_name,
            locator: model.locator,
            mime_type: model.mime_type,
            uploaded_by: model.uploaded_by,
            checksum: model.checksum,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
