use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseConnection, DatabaseTransaction, QueryFilter, QueryOrder,
    TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    EngineError, MoneyCents, NewReceipt, Receipt, ReceiptOwner, Record, RecordKind, RecordType,
    ResultEngine, receipts,
};

use super::RecordRepository;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

fn not_found(kind: RecordKind, id: i64) -> EngineError {
    EngineError::NotFound(format!("{kind} {id}"))
}

fn ensure_kind(expected: RecordKind, record: &Record) -> ResultEngine<()> {
    if record.kind != expected || record.record_type.kind() != expected {
        return Err(EngineError::Validation(format!(
            "{} record handed to the {expected} repository",
            record.kind
        )));
    }
    Ok(())
}

/// Inserts or updates the receipt owned by `owner`.
async fn upsert_receipt(
    db_tx: &DatabaseTransaction,
    receipt: &Receipt,
    owner: ReceiptOwner,
    now: DateTime<Utc>,
) -> ResultEngine<receipts::Model> {
    let owner_filter = match owner {
        ReceiptOwner::Income(id) => receipts::Column::IncomeId.eq(id),
        ReceiptOwner::Expense(id) => receipts::Column::ExpenseId.eq(id),
    };
    let existing = receipts::Entity::find()
        .filter(owner_filter)
        .one(db_tx)
        .await?;

    let (income_id, expense_id) = owner.columns();
    let mut active = receipts::ActiveModel {
        id: ActiveValue::NotSet,
        income_id: ActiveValue::Set(income_id),
        expense_id: ActiveValue::Set(expense_id),
        file_name: ActiveValue::Set(receipt.file_name.clone()),
        locator: ActiveValue::Set(receipt.locator.clone()),
        mime_type: ActiveValue::Set(receipt.mime_type.clone()),
        uploaded_by: ActiveValue::Set(receipt.uploaded_by),
        checksum: ActiveValue::Set(receipt.checksum.clone()),
        created_at: ActiveValue::NotSet,
        updated_at: ActiveValue::Set(now),
    };

    let model = match existing {
        Some(current) => {
            active.id = ActiveValue::Unchanged(current.id);
            active.update(db_tx).await?
        }
        None => {
            active.created_at = ActiveValue::Set(now);
            active.insert(db_tx).await?
        }
    };
    Ok(model)
}

/// Generates the `sea-orm` repository of one record table.
///
/// `incomes` and `expenses` share the same columns, only the table and the
/// receipt owning key differ.
macro_rules! impl_record_repository {
    ($(#[$meta:meta])* $name:ident, $table:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name {
            database: DatabaseConnection,
        }

        impl $name {
            pub fn new(database: DatabaseConnection) -> Self {
                Self { database }
            }

            fn to_record(
                model: crate::$table::Model,
                receipt: Option<receipts::Model>,
            ) -> ResultEngine<Record> {
                let kind = $kind;
                let receipt = receipt.map(Receipt::try_from).transpose()?;
                if let Some(receipt) = &receipt
                    && receipt.owner != ReceiptOwner::new(kind, model.id)
                {
                    return Err(EngineError::Corrupted(format!(
                        "receipt {} is not owned by {kind} {}",
                        receipt.id, model.id
                    )));
                }
                let record_type = RecordType::parse(kind, &model.record_type).map_err(|_| {
                    EngineError::Corrupted(format!(
                        "invalid {kind} type: {}",
                        model.record_type
                    ))
                })?;
                Ok(Record {
                    id: model.id,
                    kind,
                    amount: MoneyCents::new(model.amount_minor),
                    description: model.description,
                    date: model.date,
                    record_type,
                    created_by: model.created_by,
                    created_at: model.created_at,
                    updated_at: model.updated_at,
                    deleted_at: model.deleted_at,
                    receipt,
                })
            }

            async fn find_one<C: ConnectionTrait>(
                db: &C,
                id: i64,
                include_deleted: bool,
            ) -> ResultEngine<Record> {
                let mut query = crate::$table::Entity::find_by_id(id);
                if !include_deleted {
                    query = query.filter(crate::$table::Column::DeletedAt.is_null());
                }
                let (model, receipt) = query
                    .find_also_related(receipts::Entity)
                    .one(db)
                    .await?
                    .ok_or_else(|| not_found($kind, id))?;
                Self::to_record(model, receipt)
            }
        }

        #[async_trait]
        impl RecordRepository for $name {
            fn kind(&self) -> RecordKind {
                $kind
            }

            async fn get_by_id(&self, id: i64) -> ResultEngine<Record> {
                Self::find_one(&self.database, id, false).await
            }

            async fn get_by_id_with_deleted(&self, id: i64) -> ResultEngine<Record> {
                Self::find_one(&self.database, id, true).await
            }

            async fn list(&self) -> ResultEngine<Vec<Record>> {
                let rows = crate::$table::Entity::find()
                    .filter(crate::$table::Column::DeletedAt.is_null())
                    .order_by_desc(crate::$table::Column::Date)
                    .order_by_desc(crate::$table::Column::Id)
                    .find_also_related(receipts::Entity)
                    .all(&self.database)
                    .await?;
                rows.into_iter()
                    .map(|(model, receipt)| Self::to_record(model, receipt))
                    .collect()
            }

            async fn create_with_receipt(
                &self,
                record: &Record,
                receipt: &NewReceipt,
            ) -> ResultEngine<Record> {
                ensure_kind($kind, record)?;
                with_tx!(self, |db_tx| {
                    let model = crate::$table::ActiveModel {
                        id: ActiveValue::NotSet,
                        amount_minor: ActiveValue::Set(record.amount.cents()),
                        description: ActiveValue::Set(record.description.clone()),
                        date: ActiveValue::Set(record.date),
                        record_type: ActiveValue::Set(record.record_type.as_str().to_string()),
                        created_by: ActiveValue::Set(record.created_by),
                        created_at: ActiveValue::Set(record.created_at),
                        updated_at: ActiveValue::Set(record.updated_at),
                        deleted_at: ActiveValue::Set(None),
                    }
                    .insert(&db_tx)
                    .await?;

                    let owner = ReceiptOwner::new($kind, model.id);
                    let receipt = receipts::ActiveModel::for_new(receipt, owner, record.created_at)
                        .insert(&db_tx)
                        .await?;

                    Self::to_record(model, Some(receipt))
                })
            }

            async fn update_with_receipt(
                &self,
                record: &Record,
                receipt: Option<&Receipt>,
            ) -> ResultEngine<Record> {
                ensure_kind($kind, record)?;
                with_tx!(self, |db_tx| {
                    let now = Utc::now();
                    let result = crate::$table::Entity::update_many()
                        .col_expr(
                            crate::$table::Column::AmountMinor,
                            Expr::value(record.amount.cents()),
                        )
                        .col_expr(
                            crate::$table::Column::Description,
                            Expr::value(record.description.clone()),
                        )
                        .col_expr(crate::$table::Column::Date, Expr::value(record.date))
                        .col_expr(
                            crate::$table::Column::RecordType,
                            Expr::value(record.record_type.as_str()),
                        )
                        .col_expr(crate::$table::Column::UpdatedAt, Expr::value(now))
                        .filter(crate::$table::Column::Id.eq(record.id))
                        .filter(crate::$table::Column::DeletedAt.is_null())
                        .exec(&db_tx)
                        .await?;
                    if result.rows_affected == 0 {
                        return Err(not_found($kind, record.id));
                    }

                    if let Some(receipt) = receipt {
                        upsert_receipt(&db_tx, receipt, ReceiptOwner::new($kind, record.id), now)
                            .await?;
                    }

                    Self::find_one(&db_tx, record.id, false).await
                })
            }

            async fn soft_delete(&self, id: i64) -> ResultEngine<()> {
                let result = crate::$table::Entity::update_many()
                    .col_expr(crate::$table::Column::DeletedAt, Expr::value(Utc::now()))
                    .filter(crate::$table::Column::Id.eq(id))
                    .filter(crate::$table::Column::DeletedAt.is_null())
                    .exec(&self.database)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(not_found($kind, id));
                }
                Ok(())
            }

            async fn restore(&self, id: i64) -> ResultEngine<()> {
                let result = crate::$table::Entity::update_many()
                    .col_expr(
                        crate::$table::Column::DeletedAt,
                        Expr::value(Option::<DateTime<Utc>>::None),
                    )
                    .filter(crate::$table::Column::Id.eq(id))
                    .exec(&self.database)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(not_found($kind, id));
                }
                Ok(())
            }

            async fn delete(&self, id: i64) -> ResultEngine<()> {
                let result = crate::$table::Entity::delete_by_id(id)
                    .exec(&self.database)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(not_found($kind, id));
                }
                Ok(())
            }
        }
    };
}

impl_record_repository!(
    /// `sea-orm` repository of the `incomes` table.
    IncomeRepository,
    incomes,
    RecordKind::Income
);

impl_record_repository!(
    /// `sea-orm` repository of the `expenses` table.
    ExpenseRepository,
    expenses,
    RecordKind::Expense
);
