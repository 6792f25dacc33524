//! Initial schema migration.
//!
//! - `incomes`: money coming in, soft-deletable
//! - `expenses`: money going out, soft-deletable
//! - `receipts`: the PDF proving a record, owned by exactly one income or
//!   one expense and removed with it

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden, Clone, Copy)]
enum Incomes {
    Table,
    Id,
    AmountMinor,
    Description,
    Date,
    RecordType,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(Iden, Clone, Copy)]
enum Expenses {
    Table,
    Id,
    AmountMinor,
    Description,
    Date,
    RecordType,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(Iden)]
enum Receipts {
    Table,
    Id,
    IncomeId,
    ExpenseId,
    FileName,
    Locator,
    MimeType,
    UploadedBy,
    Checksum,
    CreatedAt,
    UpdatedAt,
}

/// Both record tables share the same shape.
macro_rules! record_table {
    ($iden:ident) => {
        Table::create()
            .table($iden::Table)
            .if_not_exists()
            .col(
                ColumnDef::new($iden::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new($iden::AmountMinor).big_integer().not_null())
            .col(ColumnDef::new($iden::Description).string().not_null())
            .col(ColumnDef::new($iden::Date).timestamp().not_null())
            .col(ColumnDef::new($iden::RecordType).string().not_null())
            .col(ColumnDef::new($iden::CreatedBy).big_integer().not_null())
            .col(ColumnDef::new($iden::CreatedAt).timestamp().not_null())
            .col(ColumnDef::new($iden::UpdatedAt).timestamp().not_null())
            .col(ColumnDef::new($iden::DeletedAt).timestamp())
            .to_owned()
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Incomes / Expenses
        // ───────────────────────────────────────────────────────────────────
        manager.create_table(record_table!(Incomes)).await?;
        manager.create_table(record_table!(Expenses)).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-incomes-deleted_at")
                    .table(Incomes::Table)
                    .col(Incomes::DeletedAt)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-deleted_at")
                    .table(Expenses::Table)
                    .col(Expenses::DeletedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Receipts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Receipts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Receipts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Receipts::IncomeId).integer())
                    .col(ColumnDef::new(Receipts::ExpenseId).integer())
                    .col(ColumnDef::new(Receipts::FileName).string().not_null())
                    .col(ColumnDef::new(Receipts::Locator).string().not_null())
                    .col(ColumnDef::new(Receipts::MimeType).string().not_null())
                    .col(ColumnDef::new(Receipts::UploadedBy).big_integer().not_null())
                    .col(ColumnDef::new(Receipts::Checksum).string().not_null())
                    .col(ColumnDef::new(Receipts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Receipts::UpdatedAt).timestamp().not_null())
                    // exactly one owner
                    .check(Expr::cust("(income_id IS NULL) <> (expense_id IS NULL)"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-receipts-income_id")
                            .from(Receipts::Table, Receipts::IncomeId)
                            .to(Incomes::Table, Incomes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-receipts-expense_id")
                            .from(Receipts::Table, Receipts::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-receipts-income_id-unique")
                    .table(Receipts::Table)
                    .col(Receipts::IncomeId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-receipts-expense_id-unique")
                    .table(Receipts::Table)
                    .col(Receipts::ExpenseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Receipts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Incomes::Table).to_owned())
            .await?;
        Ok(())
    }
}
