//! Initial schema.
//!
//! - `balances`: one coin balance per user, never negative
//! - `users`: credentials, unique username, pointer to the balance
//! - `balance_history`: immutable ledger rows, one per side of a movement
//! - `merch`: the catalog
//! - `inventories`: one per user
//! - `inventory_items`: owned merch and counts
//!
//! Every table is soft-deletable (`deleted`, `deleted_at`); nothing in the
//! application deletes rows.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Balances {
    Table,
    Id,
    Amount,
    CreatedAt,
    Deleted,
    DeletedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    BalanceId,
    CreatedAt,
    Deleted,
    DeletedAt,
}

#[derive(Iden)]
enum BalanceHistory {
    Table,
    Id,
    BalanceId,
    TransactionAmount,
    Sender,
    Recipient,
    CreatedAt,
    Deleted,
    DeletedAt,
}

#[derive(Iden)]
enum Merch {
    Table,
    Id,
    Name,
    Price,
    CreatedAt,
    Deleted,
    DeletedAt,
}

#[derive(Iden)]
enum Inventories {
    Table,
    Id,
    UserId,
    CreatedAt,
    Deleted,
    DeletedAt,
}

#[derive(Iden)]
enum InventoryItems {
    Table,
    InventoryId,
    MerchId,
    Count,
    CreatedAt,
    Deleted,
    DeletedAt,
}

/// `created_at`, `deleted`, `deleted_at`, shared by every table.
fn audit_columns<T: Iden + 'static>(
    table: &mut TableCreateStatement,
    created_at: T,
    deleted: T,
    deleted_at: T,
) -> &mut TableCreateStatement {
    table
        .col(
            ColumnDef::new(created_at)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(deleted)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(ColumnDef::new(deleted_at).timestamp_with_time_zone())
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                audit_columns(
                    Table::create()
                        .table(Balances::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Balances::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Balances::Amount)
                                .big_integer()
                                .not_null()
                                .check(Expr::col(Balances::Amount).gte(0)),
                        ),
                    Balances::CreatedAt,
                    Balances::Deleted,
                    Balances::DeletedAt,
                )
                .to_owned(),
            )
            .await?;

        manager
            .create_table(
                audit_columns(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                        .col(
                            ColumnDef::new(Users::Username)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::BalanceId).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-users-balance_id")
                                .from(Users::Table, Users::BalanceId)
                                .to(Balances::Table, Balances::Id),
                        ),
                    Users::CreatedAt,
                    Users::Deleted,
                    Users::DeletedAt,
                )
                .to_owned(),
            )
            .await?;

        manager
            .create_table(
                audit_columns(
                    Table::create()
                        .table(BalanceHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BalanceHistory::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(BalanceHistory::BalanceId).string().not_null())
                        .col(
                            ColumnDef::new(BalanceHistory::TransactionAmount)
                                .big_integer()
                                .not_null()
                                .check(Expr::col(BalanceHistory::TransactionAmount).gt(0)),
                        )
                        .col(ColumnDef::new(BalanceHistory::Sender).string().not_null())
                        .col(ColumnDef::new(BalanceHistory::Recipient).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-balance_history-balance_id")
                                .from(BalanceHistory::Table, BalanceHistory::BalanceId)
                                .to(Balances::Table, Balances::Id),
                        ),
                    BalanceHistory::CreatedAt,
                    BalanceHistory::Deleted,
                    BalanceHistory::DeletedAt,
                )
                .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-balance_history-balance_id")
                    .table(BalanceHistory::Table)
                    .col(BalanceHistory::BalanceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                audit_columns(
                    Table::create()
                        .table(Merch::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Merch::Id).string().not_null().primary_key())
                        .col(ColumnDef::new(Merch::Name).string().not_null().unique_key())
                        .col(
                            ColumnDef::new(Merch::Price)
                                .big_integer()
                                .not_null()
                                .check(Expr::col(Merch::Price).gt(0)),
                        ),
                    Merch::CreatedAt,
                    Merch::Deleted,
                    Merch::DeletedAt,
                )
                .to_owned(),
            )
            .await?;

        manager
            .create_table(
                audit_columns(
                    Table::create()
                        .table(Inventories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Inventories::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Inventories::UserId)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-inventories-user_id")
                                .from(Inventories::Table, Inventories::UserId)
                                .to(Users::Table, Users::Id),
                        ),
                    Inventories::CreatedAt,
                    Inventories::Deleted,
                    Inventories::DeletedAt,
                )
                .to_owned(),
            )
            .await?;

        manager
            .create_table(
                audit_columns(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::InventoryId)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::MerchId).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::Count)
                                .big_integer()
                                .not_null()
                                .check(Expr::col(InventoryItems::Count).gte(1)),
                        )
                        .primary_key(
                            Index::create()
                                .col(InventoryItems::InventoryId)
                                .col(InventoryItems::MerchId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-inventory_items-inventory_id")
                                .from(InventoryItems::Table, InventoryItems::InventoryId)
                                .to(Inventories::Table, Inventories::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk-inventory_items-merch_id")
                                .from(InventoryItems::Table, InventoryItems::MerchId)
                                .to(Merch::Table, Merch::Id),
                        ),
                    InventoryItems::CreatedAt,
                    InventoryItems::Deleted,
                    InventoryItems::DeletedAt,
                )
                .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Inventories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Merch::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BalanceHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Balances::Table).to_owned())
            .await?;
        Ok(())
    }
}
