//! The catalog of purchasable merch.

use sea_orm_migration::{prelude::*, sea_orm::ConnectionTrait};
use uuid::Uuid;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Merch {
    Table,
    Id,
    Name,
    Price,
    CreatedAt,
    Deleted,
}

/// Name and price in coins.
pub const CATALOG: [(&str, i64); 10] = [
    ("t-shirt", 80),
    ("cup", 20),
    ("book", 50),
    ("pen", 10),
    ("powerbank", 200),
    ("hoody", 300),
    ("umbrella", 200),
    ("socks", 10),
    ("wallet", 50),
    ("pink-hoody", 500),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let now = chrono::Utc::now();
        let mut insert = Query::insert();
        insert.into_table(Merch::Table).columns([
            Merch::Id,
            Merch::Name,
            Merch::Price,
            Merch::CreatedAt,
            Merch::Deleted,
        ]);
        for (name, price) in CATALOG {
            insert
                .values([
                    Uuid::new_v4().to_string().into(),
                    name.into(),
                    price.into(),
                    now.into(),
                    false.into(),
                ])
                .map_err(|err| DbErr::Custom(format!("invalid merch row {name}: {err}")))?;
        }

        let db = manager.get_connection();
        db.execute(manager.get_database_backend().build(&insert)).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let names: Vec<&str> = CATALOG.iter().map(|(name, _)| *name).collect();
        let delete = Query::delete()
            .from_table(Merch::Table)
            .and_where(Expr::col(Merch::Name).is_in(names))
            .to_owned();

        let db = manager.get_connection();
        db.execute(manager.get_database_backend().build(&delete)).await?;
        Ok(())
    }
}
