//! Coin balances.
//!
//! A balance row is only ever mutated through the ledger primitives in
//! `ops::ledger`, inside an atomic unit. The storage layer additionally
//! rejects negative amounts with a `CHECK` constraint.

use chrono::Utc;
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

/// Coins granted to every user at registration.
pub const STARTING_BALANCE: i64 = 1000;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub amount: i64,
    pub created_at: DateTimeUtc,
    pub deleted: bool,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::balance_history::Entity")]
    History,
}

impl Related<super::balance_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// A fresh, live balance seeded with `amount` coins.
    pub(crate) fn opening(id: Uuid, amount: i64) -> Self {
        Self {
            id: ActiveValue::Set(id.to_string()),
            amount: ActiveValue::Set(amount),
            created_at: ActiveValue::Set(Utc::now()),
            deleted: ActiveValue::Set(false),
            deleted_at: ActiveValue::Set(None),
        }
    }
}
