//! Ledger entries.
//!
//! A [`LedgerEntry`] is one immutable row of a balance's history. The amount
//! is always the positive number of coins moved; direction is given by
//! `sender` and `recipient`:
//! - a transfer writes two entries (one per balance) with identical amount,
//!   sender and recipient;
//! - a purchase writes one entry whose recipient is [`SHOP_ACCOUNT`].
//!
//! Entries are append-only: nothing in the engine updates or deletes them.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

/// Reserved recipient of purchase proceeds.
pub const SHOP_ACCOUNT: &str = "shop";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub balance_id: Uuid,
    pub amount: i64,
    pub sender: String,
    pub recipient: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        balance_id: Uuid,
        amount: i64,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            balance_id,
            amount,
            sender: sender.into(),
            recipient: recipient.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether `username` is the receiving side of this entry.
    pub fn is_received_by(&self, username: &str) -> bool {
        self.recipient == username
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balance_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub balance_id: String,
    pub transaction_amount: i64,
    pub sender: String,
    pub recipient: String,
    pub created_at: DateTimeUtc,
    pub deleted: bool,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::balances::Entity",
        from = "Column::BalanceId",
        to = "super::balances::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Balances,
}

impl Related<super::balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Balances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LedgerEntry> for ActiveModel {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            balance_id: ActiveValue::Set(entry.balance_id.to_string()),
            transaction_amount: ActiveValue::Set(entry.amount),
            sender: ActiveValue::Set(entry.sender.clone()),
            recipient: ActiveValue::Set(entry.recipient.clone()),
            created_at: ActiveValue::Set(entry.created_at),
            deleted: ActiveValue::Set(false),
            deleted_at: ActiveValue::Set(None),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "ledger entry")?,
            balance_id: parse_uuid(&model.balance_id, "balance")?,
            amount: model.transaction_amount,
            sender: model.sender,
            recipient: model.recipient,
            created_at: model.created_at,
        })
    }
}
