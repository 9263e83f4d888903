//! Inventory items, keyed by `(inventory_id, merch_id)`.
//!
//! `count` only grows: every successful purchase bumps it by one.

use chrono::Utc;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// An owned catalog item and how many of it the user holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub name: String,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub inventory_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub merch_id: String,
    pub count: i64,
    pub created_at: DateTimeUtc,
    pub deleted: bool,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventories::Entity",
        from = "Column::InventoryId",
        to = "super::inventories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Inventories,
    #[sea_orm(
        belongs_to = "super::merch::Entity",
        from = "Column::MerchId",
        to = "super::merch::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Merch,
}

impl Related<super::inventories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventories.def()
    }
}

impl Related<super::merch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Merch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// First unit of an item in an inventory.
    pub(crate) fn first_unit(inventory_id: &str, merch_id: &str) -> Self {
        Self {
            inventory_id: ActiveValue::Set(inventory_id.to_string()),
            merch_id: ActiveValue::Set(merch_id.to_string()),
            count: ActiveValue::Set(1),
            created_at: ActiveValue::Set(Utc::now()),
            deleted: ActiveValue::Set(false),
            deleted_at: ActiveValue::Set(None),
        }
    }
}
