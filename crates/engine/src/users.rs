//! Users table.
//!
//! A user is created exactly once, at first authentication, together with
//! its balance and inventory. `username` is unique at the storage level.

use chrono::Utc;
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, Principal, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub username: String,
    pub password_hash: String,
    pub balance_id: String,
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

impl ActiveModel {
    pub(crate) fn registered(
        id: Uuid,
        username: &str,
        password_hash: String,
        balance_id: Uuid,
    ) -> Self {
        Self {
            id: ActiveValue::Set(id.to_string()),
            username: ActiveValue::Set(username.to_string()),
            password_hash: ActiveValue::Set(password_hash),
            balance_id: ActiveValue::Set(balance_id.to_string()),
            created_at: ActiveValue::Set(Utc::now()),
            deleted: ActiveValue::Set(false),
            deleted_at: ActiveValue::Set(None),
        }
    }
}

impl Model {
    pub(crate) fn balance_uuid(&self) -> Result<Uuid, EngineError> {
        parse_uuid(&self.balance_id, "balance")
    }
}

impl TryFrom<&Model> for Principal {
    type Error = EngineError;

    fn try_from(model: &Model) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: parse_uuid(&model.id, "user")?,
            username: model.username.clone(),
        })
    }
}
