//! Query Aggregator.

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    CoinHistory, EngineError, InventoryEntry, LedgerEntry, Principal, ResultEngine, UserInfo,
    balance_history, inventory_items, merch,
};

use super::{Engine, with_tx};

impl Engine {
    /// Coins, inventory and coin history of the caller, read from one
    /// snapshot so the three parts agree with each other.
    pub async fn user_info(&self, principal: &Principal) -> ResultEngine<UserInfo> {
        with_tx!(self, |db_tx| { self.snapshot(&db_tx, principal).await })
    }

    /// Items owned by a user, ordered by item name. Items withdrawn from the
    /// catalog are left out.
    pub async fn inventory_of(&self, user_id: Uuid) -> ResultEngine<Vec<InventoryEntry>> {
        self.load_inventory(&self.database, user_id).await
    }

    async fn snapshot(
        &self,
        db_tx: &DatabaseTransaction,
        principal: &Principal,
    ) -> ResultEngine<UserInfo> {
        let user = self.require_user(db_tx, principal.user_id).await?;
        let balance = self.require_balance(db_tx, user.balance_uuid()?).await?;

        let entries = balance_history::Entity::find()
            .filter(balance_history::Column::BalanceId.eq(balance.id.as_str()))
            .filter(balance_history::Column::Deleted.eq(false))
            .order_by_asc(balance_history::Column::CreatedAt)
            .order_by_asc(balance_history::Column::Id)
            .all(db_tx)
            .await?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(UserInfo {
            coins: balance.amount,
            inventory: self.load_inventory(db_tx, principal.user_id).await?,
            coin_history: CoinHistory::partition(&user.username, entries),
        })
    }

    async fn load_inventory<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
    ) -> ResultEngine<Vec<InventoryEntry>> {
        let inventory = self.require_inventory(db, user_id).await?;
        let rows = inventory_items::Entity::find()
            .find_also_related(merch::Entity)
            .filter(inventory_items::Column::InventoryId.eq(inventory.id.as_str()))
            .filter(inventory_items::Column::Deleted.eq(false))
            .filter(merch::Column::Deleted.eq(false))
            .order_by_asc(merch::Column::Name)
            .all(db)
            .await?;

        rows.into_iter()
            .map(|(item, merch)| {
                let merch = merch.ok_or_else(|| {
                    EngineError::Internal(format!("inventory item {} has no merch", item.merch_id))
                })?;
                Ok(InventoryEntry {
                    name: merch.name,
                    count: item.count,
                })
            })
            .collect()
    }
}
