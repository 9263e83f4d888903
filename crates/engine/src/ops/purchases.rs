//! Purchase Engine.

use sea_orm::{
    DatabaseTransaction, EntityTrait, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

use crate::{
    BuyItemCmd, CatalogItem, EngineError, LedgerEntry, ResultEngine, SHOP_ACCOUNT,
    inventory_items, util::normalize_item_name,
};

use super::{Engine, with_tx};

impl Engine {
    /// Buy one unit of a catalog item.
    ///
    /// The balance is checked up front for a clean error, then re-checked by
    /// the conditional debit inside the unit, which is what actually guards
    /// against concurrent spends.
    pub async fn buy_item(&self, cmd: BuyItemCmd) -> ResultEngine<()> {
        let name = normalize_item_name(&cmd.item)
            .map_err(|_| EngineError::ItemNotFound(cmd.item.clone()))?;
        let item = self
            .find_item(&self.database, &name)
            .await?
            .ok_or_else(|| EngineError::ItemNotFound(name.clone()))?;

        let coins = self.balance_of(cmd.buyer.user_id).await?;
        if item.price > coins {
            return Err(EngineError::InsufficientFunds(format!(
                "{} costs {}, balance is {coins}",
                item.name, item.price
            )));
        }

        with_tx!(self, |db_tx| { self.purchase(&db_tx, &cmd, &item).await })
    }

    async fn purchase(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &BuyItemCmd,
        item: &CatalogItem,
    ) -> ResultEngine<()> {
        let buyer = self.require_user(db_tx, cmd.buyer.user_id).await?;
        let balance_id = buyer.balance_uuid()?;
        let inventory = self.require_inventory(db_tx, cmd.buyer.user_id).await?;

        self.lock_balances(db_tx, &[balance_id]).await?;
        if self
            .debit_if_sufficient(db_tx, balance_id, item.price)
            .await?
            == 0
        {
            return Err(EngineError::InsufficientFunds(format!(
                "{} costs {}",
                item.name, item.price
            )));
        }
        self.append_entry(
            db_tx,
            &LedgerEntry::new(balance_id, item.price, buyer.username.as_str(), SHOP_ACCOUNT),
        )
        .await?;

        inventory_items::Entity::insert(inventory_items::ActiveModel::first_unit(
            &inventory.id,
            &item.id.to_string(),
        ))
        .on_conflict(
            OnConflict::columns([
                inventory_items::Column::InventoryId,
                inventory_items::Column::MerchId,
            ])
            .value(
                inventory_items::Column::Count,
                Expr::col((inventory_items::Entity, inventory_items::Column::Count)).add(1),
            )
            .to_owned(),
        )
        .exec_without_returning(db_tx)
        .await?;

        Ok(())
    }
}
