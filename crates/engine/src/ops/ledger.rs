//! Ledger Store: balance reads and the conditional write primitives.
//!
//! The write primitives take a `&DatabaseTransaction` so they can only run
//! inside an atomic unit (see `with_tx!`).

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};
use uuid::Uuid;

use crate::{EngineError, LedgerEntry, ResultEngine, balance_history, balances};

use super::Engine;

impl Engine {
    /// Current coins of a user.
    pub async fn balance_of(&self, user_id: Uuid) -> ResultEngine<i64> {
        let user = self.require_user(&self.database, user_id).await?;
        let balance = self
            .require_balance(&self.database, user.balance_uuid()?)
            .await?;
        Ok(balance.amount)
    }

    /// Full history of a user's balance, oldest first.
    pub async fn history_of(&self, user_id: Uuid) -> ResultEngine<Vec<LedgerEntry>> {
        let user = self.require_user(&self.database, user_id).await?;
        let models = balance_history::Entity::find()
            .filter(balance_history::Column::BalanceId.eq(user.balance_id.as_str()))
            .filter(balance_history::Column::Deleted.eq(false))
            .order_by_asc(balance_history::Column::CreatedAt)
            .order_by_asc(balance_history::Column::Id)
            .all(&self.database)
            .await?;

        models.into_iter().map(LedgerEntry::try_from).collect()
    }

    pub(crate) async fn require_balance<C: ConnectionTrait>(
        &self,
        db: &C,
        balance_id: Uuid,
    ) -> ResultEngine<balances::Model> {
        balances::Entity::find_by_id(balance_id.to_string())
            .filter(balances::Column::Deleted.eq(false))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("balance {balance_id}")))
    }

    /// Lock the given balances for the rest of the unit.
    ///
    /// Rows are locked in ascending id order so two units touching the same
    /// pair of balances cannot deadlock. SQLite has no row locks; there the
    /// unit already holds the database write lock from its first statement,
    /// so the plain read is enough.
    pub(crate) async fn lock_balances(
        &self,
        db_tx: &DatabaseTransaction,
        balance_ids: &[Uuid],
    ) -> ResultEngine<Vec<balances::Model>> {
        let mut ids: Vec<String> = balance_ids.iter().map(Uuid::to_string).collect();
        ids.sort();
        ids.dedup();

        let mut query = balances::Entity::find()
            .filter(balances::Column::Id.is_in(ids.clone()))
            .filter(balances::Column::Deleted.eq(false))
            .order_by_asc(balances::Column::Id);
        if db_tx.get_database_backend() != DbBackend::Sqlite {
            query = query.lock_exclusive();
        }
        let locked = query.all(db_tx).await?;

        if locked.len() != ids.len() {
            return Err(EngineError::KeyNotFound("balance not exists".to_string()));
        }
        Ok(locked)
    }

    /// Subtract `amount` if and only if the balance covers it.
    ///
    /// Returns the number of affected rows: zero means insufficient funds (or
    /// a concurrent spend got there first) and the unit must abort.
    pub(crate) async fn debit_if_sufficient(
        &self,
        db_tx: &DatabaseTransaction,
        balance_id: Uuid,
        amount: i64,
    ) -> ResultEngine<u64> {
        if amount <= 0 {
            return Err(EngineError::InvalidAmount(
                "debit amount must be > 0".to_string(),
            ));
        }
        let result = balances::Entity::update_many()
            .col_expr(
                balances::Column::Amount,
                Expr::col(balances::Column::Amount).sub(amount),
            )
            .filter(balances::Column::Id.eq(balance_id.to_string()))
            .filter(balances::Column::Amount.gte(amount))
            .filter(balances::Column::Deleted.eq(false))
            .exec(db_tx)
            .await?;
        Ok(result.rows_affected)
    }

    /// Add `amount` to a live balance.
    pub(crate) async fn credit(
        &self,
        db_tx: &DatabaseTransaction,
        balance_id: Uuid,
        amount: i64,
    ) -> ResultEngine<()> {
        if amount <= 0 {
            return Err(EngineError::InvalidAmount(
                "credit amount must be > 0".to_string(),
            ));
        }
        let result = balances::Entity::update_many()
            .col_expr(
                balances::Column::Amount,
                Expr::col(balances::Column::Amount).add(amount),
            )
            .filter(balances::Column::Id.eq(balance_id.to_string()))
            .filter(balances::Column::Deleted.eq(false))
            .exec(db_tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(format!("balance {balance_id}")));
        }
        Ok(())
    }

    /// Append one immutable history row.
    pub(crate) async fn append_entry(
        &self,
        db_tx: &DatabaseTransaction,
        entry: &LedgerEntry,
    ) -> ResultEngine<()> {
        balance_history::ActiveModel::from(entry).insert(db_tx).await?;
        Ok(())
    }
}
