//! Identity Manager: login, first-login registration, token verification.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    EngineError, Principal, ResultEngine,
    auth::{hash_password, validate_password_strength, verify_password},
    balances::{self, STARTING_BALANCE},
    inventories, users,
    util::{normalize_new_username, normalize_username},
};

use super::{Engine, with_tx};

impl Engine {
    /// Log in, registering the user on first contact, and return a bearer
    /// token.
    ///
    /// New users must pass the password policy and start with
    /// [`STARTING_BALANCE`] coins and an empty inventory. Registering the same
    /// username twice, even concurrently, yields one account: the loser of
    /// the race logs in against the winner's row.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<String> {
        let username = normalize_username(username)?;
        if password.is_empty() {
            return Err(EngineError::InvalidCredentials(
                "password must not be empty".to_string(),
            ));
        }

        let principal = match self.find_user_by_username(&self.database, &username).await? {
            Some(user) => self.login(&user, password).await?,
            None => self.register_or_login(&username, password).await?,
        };
        self.tokens.issue(&principal)
    }

    /// Validate a bearer token and return the principal it was issued to.
    pub fn verify_token(&self, token: &str) -> ResultEngine<Principal> {
        self.tokens.verify(token)
    }

    async fn login(&self, user: &users::Model, password: &str) -> ResultEngine<Principal> {
        verify_password(password, &user.password_hash).await?;
        Principal::try_from(user)
    }

    pub(crate) async fn register_or_login(
        &self,
        username: &str,
        password: &str,
    ) -> ResultEngine<Principal> {
        let username = normalize_new_username(username)?;
        validate_password_strength(password)?;
        let password_hash = hash_password(password).await?;

        match self.create_account(&username, password_hash).await {
            Ok(principal) => {
                tracing::info!(username = %principal.username, "registered new user");
                Ok(principal)
            }
            Err(err) if err.is_unique_violation() => {
                tracing::info!(%username, "lost registration race, logging in instead");
                let user = self
                    .find_user_by_username(&self.database, &username)
                    .await?
                    .ok_or_else(|| EngineError::RegistrationConflict(username.clone()))?;
                self.login(&user, password).await
            }
            Err(err) => Err(err),
        }
    }

    /// Create balance, user and inventory as one atomic unit.
    async fn create_account(&self, username: &str, password_hash: String) -> ResultEngine<Principal> {
        with_tx!(self, |db_tx| {
            self.insert_account(&db_tx, username, password_hash.clone())
                .await
        })
    }

    async fn insert_account(
        &self,
        db_tx: &DatabaseTransaction,
        username: &str,
        password_hash: String,
    ) -> ResultEngine<Principal> {
        let balance_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        balances::ActiveModel::opening(balance_id, STARTING_BALANCE)
            .insert(db_tx)
            .await?;
        let user = users::ActiveModel::registered(user_id, username, password_hash, balance_id)
            .insert(db_tx)
            .await?;
        inventories::ActiveModel::empty_for(user_id)
            .insert(db_tx)
            .await?;

        Principal::try_from(&user)
    }

    pub(crate) async fn find_user_by_username<C: ConnectionTrait>(
        &self,
        db: &C,
        username: &str,
    ) -> ResultEngine<Option<users::Model>> {
        Ok(users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .filter(users::Column::Deleted.eq(false))
            .one(db)
            .await?)
    }

    pub(crate) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .filter(users::Column::Deleted.eq(false))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {user_id}")))
    }

    pub(crate) async fn require_inventory<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
    ) -> ResultEngine<inventories::Model> {
        inventories::Entity::find()
            .filter(inventories::Column::UserId.eq(user_id.to_string()))
            .filter(inventories::Column::Deleted.eq(false))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("inventory of user {user_id}")))
    }
}
