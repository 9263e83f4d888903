use std::time::Duration as StdDuration;

use chrono::Duration;
use rand::Rng;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, TransactionTrait,
};

use crate::{EngineError, ResultEngine, TokenSigner, auth::DEFAULT_TOKEN_TTL_HOURS};

mod catalog;
mod identity;
mod info;
mod ledger;
mod purchases;
mod transfers;

/// Attempts for an atomic unit that keeps hitting serialization conflicts.
pub(crate) const MAX_TX_ATTEMPTS: u32 = 3;

const RETRY_BASE_DELAY_MS: u64 = 20;
const RETRY_JITTER_MS: u64 = 20;

/// Sleep before re-running a unit: linear in the attempt, plus jitter so
/// colliding units do not collide again in lockstep.
pub(crate) async fn retry_backoff(attempt: u32) {
    let jitter = rand::thread_rng().gen_range(0..=RETRY_JITTER_MS);
    let delay = RETRY_BASE_DELAY_MS * u64::from(attempt) + jitter;
    tokio::time::sleep(StdDuration::from_millis(delay)).await;
}

/// Run an atomic unit inside a DB transaction.
///
/// Commits on success; rolls back on error, logging the triggering error.
/// Serialization conflicts, including failing to start the unit, re-run the
/// whole unit after a backoff, up to [`MAX_TX_ATTEMPTS`]. Dropping the
/// returned future mid-unit drops the transaction, which rolls back.
///
/// The body must evaluate to a `ResultEngine<T>` without using `?`, so every
/// error reaches the rollback path. In practice it is a single call to a
/// method taking `&db_tx`.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let mut attempt: u32 = 1;
        loop {
            let result: $crate::ResultEngine<_> = match $self.begin_unit().await {
                Ok($tx) => {
                    let result: $crate::ResultEngine<_> = $body;
                    match result {
                        Ok(value) => $tx
                            .commit()
                            .await
                            .map(|()| value)
                            .map_err($crate::EngineError::from),
                        Err(err) => {
                            tracing::warn!(code = err.code(), "rolling back atomic unit: {err}");
                            if let Err(rollback_err) = $tx.rollback().await {
                                tracing::error!("rollback failed: {rollback_err}");
                            }
                            Err(err)
                        }
                    }
                }
                Err(err) => Err(err),
            };
            match result {
                Err(err) if err.is_retryable() && attempt < $crate::ops::MAX_TX_ATTEMPTS => {
                    tracing::warn!(attempt, "serialization conflict, retrying atomic unit: {err}");
                    $crate::ops::retry_backoff(attempt).await;
                    attempt += 1;
                }
                other => break other,
            }
        }
    }};
}

pub(crate) use with_tx;

/// The coin ledger.
///
/// Holds no mutable state of its own: every balance lives in the database and
/// is only changed inside an atomic unit. Share it behind an `Arc`.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    tokens: TokenSigner,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Open the transaction of an atomic unit.
    ///
    /// SQLite only lets one writer in at a time, and a deferred transaction
    /// that reads first and writes later cannot wait for the write lock: it
    /// fails with `BUSY` as soon as another unit holds it. So on SQLite the
    /// first statement of every unit is a write, which takes the lock up
    /// front and queues behind other writers on the busy timeout instead.
    pub(crate) async fn begin_unit(&self) -> ResultEngine<DatabaseTransaction> {
        let db_tx = self.database.begin().await?;
        if db_tx.get_database_backend() == DbBackend::Sqlite {
            db_tx
                .execute_unprepared("UPDATE balances SET amount = amount WHERE 0")
                .await?;
        }
        Ok(db_tx)
    }

    /// The signer used for bearer tokens.
    pub fn tokens(&self) -> &TokenSigner {
        &self.tokens
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: Option<DatabaseConnection>,
    token_secret: Option<Vec<u8>>,
    token_ttl: Option<Duration>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = Some(db);
        self
    }

    /// Pass the required secret used to sign bearer tokens
    pub fn token_secret(mut self, secret: impl AsRef<[u8]>) -> EngineBuilder {
        self.token_secret = Some(secret.as_ref().to_vec());
        self
    }

    /// Override the token lifetime (24 hours by default)
    pub fn token_ttl(mut self, ttl: Duration) -> EngineBuilder {
        self.token_ttl = Some(ttl);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let database = self
            .database
            .ok_or_else(|| EngineError::Internal("database is required".to_string()))?;
        let secret = self
            .token_secret
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| EngineError::Internal("token secret is required".to_string()))?;
        let ttl = self
            .token_ttl
            .unwrap_or_else(|| Duration::hours(DEFAULT_TOKEN_TTL_HOURS));
        if ttl <= Duration::zero() {
            return Err(EngineError::Internal(
                "token ttl must be positive".to_string(),
            ));
        }

        Ok(Engine {
            database,
            tokens: TokenSigner::new(&secret, ttl),
        })
    }
}
