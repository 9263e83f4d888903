//! The module contains the error the engine can throw.
//!
//! Every variant belongs to one [`ErrorKind`], which is what the outer layers
//! use to decide how loudly to report it. Each variant also carries a stable
//! machine-readable [`code`](EngineError::code) that is part of the wire
//! contract and must never change.
use sea_orm::{DbErr, RuntimeErr, SqlErr};
use thiserror::Error;

/// Broad classification of engine errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input.
    Validation,
    /// Bad credentials or a bad/expired token.
    Auth,
    /// Unknown item, recipient or row.
    NotFound,
    /// The request is well formed but conflicts with the current state.
    Conflict,
    /// Datastore or runtime failure.
    Internal,
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("Invalid username: {0}")]
    InvalidUsername(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Weak password: {0}")]
    WeakPassword(String),
    #[error("Wrong password")]
    WrongPassword,
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("\"{0}\" item not found!")]
    ItemNotFound(String),
    #[error("\"{0}\" recipient not found!")]
    RecipientNotFound(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
    #[error("Registration conflict for \"{0}\", retry")]
    RegistrationConflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials(_) | Self::InvalidUsername(_) | Self::InvalidAmount(_) => {
                ErrorKind::Validation
            }
            Self::WeakPassword(_) | Self::WrongPassword | Self::Unauthorized(_) => ErrorKind::Auth,
            Self::ItemNotFound(_) | Self::RecipientNotFound(_) | Self::KeyNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::InsufficientFunds(_)
            | Self::InvalidRecipient(_)
            | Self::RegistrationConflict(_) => ErrorKind::Conflict,
            Self::Internal(_) | Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Stable error code exposed to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials(_) => "ERR_INVALID_AUTH_REQ_PARAMS",
            Self::InvalidUsername(_) => "ERR_INVALID_USERNAME",
            Self::InvalidAmount(_) => "ERR_INVALID_SEND_COINS_REQ_PARAMS",
            Self::WeakPassword(_) => "ERR_WRONG_PASSWORD_FORMAT",
            Self::WrongPassword => "ERR_WRONG_PASSWORD",
            Self::Unauthorized(_) => "ERR_INVALID_AUTH_TOKEN",
            Self::ItemNotFound(_) => "ERR_ITEM_DOESNT_EXIST",
            Self::RecipientNotFound(_) => "ERR_INVALID_RECIPIENT",
            Self::KeyNotFound(_) => "ERR_NOT_FOUND",
            Self::InsufficientFunds(_) => "ERR_NOT_ENOUGH_COINS",
            Self::InvalidRecipient(_) => "ERR_INVALID_RECIPIENT_YOURSELF",
            Self::RegistrationConflict(_) => "ERR_REGISTRATION_CONFLICT",
            Self::Internal(_) | Self::Database(_) => "ERR_INTERNAL",
        }
    }

    /// True when the underlying insert hit a unique constraint.
    pub(crate) fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        )
    }

    /// True for serialization failures and lock timeouts, which are safe to
    /// retry as a whole atomic unit.
    pub(crate) fn is_retryable(&self) -> bool {
        let Self::Database(err) = self else {
            return false;
        };
        let runtime = match err {
            DbErr::Exec(runtime) | DbErr::Query(runtime) | DbErr::Conn(runtime) => runtime,
            _ => return false,
        };
        let RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db_err)) = runtime else {
            return false;
        };
        matches!(
            db_err.code().as_deref(),
            // Postgres serialization_failure / deadlock_detected,
            // SQLite BUSY / LOCKED / BUSY_SNAPSHOT.
            Some("40001" | "40P01" | "5" | "6" | "517")
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidCredentials(a), Self::InvalidCredentials(b)) => a == b,
            (Self::InvalidUsername(a), Self::InvalidUsername(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::WeakPassword(a), Self::WeakPassword(b)) => a == b,
            (Self::WrongPassword, Self::WrongPassword) => true,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::ItemNotFound(a), Self::ItemNotFound(b)) => a == b,
            (Self::RecipientNotFound(a), Self::RecipientNotFound(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::InvalidRecipient(a), Self::InvalidRecipient(b)) => a == b,
            (Self::RegistrationConflict(a), Self::RegistrationConflict(b)) => a == b,
            (Self::Internal(a), Self::Internal(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
