use api_types::error::ErrorResponse;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{EngineError, ErrorKind};

pub use server::{AuthUser, ServerState, router, run, run_with_listener, spawn_with_listener};

mod auth;
mod coins;
mod info;
mod server;
mod shop;

pub mod types {
    pub mod auth {
        pub use api_types::auth::{AuthRequest, AuthResponse};
    }

    pub mod info {
        pub use api_types::info::{CoinHistory, InfoResponse, InventoryItem, Received, Sent};
    }

    pub mod coins {
        pub use api_types::coins::SendCoinRequest;
    }

    pub mod error {
        pub use api_types::error::ErrorResponse;
    }
}

pub enum ServerError {
    Engine(EngineError),
    /// The request body could not be decoded.
    BadRequest(String),
    /// No `Authorization` header at all.
    MissingToken,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::WeakPassword(_) | EngineError::WrongPassword | EngineError::Unauthorized(_) => {
            StatusCode::UNAUTHORIZED
        }
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::RegistrationConflict(_) => StatusCode::CONFLICT,
        EngineError::Internal(_) | EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidCredentials(_)
        | EngineError::InvalidUsername(_)
        | EngineError::InvalidAmount(_)
        | EngineError::ItemNotFound(_)
        | EngineError::RecipientNotFound(_)
        | EngineError::InsufficientFunds(_)
        | EngineError::InvalidRecipient(_) => StatusCode::BAD_REQUEST,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err.kind() {
        ErrorKind::Internal => {
            tracing::error!(code = err.code(), "internal error: {err}");
            "internal server error".to_string()
        }
        _ => {
            tracing::debug!(code = err.code(), "request rejected: {err}");
            err.to_string()
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, errors, message) = match self {
            ServerError::Engine(err) => (
                status_for_engine_error(&err),
                err.code(),
                message_for_engine_error(err),
            ),
            ServerError::BadRequest(err) => {
                (StatusCode::BAD_REQUEST, "ERR_FAILED_TO_DECODE_REQ", err)
            }
            ServerError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "ERR_AUTH_HEADER_IS_MISSING",
                "authorization header is missing".to_string(),
            ),
        };

        let body = ErrorResponse {
            errors: errors.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
