//! `POST /api/auth`: login, registering unknown users.

use api_types::auth::{AuthRequest, AuthResponse};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{ServerError, server::ServerState};

pub async fn authenticate(
    State(state): State<ServerState>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ServerError> {
    let Json(payload) = payload.map_err(|err| ServerError::BadRequest(err.body_text()))?;

    let token = state
        .engine
        .authenticate(&payload.username, &payload.password)
        .await?;

    Ok(Json(AuthResponse { token }))
}
