//! `POST /api/sendCoin`

use api_types::coins::SendCoinRequest;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use engine::SendCoinsCmd;

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
};

pub async fn send(
    AuthUser(principal): AuthUser,
    State(state): State<ServerState>,
    payload: Result<Json<SendCoinRequest>, JsonRejection>,
) -> Result<StatusCode, ServerError> {
    let Json(payload) = payload.map_err(|err| ServerError::BadRequest(err.body_text()))?;

    let sender = principal.username.clone();
    state
        .engine
        .send_coins(SendCoinsCmd::new(
            principal,
            payload.to_user.as_str(),
            payload.amount,
        ))
        .await?;

    tracing::info!(%sender, recipient = %payload.to_user, amount = payload.amount, "coins sent");
    Ok(StatusCode::OK)
}
