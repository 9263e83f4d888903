//! `GET /api/buy/{item}`

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use engine::BuyItemCmd;

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
};

pub async fn buy(
    AuthUser(principal): AuthUser,
    State(state): State<ServerState>,
    Path(item): Path<String>,
) -> Result<StatusCode, ServerError> {
    let username = principal.username.clone();
    state
        .engine
        .buy_item(BuyItemCmd::new(principal, item.as_str()))
        .await?;

    tracing::info!(%username, %item, "item bought");
    Ok(StatusCode::OK)
}
