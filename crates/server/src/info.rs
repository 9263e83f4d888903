//! `GET /api/info`

use api_types::info::{CoinHistory, InfoResponse, InventoryItem, Received, Sent};
use axum::{Json, extract::State};
use engine::UserInfo;

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
};

pub async fn get(
    AuthUser(principal): AuthUser,
    State(state): State<ServerState>,
) -> Result<Json<InfoResponse>, ServerError> {
    let info = state.engine.user_info(&principal).await?;
    Ok(Json(to_response(info)))
}

fn to_response(info: UserInfo) -> InfoResponse {
    InfoResponse {
        coins: info.coins,
        inventory: info
            .inventory
            .into_iter()
            .map(|entry| InventoryItem {
                item_type: entry.name,
                quantity: entry.count,
            })
            .collect(),
        coin_history: CoinHistory {
            received: info
                .coin_history
                .received
                .into_iter()
                .map(|r| Received {
                    from_user: r.from_user,
                    amount: r.amount,
                })
                .collect(),
            sent: info
                .coin_history
                .sent
                .into_iter()
                .map(|s| Sent {
                    to_user: s.to_user,
                    amount: s.amount,
                })
                .collect(),
        },
    }
}
