//! JSON bodies of the HTTP API.
//!
//! Field names follow the public wire format (camelCase), not Rust naming.

use serde::{Deserialize, Serialize};

pub mod auth {
    use super::*;

    /// Credentials for `POST /api/auth`.
    ///
    /// An unknown username registers a new account.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AuthRequest {
        pub username: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AuthResponse {
        pub token: String,
    }
}

pub mod info {
    use super::*;

    #[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct InfoResponse {
        pub coins: i64,
        pub inventory: Vec<InventoryItem>,
        pub coin_history: CoinHistory,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct InventoryItem {
        #[serde(rename = "type")]
        pub item_type: String,
        pub quantity: i64,
    }

    #[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CoinHistory {
        pub received: Vec<Received>,
        pub sent: Vec<Sent>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Received {
        pub from_user: String,
        pub amount: i64,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Sent {
        pub to_user: String,
        pub amount: i64,
    }
}

pub mod coins {
    use super::*;

    /// Body of `POST /api/sendCoin`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SendCoinRequest {
        pub to_user: String,
        pub amount: i64,
    }
}

pub mod error {
    use super::*;

    /// Body of every non-2xx response. `errors` holds a stable code.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorResponse {
        pub errors: String,
        pub message: String,
    }
}
