//! The user-facing account snapshot.

use serde::{Deserialize, Serialize};

use crate::{InventoryEntry, LedgerEntry};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sent {
    pub to_user: String,
    pub amount: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Received {
    pub from_user: String,
    pub amount: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinHistory {
    pub received: Vec<Received>,
    pub sent: Vec<Sent>,
}

impl CoinHistory {
    /// Split a balance history into what `username` received and what it sent.
    ///
    /// Purchases show up as sent to the shop.
    pub fn partition(username: &str, entries: Vec<LedgerEntry>) -> Self {
        let mut history = Self::default();
        for entry in entries {
            if entry.is_received_by(username) {
                history.received.push(Received {
                    from_user: entry.sender,
                    amount: entry.amount,
                });
            } else {
                history.sent.push(Sent {
                    to_user: entry.recipient,
                    amount: entry.amount,
                });
            }
        }
        history
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub coins: i64,
    pub inventory: Vec<InventoryEntry>,
    pub coin_history: CoinHistory,
}
