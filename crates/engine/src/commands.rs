//! Command structs for engine write operations.
//!
//! Every command carries the acting [`Principal`] explicitly; the engine never
//! reads identity from ambient state.

use crate::Principal;

/// Move coins from the acting user to another user.
#[derive(Clone, Debug)]
pub struct SendCoinsCmd {
    pub sender: Principal,
    pub recipient: String,
    pub amount: i64,
}

impl SendCoinsCmd {
    #[must_use]
    pub fn new(sender: Principal, recipient: impl Into<String>, amount: i64) -> Self {
        Self {
            sender,
            recipient: recipient.into(),
            amount,
        }
    }
}

/// Buy one unit of a catalog item for the acting user.
#[derive(Clone, Debug)]
pub struct BuyItemCmd {
    pub buyer: Principal,
    pub item: String,
}

impl BuyItemCmd {
    #[must_use]
    pub fn new(buyer: Principal, item: impl Into<String>) -> Self {
        Self {
            buyer,
            item: item.into(),
        }
    }
}
