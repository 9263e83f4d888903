//! Coin ledger: accounts, balances, purchases and transfers on top of
//! SeaORM.
//!
//! Every balance change happens inside one database transaction together with
//! its history rows. Entry point is [`Engine`].

pub use auth::{DEFAULT_TOKEN_TTL_HOURS, Principal, TokenSigner, validate_password_strength};
pub use balance_history::{LedgerEntry, SHOP_ACCOUNT};
pub use balances::STARTING_BALANCE;
pub use commands::{BuyItemCmd, SendCoinsCmd};
pub use error::{EngineError, ErrorKind};
pub use info::{CoinHistory, Received, Sent, UserInfo};
pub use inventory_items::InventoryEntry;
pub use merch::CatalogItem;
pub use ops::{Engine, EngineBuilder};

mod auth;
mod balance_history;
mod balances;
mod commands;
mod error;
mod info;
mod inventories;
mod inventory_items;
mod merch;
mod ops;
mod users;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
