//! Off-chain balance ledger for the Blaze subnet.
//!
//! Balances and nonces per `(contract, address)`, with an audit trail of
//! every balance write, plus the global and per-user activity feeds.

pub mod balances;
pub mod error;
pub mod notifications;

pub use balances::BalanceLedger;
pub use error::LedgerError;
pub use notifications::{
    generate_notification_id, NotificationFeed, GLOBAL_TRANSFER_LIMIT, USER_NOTIFICATION_LIMIT,
};
