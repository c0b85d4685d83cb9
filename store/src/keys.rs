//! Key layout in the shared key-value store.
//!
//! These names are shared with other services reading the same store and
//! must not change.

use blaze_types::Principal;

pub const QUEUE_PREFIX: &str = "blaze:transfer:queue:";
pub const BALANCE_UPDATES: &str = "blaze-balance-updates";
pub const GLOBAL_TRANSFERS: &str = "blaze:transfers";
pub const NOTIFICATIONS_PREFIX: &str = "blaze:notifications:";

/// `balance:<contract>:<address>`
pub fn balance(contract: &Principal, address: &Principal) -> String {
    format!("balance:{contract}:{address}")
}

/// `nonce:<contract>:<address>`
pub fn nonce(contract: &Principal, address: &Principal) -> String {
    format!("nonce:{contract}:{address}")
}

/// `blaze:transfer:queue:<token>`
pub fn queue(token: &Principal) -> String {
    format!("{QUEUE_PREFIX}{token}")
}

/// Glob matching every queue key.
pub fn queue_pattern() -> String {
    format!("{QUEUE_PREFIX}*")
}

/// `blaze:notifications:<address>`
pub fn notifications(address: &str) -> String {
    format!("{NOTIFICATIONS_PREFIX}{address}")
}
