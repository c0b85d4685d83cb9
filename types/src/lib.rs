//! Fundamental types for the Blaze subnet service.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! principals, amounts, timestamps, network identifiers, key material, and the
//! transfer / balance / notification records persisted in the key-value store.

pub mod amount;
pub mod balance;
pub mod c32;
pub mod error;
pub mod keys;
pub mod network;
pub mod notification;
pub mod principal;
pub mod time;
pub mod transfer;

pub use amount::MicroAmount;
pub use balance::{BalanceAuditRecord, BalanceUpdate};
pub use error::ParseError;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use network::NetworkId;
pub use notification::{NotificationStatus, NotificationType, TransferNotification, SYSTEM_PARTY};
pub use principal::{ContractName, Principal, StandardPrincipal};
pub use time::{Clock, SystemClock, Timestamp};
pub use transfer::{Transfer, TransferRequest};
