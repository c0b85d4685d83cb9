//! Transfer notifications shown in user and global activity feeds.

use serde::{Deserialize, Serialize};

use crate::{MicroAmount, Timestamp};

/// Pseudo-party used as the sender of deposits and the recipient of withdrawals.
pub const SYSTEM_PARTY: &str = "system";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Transfer,
    Deposit,
    Withdraw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Processing,
    Confirmed,
    Completed,
}

impl NotificationStatus {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Processing => "Processing in Blaze Subnet",
            Self::Confirmed => "Confirmed in Blaze Subnet",
            Self::Completed => "Completed",
        }
    }
}

/// An activity entry. `from`/`to` are principal strings or [`SYSTEM_PARTY`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferNotification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub from: String,
    pub to: String,
    pub amount: MicroAmount,
    pub contract: String,
    pub timestamp: Timestamp,
    pub status: NotificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TransferNotification {
    pub fn is_read(&self) -> bool {
        self.read.unwrap_or(false)
    }

    /// Label from the point of view of a feed owner.
    pub fn type_description(&self, is_receiving: bool) -> &'static str {
        match (self.kind, is_receiving) {
            (NotificationType::Transfer, true) => "Received Transfer",
            (NotificationType::Transfer, false) => "Sent Transfer",
            (NotificationType::Deposit, _) => "Deposit to Blaze Subnet",
            (NotificationType::Withdraw, _) => "Withdraw from Blaze Subnet",
        }
    }
}
