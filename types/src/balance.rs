//! Balance updates and their audit trail.

use serde::{Deserialize, Serialize};

use crate::{MicroAmount, Principal, Timestamp};

/// A single absolute balance write: set `address` to `amount`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub address: Principal,
    pub amount: MicroAmount,
}

impl BalanceUpdate {
    pub fn new(address: Principal, amount: MicroAmount) -> Self {
        Self { address, amount }
    }
}

/// One entry in the balance-update audit sorted set.
///
/// The serialized record is the sorted-set member, so identical records
/// collapse into one entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAuditRecord {
    pub contract: Principal,
    pub address: Principal,
    pub balance: MicroAmount,
    pub timestamp: Timestamp,
}
