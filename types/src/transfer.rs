//! Signed transfer records.

use serde::{Deserialize, Serialize};

use crate::{MicroAmount, Principal};

/// A signed off-chain transfer as kept in a per-token queue.
///
/// The JSON form (`{to, amount, nonce, signature}`) is the queue's storage
/// format and the shape of one `batch-transfer` operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: Principal,
    pub amount: MicroAmount,
    pub nonce: u64,
    /// Hex-encoded structured-data signature, optionally `0x`-prefixed.
    pub signature: String,
}

/// A transfer submitted by a client for intake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub signature: String,
    pub from: Principal,
    /// The token contract the transfer moves.
    pub token: Principal,
    pub to: Principal,
    pub amount: MicroAmount,
    pub nonce: u64,
}

impl TransferRequest {
    /// The queue record for this request (drops `from` and `token`).
    pub fn to_transfer(&self) -> Transfer {
        Transfer {
            to: self.to.clone(),
            amount: self.amount,
            nonce: self.nonce,
            signature: self.signature.clone(),
        }
    }
}
