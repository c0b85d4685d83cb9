//! The chain node interface.

use async_trait::async_trait;
use blaze_clarity::ClarityValue;
use blaze_types::Principal;
use serde::{Deserialize, Serialize};

use crate::ChainError;

/// What a node says about a broadcast transaction.
///
/// A node either accepts the transaction and echoes its txid, or rejects it
/// with an `error` (and usually a `reason`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl BroadcastResponse {
    pub fn accepted(txid: impl Into<String>) -> Self {
        Self {
            txid: Some(txid.into()),
            ..Default::default()
        }
    }

    pub fn rejected(error: impl Into<String>, reason: Option<String>) -> Self {
        Self {
            error: Some(error.into()),
            reason,
            ..Default::default()
        }
    }
}

/// Access to a chain node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Evaluate a read-only contract function and return its result value.
    async fn call_read_only(
        &self,
        contract: &Principal,
        function: &str,
        sender: &Principal,
        args: Vec<ClarityValue>,
    ) -> Result<ClarityValue, ChainError>;

    /// The next transaction nonce for `principal`.
    async fn account_nonce(&self, principal: &Principal) -> Result<u64, ChainError>;

    /// Submit a serialized transaction.
    async fn broadcast(&self, tx: Vec<u8>) -> Result<BroadcastResponse, ChainError>;
}
