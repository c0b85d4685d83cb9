//! Batch-transfer contract calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use blaze_clarity::ClarityValue;
use blaze_types::{ContractName, StandardPrincipal, Transfer};
use serde::{Deserialize, Serialize};

use crate::tx::ContractCall;
use crate::{ChainClient, ChainError, SigningConfig};

/// Contract function that settles a batch of signed transfers.
pub const BATCH_TRANSFER_FUNCTION: &str = "batch-transfer";

/// Default fee for a batch-transfer call, in micro-STX.
pub const DEFAULT_FEE: u64 = 1800;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Failed,
}

/// The outcome of a broadcast. `status` reflects acceptance by the node, not
/// on-chain confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTransferResult {
    pub txid: Option<String>,
    pub status: BatchStatus,
}

/// One transfer as the `batch-transfer` tuple `{to, amount, nonce, signature}`.
pub fn transfer_to_clarity(transfer: &Transfer) -> Result<ClarityValue, ChainError> {
    Ok(ClarityValue::tuple([
        ("to", ClarityValue::principal(&transfer.to)),
        ("amount", ClarityValue::uint(transfer.amount.micro())),
        ("nonce", ClarityValue::uint(transfer.nonce)),
        ("signature", ClarityValue::buffer_from_hex(&transfer.signature)?),
    ])?)
}

/// Builds, signs and broadcasts `batch-transfer` calls with the service key.
///
/// The account nonce reported by the node lags behind transactions still in
/// the mempool, so the broadcaster never reuses a nonce it has already had
/// accepted.
pub struct ContractBroadcaster {
    chain: Arc<dyn ChainClient>,
    signing: Arc<SigningConfig>,
    fee: u64,
    /// One past the last nonce accepted by the node; 0 before the first broadcast.
    next_nonce: AtomicU64,
}

impl ContractBroadcaster {
    pub fn new(chain: Arc<dyn ChainClient>, signing: Arc<SigningConfig>, fee: u64) -> Self {
        Self {
            chain,
            signing,
            fee,
            next_nonce: AtomicU64::new(0),
        }
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Submit `operations` to `contract_address.contract_name` in one call.
    pub async fn execute_batch_transfer(
        &self,
        contract_address: &StandardPrincipal,
        contract_name: &ContractName,
        operations: &[Transfer],
    ) -> Result<BatchTransferResult, ChainError> {
        let ops = operations
            .iter()
            .map(transfer_to_clarity)
            .collect::<Result<Vec<_>, _>>()?;

        let sender = self.signing.principal();
        let chain_nonce = self.chain.account_nonce(&sender).await?;
        let nonce = chain_nonce.max(self.next_nonce.load(Ordering::Acquire));

        let call = ContractCall {
            network: self.signing.network,
            nonce,
            fee: self.fee,
            contract_address: *contract_address,
            contract_name: contract_name.clone(),
            function_name: BATCH_TRANSFER_FUNCTION.to_string(),
            args: vec![ClarityValue::list(ops)],
        };
        let tx = call.sign(&self.signing.private_key)?;
        let local_txid = tx.txid();

        tracing::info!(
            contract = %format!("{contract_address}.{contract_name}"),
            operations = operations.len(),
            nonce,
            fee = self.fee,
            txid = %local_txid,
            "broadcasting batch transfer"
        );

        let response = self.chain.broadcast(tx.to_bytes()).await?;
        if let Some(error) = response.error {
            tracing::warn!(%error, reason = ?response.reason, "batch transfer rejected");
            return Err(ChainError::BroadcastRejected {
                error,
                reason: response.reason,
            });
        }

        let status = if response.txid.is_some() {
            self.next_nonce.fetch_max(nonce + 1, Ordering::AcqRel);
            BatchStatus::Success
        } else {
            BatchStatus::Failed
        };
        Ok(BatchTransferResult {
            txid: response.txid,
            status,
        })
    }
}
