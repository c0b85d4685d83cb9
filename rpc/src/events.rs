//! Chainhook deliveries of on-chain subnet events.
//!
//! The subnet contract prints `deposit`, `withdraw` and `transfer` events.
//! Deposits credit and withdrawals debit the off-chain ledger. Transfer
//! events are settlements of transfers already applied at intake, so they
//! only get logged.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use blaze_node::BlazeService;
use blaze_types::{MicroAmount, Principal};

use crate::error::RpcError;
use crate::server::RpcState;

const CONTRACT_EVENT: &str = "SmartContractEvent";

// ── Payload ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChainhookPayload {
    pub apply: Vec<ChainhookBlock>,
}

#[derive(Debug, Deserialize)]
pub struct ChainhookBlock {
    #[serde(default)]
    pub transactions: Vec<ChainhookTransaction>,
}

#[derive(Debug, Deserialize)]
pub struct ChainhookTransaction {
    #[serde(default)]
    pub transaction_identifier: Option<TransactionIdentifier>,
    #[serde(default)]
    pub metadata: Option<TransactionMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionIdentifier {
    pub hash: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionMetadata {
    #[serde(default)]
    pub receipt: Option<TransactionReceipt>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionReceipt {
    #[serde(default)]
    pub events: Vec<ChainhookEvent>,
}

#[derive(Debug, Deserialize)]
pub struct ChainhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// The `data` of a contract print event.
#[derive(Debug, Deserialize)]
struct ContractEventData {
    contract_identifier: String,
    value: SubnetEvent,
}

#[derive(Debug, Deserialize)]
struct SubnetEvent {
    event: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    amount: Option<EventAmount>,
}

/// Amounts arrive as JSON numbers or, past 2^53, as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventAmount {
    Number(u64),
    Text(String),
}

impl SubnetEvent {
    fn user_and_amount(&self) -> Result<(Principal, MicroAmount), RpcError> {
        let user = self
            .user
            .as_deref()
            .ok_or_else(|| RpcError::bad_request("event is missing user"))?;
        let user = Principal::parse(user)
            .map_err(|e| RpcError::bad_request(format!("invalid event user: {e}")))?;
        let amount = match &self.amount {
            Some(EventAmount::Number(n)) => u128::from(*n),
            Some(EventAmount::Text(s)) => s
                .parse::<u128>()
                .map_err(|e| RpcError::bad_request(format!("invalid event amount: {e}")))?,
            None => return Err(RpcError::bad_request("event is missing amount")),
        };
        Ok((user, MicroAmount::new(amount)))
    }
}

// ── Handler ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsSummary {
    pub message: String,
    pub applied: usize,
    pub ignored: usize,
    pub failed: usize,
}

enum EventOutcome {
    Applied,
    Ignored,
}

pub async fn chainhook(
    State(state): State<RpcState>,
    headers: HeaderMap,
    body: Result<Json<ChainhookPayload>, JsonRejection>,
) -> Result<Json<EventsSummary>, RpcError> {
    if let Err(e) = state.authorize(&headers) {
        tracing::warn!("chainhook delivery refused: invalid authorization");
        return Err(e);
    }
    let Json(payload) = body.map_err(|e| {
        tracing::warn!(error = %e.body_text(), "invalid chainhook payload");
        RpcError::bad_request("Invalid payload structure")
    })?;

    let mut summary = EventsSummary {
        message: "Events processed successfully".into(),
        ..EventsSummary::default()
    };
    for block in payload.apply {
        for tx in block.transactions {
            let tx_id = tx.transaction_identifier.map(|t| t.hash);
            let events = tx
                .metadata
                .and_then(|m| m.receipt)
                .map(|r| r.events)
                .unwrap_or_default();
            for event in events.into_iter().filter(|e| e.kind == CONTRACT_EVENT) {
                match apply_event(&state.service, event.data, tx_id.clone()).await {
                    Ok(EventOutcome::Applied) => summary.applied += 1,
                    Ok(EventOutcome::Ignored) => summary.ignored += 1,
                    Err(e) => {
                        tracing::warn!(tx_id = ?tx_id, error = %e, "contract event not applied");
                        summary.failed += 1;
                    }
                }
            }
        }
    }

    tracing::info!(
        applied = summary.applied,
        ignored = summary.ignored,
        failed = summary.failed,
        "chainhook delivery processed"
    );
    Ok(Json(summary))
}

async fn apply_event(
    service: &BlazeService,
    data: serde_json::Value,
    tx_id: Option<String>,
) -> Result<EventOutcome, RpcError> {
    let data: ContractEventData = serde_json::from_value(data)
        .map_err(|e| RpcError::bad_request(format!("malformed contract event: {e}")))?;
    let contract = Principal::parse(&data.contract_identifier)
        .map_err(|e| RpcError::bad_request(format!("invalid contract identifier: {e}")))?;
    if service.registry().token_for(&contract).is_none() {
        return Ok(EventOutcome::Ignored);
    }

    match data.value.event.as_str() {
        "deposit" => {
            let (user, amount) = data.value.user_and_amount()?;
            service.record_deposit(&contract, &user, amount, tx_id).await?;
            Ok(EventOutcome::Applied)
        }
        "withdraw" => {
            let (user, amount) = data.value.user_and_amount()?;
            service.record_withdraw(&contract, &user, amount, tx_id).await?;
            Ok(EventOutcome::Applied)
        }
        "transfer" => {
            tracing::debug!(%contract, tx_id = ?tx_id, "transfer settled on chain");
            Ok(EventOutcome::Ignored)
        }
        other => {
            tracing::warn!(%contract, event = other, "unknown subnet event");
            Ok(EventOutcome::Ignored)
        }
    }
}
