//! Request handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use blaze_node::{BalanceView, QueueStatus, SweepReport, TransferReceipt, WELSH_SUBNET};
use blaze_types::{BalanceAuditRecord, Principal, Timestamp, TransferNotification, TransferRequest};

use crate::error::RpcError;
use crate::pagination::Page;
use crate::server::RpcState;

const NO_CACHE: [(header::HeaderName, &str); 1] =
    [(header::CACHE_CONTROL, "no-cache, no-transform")];

/// Parse a required principal query parameter.
pub(crate) fn required_principal(name: &str, value: Option<&str>) -> Result<Principal, RpcError> {
    let raw = value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RpcError::bad_request(format!("Missing {name} parameter")))?;
    Principal::parse(raw).map_err(|e| RpcError::bad_request(format!("Invalid {name}: {e}")))
}

/// A subnet contract parameter, defaulting to the welsh subnet.
pub(crate) fn subnet_or_default(name: &str, value: Option<&str>) -> Result<Principal, RpcError> {
    required_principal(name, Some(value.unwrap_or(WELSH_SUBNET)))
}

// ── Transfers ───────────────────────────────────────────────────────────

pub async fn xfer(
    State(state): State<RpcState>,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<TransferReceipt>, RpcError> {
    let Json(request) = body?;
    Ok(Json(state.service.submit_transfer(request).await?))
}

// ── Balances ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub contract: Option<String>,
    pub address: Option<String>,
}

pub async fn balance(
    State(state): State<RpcState>,
    query: Result<Query<BalanceQuery>, QueryRejection>,
) -> Result<Json<BalanceView>, RpcError> {
    let Query(q) = query?;
    let contract = subnet_or_default("contract", q.contract.as_deref())?;
    let address = required_principal("address", q.address.as_deref())?;
    Ok(Json(state.service.balance(&contract, &address).await?))
}

#[derive(Debug, Deserialize)]
pub struct SinceQuery {
    /// Epoch milliseconds; records strictly after this are returned.
    pub since: Option<u64>,
}

pub async fn balance_updates(
    State(state): State<RpcState>,
    query: Result<Query<SinceQuery>, QueryRejection>,
) -> Result<Json<Vec<BalanceAuditRecord>>, RpcError> {
    let Query(q) = query?;
    let since = Timestamp::from_millis(q.since.unwrap_or(0));
    let records = state.service.ledger().balance_updates_since(since).await?;
    Ok(Json(records))
}

// ── Notifications ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    pub address: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn notifications(
    State(state): State<RpcState>,
    query: Result<Query<NotificationsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, RpcError> {
    let Query(q) = query?;
    let address = q
        .address
        .filter(|a| !a.is_empty())
        .ok_or_else(|| RpcError::bad_request("Missing address parameter"))?;
    let page = Page::new(q.limit, q.offset);
    let list = state
        .service
        .feed()
        .user_notifications(&address, page.limit, page.offset)
        .await?;
    Ok((NO_CACHE, Json(list)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationIdsBody {
    pub address: String,
    pub notification_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedChange {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<usize>,
}

fn ids_body(
    body: Result<Json<NotificationIdsBody>, JsonRejection>,
) -> Result<NotificationIdsBody, RpcError> {
    let Json(body) = body.map_err(|_| RpcError::bad_request("Invalid request body"))?;
    if body.address.is_empty() {
        return Err(RpcError::bad_request("Invalid request body"));
    }
    Ok(body)
}

pub async fn mark_read(
    State(state): State<RpcState>,
    body: Result<Json<NotificationIdsBody>, JsonRejection>,
) -> Result<Json<FeedChange>, RpcError> {
    let body = ids_body(body)?;
    let updated = state
        .service
        .feed()
        .mark_read(&body.address, &body.notification_ids)
        .await?;
    Ok(Json(FeedChange {
        success: true,
        updated: Some(updated),
        deleted: None,
    }))
}

pub async fn delete_notifications(
    State(state): State<RpcState>,
    body: Result<Json<NotificationIdsBody>, JsonRejection>,
) -> Result<Json<FeedChange>, RpcError> {
    let body = ids_body(body)?;
    let deleted = state
        .service
        .feed()
        .delete(&body.address, &body.notification_ids)
        .await?;
    Ok(Json(FeedChange {
        success: true,
        updated: None,
        deleted: Some(deleted),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn transfers(
    State(state): State<RpcState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Vec<TransferNotification>>, RpcError> {
    let Query(q) = query?;
    let page = Page::new(q.limit, q.offset);
    let list = state
        .service
        .feed()
        .global_transfers(page.limit, page.offset)
        .await?;
    Ok(Json(list))
}

// ── Queues ──────────────────────────────────────────────────────────────

pub async fn queues(State(state): State<RpcState>) -> Result<Json<Vec<QueueStatus>>, RpcError> {
    Ok(Json(state.service.queue_status().await?))
}

#[derive(Debug, Deserialize)]
pub struct ProcessQuery {
    /// Also drain short batches that meet the minimum batch size.
    #[serde(default)]
    pub flush: bool,
}

/// Run a sweep on demand. Callers must present the shared secret.
pub async fn process(
    State(state): State<RpcState>,
    headers: HeaderMap,
    query: Result<Query<ProcessQuery>, QueryRejection>,
) -> Result<Json<SweepReport>, RpcError> {
    if let Err(e) = state.authorize(&headers) {
        tracing::warn!("manual sweep refused: invalid authorization");
        return Err(e);
    }
    let Query(q) = query?;
    let report = if q.flush {
        state.service.flush_all_queues().await?
    } else {
        state.service.process_all_queues().await?
    };
    Ok(Json(report))
}

// ── Telemetry ───────────────────────────────────────────────────────────

pub async fn metrics(State(state): State<RpcState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.service.metrics().encode(),
    )
}

pub async fn health() -> &'static str {
    "ok"
}
