//! Server-sent event streams.
//!
//! Both streams poll the shared store on the state's poll interval and so
//! see writes made by any instance.

use std::collections::{HashSet, VecDeque};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::time::{Interval, MissedTickBehavior};

use blaze_ledger::LedgerError;
use blaze_node::BlazeService;
use blaze_types::{MicroAmount, Principal, Timestamp, TransferNotification};

use crate::error::RpcError;
use crate::handlers::{required_principal, subnet_or_default};
use crate::server::RpcState;

/// Comment frames keep idle connections open through proxies.
const HEARTBEAT: Duration = Duration::from_secs(15);

/// Newest notifications fetched per poll.
const NOTIFICATION_POLL_PAGE: u32 = 50;

fn ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn to_event<T: Serialize>(payload: &T) -> Result<Event, Infallible> {
    Ok(Event::default().json_data(payload).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to encode stream event");
        Event::default().comment("encode error")
    }))
}

fn keep_alive() -> KeepAlive {
    KeepAlive::new().interval(HEARTBEAT).text("heartbeat")
}

// ── Balance stream ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BalanceStreamQuery {
    pub address: Option<String>,
    /// Subnet contract; the welsh subnet when absent.
    pub subnet: Option<String>,
}

/// One balance frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEvent {
    pub contract: Principal,
    pub address: Principal,
    pub balance: MicroAmount,
    pub timestamp: Timestamp,
}

struct BalanceWatch {
    service: Arc<BlazeService>,
    contract: Principal,
    address: Principal,
    last: Option<MicroAmount>,
    ticker: Interval,
}

impl BalanceWatch {
    /// Wait for the balance to differ from the last one sent. The first
    /// call returns the current balance.
    async fn next_change(&mut self) -> BalanceEvent {
        loop {
            self.ticker.tick().await;
            let ledger = self.service.ledger();
            match ledger.get_balance(&self.contract, &self.address).await {
                Ok(balance) if self.last != Some(balance) => {
                    self.last = Some(balance);
                    return BalanceEvent {
                        contract: self.contract.clone(),
                        address: self.address.clone(),
                        balance,
                        timestamp: self.service.now(),
                    };
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    address = %self.address,
                    error = %e,
                    "balance stream poll failed"
                ),
            }
        }
    }
}

pub async fn balance_stream(
    State(state): State<RpcState>,
    query: Result<Query<BalanceStreamQuery>, QueryRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, RpcError> {
    let Query(q) = query?;
    let address = required_principal("address", q.address.as_deref())?;
    let contract = subnet_or_default("subnet", q.subnet.as_deref())?;
    tracing::info!(%address, %contract, "balance stream opened");

    let watch = BalanceWatch {
        service: state.service.clone(),
        contract,
        address,
        last: None,
        ticker: ticker(state.poll_interval),
    };
    let events = stream::unfold(watch, |mut watch| async move {
        let update = watch.next_change().await;
        Some((to_event(&update), watch))
    });
    Ok(Sse::new(events).keep_alive(keep_alive()))
}

// ── Notification stream ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NotificationStreamQuery {
    pub address: Option<String>,
}

struct NotificationWatch {
    service: Arc<BlazeService>,
    address: String,
    /// Newest timestamp sent or skipped at open.
    seen_until: Timestamp,
    /// Ids already handled at `seen_until`; later writes can share that millisecond.
    seen_at_boundary: HashSet<String>,
    pending: VecDeque<TransferNotification>,
    ticker: Interval,
}

impl NotificationWatch {
    /// Start watching at the service clock's current time. Notifications
    /// already in the feed at that millisecond are skipped.
    async fn open(service: Arc<BlazeService>, address: String, ticker: Interval) -> Self {
        let mut watch = Self {
            seen_until: service.now(),
            seen_at_boundary: HashSet::new(),
            service,
            address,
            pending: VecDeque::new(),
            ticker,
        };
        match watch.poll().await {
            Ok(existing) => existing.iter().for_each(|n| watch.mark_seen(n)),
            Err(e) => tracing::warn!(
                address = %watch.address,
                error = %e,
                "notification stream could not read the feed at open"
            ),
        }
        watch
    }

    fn is_unseen(&self, n: &TransferNotification) -> bool {
        n.timestamp > self.seen_until
            || (n.timestamp == self.seen_until && !self.seen_at_boundary.contains(&n.id))
    }

    fn mark_seen(&mut self, n: &TransferNotification) {
        if n.timestamp > self.seen_until {
            self.seen_until = n.timestamp;
            self.seen_at_boundary.clear();
        }
        if n.timestamp == self.seen_until {
            self.seen_at_boundary.insert(n.id.clone());
        }
    }

    /// Unseen notifications, oldest first.
    async fn poll(&self) -> Result<Vec<TransferNotification>, LedgerError> {
        let newest_first = self
            .service
            .feed()
            .user_notifications(&self.address, NOTIFICATION_POLL_PAGE, 0)
            .await?;
        Ok(newest_first
            .into_iter()
            .filter(|n| self.is_unseen(n))
            .rev()
            .collect())
    }

    async fn next_notification(&mut self) -> TransferNotification {
        loop {
            if let Some(next) = self.pending.pop_front() {
                return next;
            }
            self.ticker.tick().await;
            match self.poll().await {
                Ok(fresh) => {
                    for n in &fresh {
                        self.mark_seen(n);
                    }
                    self.pending.extend(fresh);
                }
                Err(e) => tracing::warn!(
                    address = %self.address,
                    error = %e,
                    "notification stream poll failed"
                ),
            }
        }
    }
}

/// Stream notifications added to a user's feed after the stream opened.
pub async fn notification_stream(
    State(state): State<RpcState>,
    query: Result<Query<NotificationStreamQuery>, QueryRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, RpcError> {
    let Query(q) = query?;
    let address = q
        .address
        .filter(|a| !a.is_empty())
        .ok_or_else(|| RpcError::bad_request("Missing address parameter"))?;
    tracing::info!(%address, "notification stream opened");

    let watch =
        NotificationWatch::open(state.service.clone(), address, ticker(state.poll_interval)).await;
    let events = stream::unfold(watch, |mut watch| async move {
        let notification = watch.next_notification().await;
        Some((to_event(&notification), watch))
    });
    Ok(Sse::new(events).keep_alive(keep_alive()))
}
