//! Activity feeds: the global transfer history and per-user notifications.

use std::sync::Arc;

use blaze_store::{keys, BatchMode, Command, KvStore};
use blaze_types::{
    Clock, MicroAmount, NotificationStatus, NotificationType, Principal, Timestamp,
    TransferNotification, SYSTEM_PARTY,
};

use crate::LedgerError;

/// Entries kept in the global transfer history.
pub const GLOBAL_TRANSFER_LIMIT: i64 = 100;

/// Entries kept per user.
pub const USER_NOTIFICATION_LIMIT: i64 = 50;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `<millis>-<9 random base36 chars>`.
pub fn generate_notification_id(now: Timestamp) -> String {
    let mut bytes = [0u8; 9];
    if getrandom::getrandom(&mut bytes).is_err() {
        // no OS randomness: derive from the clock
        bytes = (now.as_millis() as u128 * 0x9e37_79b9_7f4a_7c15).to_le_bytes()[..9]
            .try_into()
            .unwrap_or([0u8; 9]);
    }
    let suffix: String = bytes
        .iter()
        .map(|b| ID_ALPHABET[*b as usize % ID_ALPHABET.len()] as char)
        .collect();
    format!("{}-{}", now.as_millis(), suffix)
}

/// Writes and reads transfer notifications.
pub struct NotificationFeed {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

/// Owners whose feed receives a notification: both parties, minus the
/// system pseudo-party, deduplicated.
fn feed_owners(notification: &TransferNotification) -> Vec<&str> {
    let mut owners = Vec::with_capacity(2);
    for party in [notification.from.as_str(), notification.to.as_str()] {
        if party != SYSTEM_PARTY && !party.is_empty() && !owners.contains(&party) {
            owners.push(party);
        }
    }
    owners
}

fn parse_all(members: Vec<String>) -> Vec<TransferNotification> {
    let mut parsed: Vec<TransferNotification> = members
        .iter()
        .filter_map(|m| match serde_json::from_str(m) {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed notification");
                None
            }
        })
        .collect();
    parsed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    parsed
}

impl NotificationFeed {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Append to the global feed and each party's feed, then prune.
    pub async fn add(&self, notification: &TransferNotification) -> Result<(), LedgerError> {
        let member = serde_json::to_string(notification)?;
        let score = notification.timestamp.as_millis() as f64;
        let owners = feed_owners(notification);

        let mut commands = vec![Command::ZAdd {
            key: keys::GLOBAL_TRANSFERS.to_string(),
            score,
            member: member.clone(),
        }];
        for owner in &owners {
            commands.push(Command::ZAdd {
                key: keys::notifications(owner),
                score,
                member: member.clone(),
            });
        }
        commands.push(Command::ZRemRangeByRank {
            key: keys::GLOBAL_TRANSFERS.to_string(),
            start: 0,
            stop: -(GLOBAL_TRANSFER_LIMIT + 1),
        });
        for owner in &owners {
            commands.push(Command::ZRemRangeByRank {
                key: keys::notifications(owner),
                start: 0,
                stop: -(USER_NOTIFICATION_LIMIT + 1),
            });
        }

        self.store
            .execute_batch(commands, BatchMode::Pipeline)
            .await?;
        tracing::debug!(
            id = %notification.id,
            kind = ?notification.kind,
            from = %notification.from,
            to = %notification.to,
            "notification added"
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        kind: NotificationType,
        from: String,
        to: String,
        amount: MicroAmount,
        contract: &Principal,
        status: NotificationStatus,
        tx_id: Option<String>,
        description: Option<String>,
    ) -> TransferNotification {
        let now = self.clock.now();
        TransferNotification {
            id: generate_notification_id(now),
            kind,
            from,
            to,
            amount,
            contract: contract.to_string(),
            timestamp: now,
            status,
            tx_id,
            read: None,
            description,
        }
    }

    /// Record an off-chain transfer accepted into the subnet.
    pub async fn record_transfer(
        &self,
        contract: &Principal,
        from: &Principal,
        to: &Principal,
        amount: MicroAmount,
    ) -> Result<TransferNotification, LedgerError> {
        let notification = self.build(
            NotificationType::Transfer,
            from.to_string(),
            to.to_string(),
            amount,
            contract,
            NotificationStatus::Processing,
            None,
            None,
        );
        self.add(&notification).await?;
        Ok(notification)
    }

    /// Record a deposit; `completed` when the on-chain txid is known.
    pub async fn record_deposit(
        &self,
        contract: &Principal,
        address: &Principal,
        amount: MicroAmount,
        tx_id: Option<String>,
    ) -> Result<TransferNotification, LedgerError> {
        let notification = self.build(
            NotificationType::Deposit,
            SYSTEM_PARTY.to_string(),
            address.to_string(),
            amount,
            contract,
            status_for(&tx_id),
            tx_id,
            Some("Deposit to Blaze Subnet".into()),
        );
        self.add(&notification).await?;
        Ok(notification)
    }

    /// Record a withdrawal; `completed` when the on-chain txid is known.
    pub async fn record_withdraw(
        &self,
        contract: &Principal,
        address: &Principal,
        amount: MicroAmount,
        tx_id: Option<String>,
    ) -> Result<TransferNotification, LedgerError> {
        let notification = self.build(
            NotificationType::Withdraw,
            address.to_string(),
            SYSTEM_PARTY.to_string(),
            amount,
            contract,
            status_for(&tx_id),
            tx_id,
            Some("Withdraw from Blaze Subnet".into()),
        );
        self.add(&notification).await?;
        Ok(notification)
    }

    async fn page(
        &self,
        key: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<TransferNotification>, LedgerError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let start = i64::from(offset);
        let stop = start + i64::from(limit) - 1;
        let members = self.store.zrevrange(key, start, stop).await?;
        Ok(parse_all(members))
    }

    /// A user's notifications, newest first.
    pub async fn user_notifications(
        &self,
        address: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<TransferNotification>, LedgerError> {
        self.page(&keys::notifications(address), limit, offset).await
    }

    /// The global transfer history, newest first.
    pub async fn global_transfers(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<TransferNotification>, LedgerError> {
        self.page(keys::GLOBAL_TRANSFERS, limit, offset).await
    }

    /// Mark notifications read. Returns how many changed.
    pub async fn mark_read(&self, address: &str, ids: &[String]) -> Result<usize, LedgerError> {
        let key = keys::notifications(address);
        let current = self.store.zrevrange(&key, 0, -1).await?;

        let mut commands = Vec::new();
        for raw in current {
            let Ok(mut notification) = serde_json::from_str::<TransferNotification>(&raw) else {
                continue;
            };
            if notification.is_read() || !ids.contains(&notification.id) {
                continue;
            }
            notification.read = Some(true);
            commands.push(Command::ZRem {
                key: key.clone(),
                members: vec![raw],
            });
            commands.push(Command::ZAdd {
                key: key.clone(),
                score: notification.timestamp.as_millis() as f64,
                member: serde_json::to_string(&notification)?,
            });
        }

        let changed = commands.len() / 2;
        if changed > 0 {
            self.store
                .execute_batch(commands, BatchMode::Transaction)
                .await?;
        }
        Ok(changed)
    }

    /// Remove notifications from a user's feed. Returns how many were removed.
    pub async fn delete(&self, address: &str, ids: &[String]) -> Result<usize, LedgerError> {
        let key = keys::notifications(address);
        let current = self.store.zrevrange(&key, 0, -1).await?;

        let doomed: Vec<String> = current
            .into_iter()
            .filter(|raw| {
                serde_json::from_str::<TransferNotification>(raw)
                    .map(|n| ids.contains(&n.id))
                    .unwrap_or(false)
            })
            .collect();

        let removed = doomed.len();
        if removed > 0 {
            self.store
                .execute(Command::ZRem {
                    key,
                    members: doomed,
                })
                .await?;
        }
        Ok(removed)
    }
}

fn status_for(tx_id: &Option<String>) -> NotificationStatus {
    if tx_id.is_some() {
        NotificationStatus::Completed
    } else {
        NotificationStatus::Processing
    }
}
