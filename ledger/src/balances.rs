//! Per-contract balances and nonces.

use std::sync::Arc;

use blaze_store::{keys, BatchMode, Command, KvStore, ScoreBound};
use blaze_types::{BalanceAuditRecord, BalanceUpdate, Clock, MicroAmount, Principal, Timestamp};

use crate::LedgerError;

/// The off-chain balance ledger.
///
/// Balances and nonces are integers in the shared store, absent meaning 0.
/// Every balance write through [`update_balances`](Self::update_balances)
/// also appends an audit record to the `blaze-balance-updates` sorted set.
pub struct BalanceLedger {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

fn parse_stored<T: std::str::FromStr>(key: &str, value: Option<String>) -> Result<T, LedgerError>
where
    T: Default,
{
    match value {
        None => Ok(T::default()),
        Some(raw) => raw.trim().parse().map_err(|_| LedgerError::Corrupt {
            key: key.to_string(),
            value: raw,
        }),
    }
}

impl BalanceLedger {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn get_balance(
        &self,
        contract: &Principal,
        address: &Principal,
    ) -> Result<MicroAmount, LedgerError> {
        let key = keys::balance(contract, address);
        let raw = self.store.get(&key).await?;
        parse_stored::<u128>(&key, raw).map(MicroAmount::new)
    }

    /// Overwrite a balance without an audit record.
    pub async fn set_balance(
        &self,
        contract: &Principal,
        address: &Principal,
        amount: MicroAmount,
    ) -> Result<(), LedgerError> {
        let key = keys::balance(contract, address);
        self.store.set(&key, &amount.micro().to_string()).await?;
        Ok(())
    }

    pub async fn get_nonce(
        &self,
        contract: &Principal,
        address: &Principal,
    ) -> Result<u64, LedgerError> {
        let key = keys::nonce(contract, address);
        let raw = self.store.get(&key).await?;
        parse_stored(&key, raw)
    }

    pub async fn set_nonce(
        &self,
        contract: &Principal,
        address: &Principal,
        nonce: u64,
    ) -> Result<(), LedgerError> {
        let key = keys::nonce(contract, address);
        self.store.set(&key, &nonce.to_string()).await?;
        Ok(())
    }

    /// Atomically increment the nonce and return the new value.
    pub async fn increment_nonce(
        &self,
        contract: &Principal,
        address: &Principal,
    ) -> Result<u64, LedgerError> {
        let key = keys::nonce(contract, address);
        let next = self.store.incr(&key).await?;
        u64::try_from(next).map_err(|_| LedgerError::Corrupt {
            key,
            value: next.to_string(),
        })
    }

    /// Write every balance in `updates` and its audit record in one transaction.
    ///
    /// All audit records of one call share a timestamp. The serialized record
    /// is the sorted-set member, so an identical retry does not duplicate it.
    pub async fn update_balances(
        &self,
        contract: &Principal,
        updates: &[BalanceUpdate],
    ) -> Result<Timestamp, LedgerError> {
        let timestamp = self.clock.now();
        if updates.is_empty() {
            return Ok(timestamp);
        }

        let mut commands = Vec::with_capacity(updates.len() * 2);
        for update in updates {
            commands.push(Command::Set {
                key: keys::balance(contract, &update.address),
                value: update.amount.micro().to_string(),
            });
        }
        for update in updates {
            let record = BalanceAuditRecord {
                contract: contract.clone(),
                address: update.address.clone(),
                balance: update.amount,
                timestamp,
            };
            commands.push(Command::ZAdd {
                key: keys::BALANCE_UPDATES.to_string(),
                score: timestamp.as_millis() as f64,
                member: serde_json::to_string(&record)?,
            });
        }

        self.store
            .execute_batch(commands, BatchMode::Transaction)
            .await?;
        tracing::debug!(%contract, updates = updates.len(), %timestamp, "balances updated");
        Ok(timestamp)
    }

    /// Add `amount` to a balance, returning the new balance.
    pub async fn credit(
        &self,
        contract: &Principal,
        address: &Principal,
        amount: MicroAmount,
    ) -> Result<MicroAmount, LedgerError> {
        let current = self.get_balance(contract, address).await?;
        let next = current
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(address.to_string()))?;
        self.update_balances(contract, &[BalanceUpdate::new(address.clone(), next)])
            .await?;
        Ok(next)
    }

    /// Subtract `amount` from a balance, returning the new balance.
    pub async fn debit(
        &self,
        contract: &Principal,
        address: &Principal,
        amount: MicroAmount,
    ) -> Result<MicroAmount, LedgerError> {
        let current = self.get_balance(contract, address).await?;
        let next = current
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                address: address.to_string(),
                balance: current.to_string(),
                amount: amount.to_string(),
            })?;
        self.update_balances(contract, &[BalanceUpdate::new(address.clone(), next)])
            .await?;
        Ok(next)
    }

    /// Audit records written strictly after `after`, oldest first.
    ///
    /// Members that do not parse as audit records are skipped.
    pub async fn balance_updates_since(
        &self,
        after: Timestamp,
    ) -> Result<Vec<BalanceAuditRecord>, LedgerError> {
        let members = self
            .store
            .zrangebyscore(
                keys::BALANCE_UPDATES,
                ScoreBound::Exclusive(after.as_millis() as f64),
                ScoreBound::PosInf,
            )
            .await?;
        Ok(members
            .iter()
            .filter_map(|m| match serde_json::from_str(m) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed balance audit record");
                    None
                }
            })
            .collect())
    }
}
