//! The Blaze service: transfer intake and queue draining.
//!
//! Intake moves balances off-chain immediately and queues the signed
//! transfer. Draining settles queued transfers on chain in `batch-transfer`
//! calls, either inline on intake (`auto_process`) or through
//! [`BlazeService::process_all_queues`].

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use blaze_chain::{
    BatchTransferResult, ChainClient, ContractBroadcaster, HttpChainClient, SignatureHelper,
    SigningConfig,
};
use blaze_ledger::{BalanceLedger, LedgerError, NotificationFeed};
use blaze_queue::TransferQueue;
use blaze_store::KvStore;
use blaze_store_rest::RestKvStore;
use blaze_types::{
    BalanceUpdate, Clock, MicroAmount, Principal, SystemClock, Timestamp, TransferNotification,
    TransferRequest,
};

use crate::locks::KeyedLocks;
use crate::{NodeConfig, NodeError, ServiceMetrics, TokenRegistry};

/// Balances after an accepted transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptBalances {
    pub from: MicroAmount,
    pub to: MicroAmount,
}

/// The intake response for an accepted transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub success: bool,
    pub queued: bool,
    /// Queue length right after this transfer was appended.
    pub queue_length: u64,
    pub contract: Principal,
    pub token: Principal,
    /// The sender's nonce after this transfer, which is the request's.
    pub nonce: u64,
    pub balances: ReceiptBalances,
}

/// A balance and nonce as served to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceView {
    pub contract: Principal,
    pub address: Principal,
    pub balance: MicroAmount,
    pub nonce: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub token: Principal,
    pub contract: Principal,
    pub length: u64,
    pub batch_size: usize,
    pub ready: bool,
}

/// One drained batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedBatch {
    pub token: Principal,
    pub transfers: usize,
    #[serde(flatten)]
    pub result: BatchTransferResult,
}

/// A queue that could not be drained.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedQueue {
    /// The queue key, which may not name a served token.
    pub queue: String,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub processed: Vec<ProcessedBatch>,
    pub failed: Vec<FailedQueue>,
}

/// Which queues a sweep drains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SweepMode {
    /// Only queues holding a full batch.
    Ready,
    /// Every queue holding at least the minimum batch.
    Flush,
}

pub struct BlazeService {
    registry: TokenRegistry,
    ledger: BalanceLedger,
    feed: NotificationFeed,
    queue: TransferQueue,
    signer: SignatureHelper,
    broadcaster: ContractBroadcaster,
    metrics: Arc<ServiceMetrics>,
    clock: Arc<dyn Clock>,
    auto_process: bool,
    contract_locks: KeyedLocks,
    drain_locks: KeyedLocks,
}

impl BlazeService {
    pub fn new(
        config: &NodeConfig,
        signing: Arc<SigningConfig>,
        store: Arc<dyn KvStore>,
        chain: Arc<dyn ChainClient>,
        clock: Arc<dyn Clock>,
        metrics: Arc<ServiceMetrics>,
    ) -> Result<Self, NodeError> {
        let registry = TokenRegistry::from_config(&config.tokens)?;
        let queue = TransferQueue::new(store.clone(), registry.queue_config(config));
        Ok(Self {
            ledger: BalanceLedger::new(store.clone(), clock.clone()),
            feed: NotificationFeed::new(store, clock.clone()),
            queue,
            signer: SignatureHelper::new(signing.clone(), chain.clone()),
            broadcaster: ContractBroadcaster::new(chain, signing, config.fee),
            registry,
            metrics,
            clock,
            auto_process: config.auto_process,
            contract_locks: KeyedLocks::new(),
            drain_locks: KeyedLocks::new(),
        })
    }

    /// Wire the service to the REST key-value store and the Stacks node API.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        if config.kv_url.is_empty() {
            return Err(NodeError::Config("kv_url is not set".into()));
        }
        let signing = Arc::new(config.signing_config()?);
        let store: Arc<dyn KvStore> =
            Arc::new(RestKvStore::new(config.kv_url.clone(), config.kv_token.clone()));
        let chain: Arc<dyn ChainClient> = Arc::new(HttpChainClient::new(
            config.stacks_api_url(),
            config.stacks_api_key.clone(),
        ));
        tracing::info!(
            network = config.network.as_str(),
            kv = %config.kv_url,
            stacks = %config.stacks_api_url(),
            signer = %signing.principal(),
            tokens = config.tokens.len(),
            "blaze service configured"
        );
        Self::new(
            config,
            signing,
            store,
            chain,
            Arc::new(SystemClock),
            Arc::new(ServiceMetrics::new()),
        )
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &BalanceLedger {
        &self.ledger
    }

    pub fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    pub fn queue(&self) -> &TransferQueue {
        &self.queue
    }

    pub fn signer(&self) -> &SignatureHelper {
        &self.signer
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    /// The service clock's current time.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ── Intake ─────────────────────────────────────────────────────────

    /// Verify, settle off-chain and queue a client transfer.
    pub async fn submit_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<TransferReceipt, NodeError> {
        let started = Instant::now();
        let result = self.intake(&request).await;
        self.metrics
            .intake_latency_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);

        match &result {
            Ok(receipt) => {
                self.metrics.transfers_accepted.inc();
                tracing::info!(
                    token = %receipt.token,
                    from = %request.from,
                    to = %request.to,
                    amount = %request.amount,
                    nonce = receipt.nonce,
                    queue_length = receipt.queue_length,
                    "transfer accepted"
                );
            }
            Err(e) if e.is_client_error() => {
                self.metrics.transfers_rejected.inc();
                tracing::warn!(
                    token = %request.token,
                    from = %request.from,
                    to = %request.to,
                    nonce = request.nonce,
                    error = %e,
                    "transfer rejected"
                );
            }
            Err(e) => {
                tracing::error!(token = %request.token, from = %request.from, error = %e, "transfer failed");
            }
        }
        result
    }

    async fn intake(&self, request: &TransferRequest) -> Result<TransferReceipt, NodeError> {
        let token = &request.token;
        let contract = self.registry.contract_for(token)?.clone();

        if request.from == request.to {
            return Err(NodeError::SelfTransfer);
        }

        let valid = self
            .signer
            .verify_signature(
                &contract,
                &request.signature,
                &request.from,
                &request.to,
                request.amount,
                request.nonce,
            )
            .await?;
        if !valid {
            return Err(NodeError::InvalidSignature);
        }
        tracing::debug!(%contract, from = %request.from, nonce = request.nonce, "signature verified");

        let _guard = self.contract_locks.lock(&contract).await;

        let stored_nonce = self.ledger.get_nonce(&contract, &request.from).await?;
        if request.nonce <= stored_nonce {
            return Err(NodeError::StaleNonce {
                stored: stored_nonce,
                got: request.nonce,
            });
        }

        let from_balance = self.ledger.get_balance(&contract, &request.from).await?;
        let to_balance = self.ledger.get_balance(&contract, &request.to).await?;
        let from_after = from_balance
            .checked_sub(request.amount)
            .ok_or(NodeError::InsufficientBalance)?;
        let to_after = to_balance
            .checked_add(request.amount)
            .ok_or_else(|| LedgerError::Overflow(request.to.to_string()))?;

        self.ledger
            .update_balances(
                &contract,
                &[
                    BalanceUpdate::new(request.from.clone(), from_after),
                    BalanceUpdate::new(request.to.clone(), to_after),
                ],
            )
            .await?;
        self.ledger
            .set_nonce(&contract, &request.from, request.nonce)
            .await?;

        let queue_length = self.queue.enqueue(token, &request.to_transfer()).await?;
        self.metrics.set_queue_length(&token.to_string(), queue_length);

        if self.auto_process && queue_length >= self.queue.batch_size(token) as u64 {
            // the transfer is settled off-chain and queued; a failed drain is retried by the next sweep
            if let Err(e) = self.process_batch(token).await {
                tracing::warn!(%token, error = %e, "inline batch processing failed");
            }
        }

        let from_balance = self.ledger.get_balance(&contract, &request.from).await?;
        let to_balance = self.ledger.get_balance(&contract, &request.to).await?;

        if let Err(e) = self
            .feed
            .record_transfer(&contract, &request.from, &request.to, request.amount)
            .await
        {
            tracing::warn!(%contract, error = %e, "failed to record transfer notification");
        }

        Ok(TransferReceipt {
            success: true,
            queued: true,
            queue_length,
            contract,
            token: token.clone(),
            nonce: request.nonce,
            balances: ReceiptBalances {
                from: from_balance,
                to: to_balance,
            },
        })
    }

    // ── Draining ───────────────────────────────────────────────────────

    /// Broadcast the oldest batch of `token`'s queue and drop it on success.
    ///
    /// Returns `None` for an empty queue. On error the queue is untouched.
    pub async fn process_batch(
        &self,
        token: &Principal,
    ) -> Result<Option<ProcessedBatch>, NodeError> {
        let contract = self.registry.contract_for(token)?;
        let Principal::Contract { issuer, name } = contract else {
            return Err(NodeError::Config(format!("{contract} is not a contract")));
        };

        let _guard = self.drain_locks.lock(token).await;

        let batch = self.queue.peek_batch(token).await?;
        if batch.is_empty() {
            tracing::debug!(%token, "no transfers to process");
            return Ok(None);
        }

        let result = match self
            .broadcaster
            .execute_batch_transfer(issuer, name, &batch)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.metrics.batches_failed.inc();
                tracing::error!(%token, %contract, transfers = batch.len(), error = %e, "batch transfer failed");
                return Err(e.into());
            }
        };

        self.queue.remove_first(token, batch.len()).await?;
        let remaining = self.queue.queue_length(token).await?;
        self.metrics.set_queue_length(&token.to_string(), remaining);
        self.metrics.batches_broadcast.inc();
        self.metrics.transfers_broadcast.inc_by(batch.len() as u64);

        tracing::info!(
            %token,
            %contract,
            transfers = batch.len(),
            txid = ?result.txid,
            status = ?result.status,
            remaining,
            "batch transfer broadcast"
        );
        Ok(Some(ProcessedBatch {
            token: token.clone(),
            transfers: batch.len(),
            result,
        }))
    }

    /// Drain one batch from every queue holding a full batch.
    ///
    /// Per-queue failures are reported and do not stop the sweep.
    pub async fn process_all_queues(&self) -> Result<SweepReport, NodeError> {
        self.sweep(SweepMode::Ready).await
    }

    /// Drain one batch from every queue holding at least the minimum batch,
    /// even when the batch is short.
    pub async fn flush_all_queues(&self) -> Result<SweepReport, NodeError> {
        self.sweep(SweepMode::Flush).await
    }

    async fn sweep(&self, mode: SweepMode) -> Result<SweepReport, NodeError> {
        let mut report = SweepReport::default();
        let mut keys = self.queue.all_queue_keys().await?;
        keys.sort();

        for key in keys {
            let Some(token) = TransferQueue::token_from_queue_key(&key) else {
                report.failed.push(FailedQueue {
                    queue: key,
                    error: "malformed queue key".into(),
                });
                continue;
            };
            match self.sweep_one(&token, mode).await {
                Ok(Some(processed)) => report.processed.push(processed),
                Ok(None) => {}
                Err(e) => report.failed.push(FailedQueue {
                    queue: key,
                    error: e.to_string(),
                }),
            }
        }

        if !report.processed.is_empty() || !report.failed.is_empty() {
            tracing::info!(
                processed = report.processed.len(),
                failed = report.failed.len(),
                "queue sweep finished"
            );
        }
        self.contract_locks.cleanup().await;
        self.drain_locks.cleanup().await;
        Ok(report)
    }

    async fn sweep_one(
        &self,
        token: &Principal,
        mode: SweepMode,
    ) -> Result<Option<ProcessedBatch>, NodeError> {
        self.registry.contract_for(token)?;
        let due = match mode {
            SweepMode::Ready => self.queue.is_batch_ready(token).await?,
            SweepMode::Flush => self.queue.should_process(token).await?,
        };
        if !due {
            return Ok(None);
        }
        self.process_batch(token).await
    }

    /// Length, batch size and readiness of every served token's queue.
    pub async fn queue_status(&self) -> Result<Vec<QueueStatus>, NodeError> {
        let mut statuses = Vec::with_capacity(self.registry.len());
        for (token, contract) in self.registry.tokens() {
            let length = self.queue.queue_length(token).await?;
            let batch_size = self.queue.batch_size(token);
            self.metrics.set_queue_length(&token.to_string(), length);
            statuses.push(QueueStatus {
                token: token.clone(),
                contract: contract.clone(),
                length,
                batch_size,
                ready: length >= batch_size as u64,
            });
        }
        statuses.sort_by(|a, b| a.token.cmp(&b.token));
        Ok(statuses)
    }

    // ── Balances and deposits ──────────────────────────────────────────

    pub async fn balance(
        &self,
        contract: &Principal,
        address: &Principal,
    ) -> Result<BalanceView, NodeError> {
        Ok(BalanceView {
            contract: contract.clone(),
            address: address.clone(),
            balance: self.ledger.get_balance(contract, address).await?,
            nonce: self.ledger.get_nonce(contract, address).await?,
        })
    }

    fn served_contract(&self, contract: &Principal) -> Result<(), NodeError> {
        match self.registry.token_for(contract) {
            Some(_) => Ok(()),
            None => Err(NodeError::InvalidRequest(format!(
                "{contract} is not a served subnet"
            ))),
        }
    }

    /// Credit an on-chain deposit into the subnet.
    pub async fn record_deposit(
        &self,
        contract: &Principal,
        address: &Principal,
        amount: MicroAmount,
        tx_id: Option<String>,
    ) -> Result<TransferNotification, NodeError> {
        self.served_contract(contract)?;
        let _guard = self.contract_locks.lock(contract).await;
        let balance = self.ledger.credit(contract, address, amount).await?;
        tracing::info!(%contract, %address, %amount, %balance, tx_id = ?tx_id, "deposit recorded");
        Ok(self
            .feed
            .record_deposit(contract, address, amount, tx_id)
            .await?)
    }

    /// Debit a withdrawal out of the subnet.
    pub async fn record_withdraw(
        &self,
        contract: &Principal,
        address: &Principal,
        amount: MicroAmount,
        tx_id: Option<String>,
    ) -> Result<TransferNotification, NodeError> {
        self.served_contract(contract)?;
        let _guard = self.contract_locks.lock(contract).await;
        let balance = match self.ledger.debit(contract, address, amount).await {
            Ok(balance) => balance,
            Err(LedgerError::InsufficientBalance { .. }) => {
                return Err(NodeError::InsufficientBalance)
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(%contract, %address, %amount, %balance, tx_id = ?tx_id, "withdrawal recorded");
        Ok(self
            .feed
            .record_withdraw(contract, address, amount, tx_id)
            .await?)
    }
}
