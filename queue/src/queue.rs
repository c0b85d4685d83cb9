//! Per-token transfer queues.
//!
//! Each token has one list at `blaze:transfer:queue:<token>`. Transfers are
//! appended at the tail and drained from the head, so batches settle in
//! submission order. A transfer enqueued while a batch is in flight lands
//! behind the window that [`TransferQueue::remove_processed`] trims.

use std::collections::HashMap;
use std::sync::Arc;

use blaze_store::{keys, KvStore};
use blaze_types::{Principal, Transfer};

use crate::QueueError;

#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Batch size for tokens without an explicit entry.
    pub default_batch_size: usize,
    /// Queue length at which a queue is worth processing at all.
    pub minimum_batch_size: u64,
    pub batch_sizes: HashMap<Principal, usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_batch_size: 1,
            minimum_batch_size: 1,
            batch_sizes: HashMap::new(),
        }
    }
}

impl QueueConfig {
    pub fn with_batch_size(mut self, token: Principal, size: usize) -> Self {
        self.batch_sizes.insert(token, size);
        self
    }
}

pub struct TransferQueue {
    store: Arc<dyn KvStore>,
    config: QueueConfig,
}

impl TransferQueue {
    pub fn new(store: Arc<dyn KvStore>, config: QueueConfig) -> Self {
        Self { store, config }
    }

    pub fn queue_key(token: &Principal) -> String {
        keys::queue(token)
    }

    /// The token a queue key belongs to, if it is a well-formed queue key.
    pub fn token_from_queue_key(key: &str) -> Option<Principal> {
        key.strip_prefix(keys::QUEUE_PREFIX)
            .and_then(|token| Principal::parse(token).ok())
    }

    /// Transfers per batch for `token`; never less than 1.
    pub fn batch_size(&self, token: &Principal) -> usize {
        self.config
            .batch_sizes
            .get(token)
            .copied()
            .unwrap_or(self.config.default_batch_size)
            .max(1)
    }

    pub fn minimum_batch_size(&self) -> u64 {
        self.config.minimum_batch_size
    }

    /// Append a transfer and return the new queue length.
    pub async fn enqueue(&self, token: &Principal, transfer: &Transfer) -> Result<u64, QueueError> {
        let record = serde_json::to_string(transfer)?;
        let length = self.store.rpush(&Self::queue_key(token), &record).await?;
        tracing::debug!(%token, nonce = transfer.nonce, length, "transfer queued");
        Ok(length)
    }

    pub async fn queue_length(&self, token: &Principal) -> Result<u64, QueueError> {
        Ok(self.store.llen(&Self::queue_key(token)).await?)
    }

    /// The oldest `batch_size` transfers, without removing them.
    pub async fn peek_batch(&self, token: &Principal) -> Result<Vec<Transfer>, QueueError> {
        let key = Self::queue_key(token);
        let stop = self.batch_size(token) as i64 - 1;
        let records = self.store.lrange(&key, 0, stop).await?;
        records
            .iter()
            .map(|record| {
                serde_json::from_str(record).map_err(|e| QueueError::Malformed {
                    key: key.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Drop the oldest `batch_size` transfers.
    pub async fn remove_processed(&self, token: &Principal) -> Result<(), QueueError> {
        self.remove_first(token, self.batch_size(token)).await
    }

    /// Drop the oldest `count` transfers. Draining a short batch must trim
    /// only what was peeked, or transfers queued meanwhile are lost.
    pub async fn remove_first(&self, token: &Principal, count: usize) -> Result<(), QueueError> {
        if count == 0 {
            return Ok(());
        }
        let start = i64::try_from(count).unwrap_or(i64::MAX);
        self.store.ltrim(&Self::queue_key(token), start, -1).await?;
        Ok(())
    }

    /// `true` once the queue holds at least the minimum batch.
    pub async fn should_process(&self, token: &Principal) -> Result<bool, QueueError> {
        Ok(self.queue_length(token).await? >= self.config.minimum_batch_size)
    }

    /// `true` once the queue holds a full batch for `token`.
    pub async fn is_batch_ready(&self, token: &Principal) -> Result<bool, QueueError> {
        Ok(self.queue_length(token).await? >= self.batch_size(token) as u64)
    }

    /// Every existing queue key.
    pub async fn all_queue_keys(&self) -> Result<Vec<String>, QueueError> {
        Ok(self.store.keys(&keys::queue_pattern()).await?)
    }

    /// Delete a token's queue.
    pub async fn clear(&self, token: &Principal) -> Result<(), QueueError> {
        self.store.del(&Self::queue_key(token)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blaze_nullables::NullKvStore;
    use blaze_types::MicroAmount;

    const TOKEN: &str = "SP3NE50GEXFG9SZGTT51P40X2CKYSZ5CC4ZTZ7A2G.welshcorgicoin-token";
    const OTHER: &str = "SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS.other-token";
    const BOB: &str = "SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS";

    fn p(s: &str) -> Principal {
        Principal::parse(s).unwrap()
    }

    fn transfer(nonce: u64) -> Transfer {
        Transfer {
            to: p(BOB),
            amount: MicroAmount::new(10),
            nonce,
            signature: format!("{nonce:0192x}"),
        }
    }

    fn queue(config: QueueConfig) -> (TransferQueue, Arc<NullKvStore>) {
        let store = Arc::new(NullKvStore::new());
        (TransferQueue::new(store.clone(), config), store)
    }

    #[test]
    fn key_roundtrip() {
        let key = TransferQueue::queue_key(&p(TOKEN));
        assert_eq!(key, format!("blaze:transfer:queue:{TOKEN}"));
        assert_eq!(TransferQueue::token_from_queue_key(&key), Some(p(TOKEN)));
        assert_eq!(TransferQueue::token_from_queue_key("balance:x:y"), None);
        assert_eq!(TransferQueue::token_from_queue_key("blaze:transfer:queue:junk"), None);
    }

    #[test]
    fn batch_size_defaults_and_overrides() {
        let (q, _) = queue(QueueConfig::default().with_batch_size(p(TOKEN), 200));
        assert_eq!(q.batch_size(&p(TOKEN)), 200);
        assert_eq!(q.batch_size(&p(OTHER)), 1);

        let (q, _) = queue(QueueConfig::default().with_batch_size(p(TOKEN), 0));
        assert_eq!(q.batch_size(&p(TOKEN)), 1);
    }

    #[tokio::test]
    async fn enqueue_grows_length_by_one() {
        let (q, _) = queue(QueueConfig::default());
        assert_eq!(q.queue_length(&p(TOKEN)).await.unwrap(), 0);
        assert_eq!(q.enqueue(&p(TOKEN), &transfer(1)).await.unwrap(), 1);
        assert_eq!(q.enqueue(&p(TOKEN), &transfer(2)).await.unwrap(), 2);
        assert_eq!(q.queue_length(&p(TOKEN)).await.unwrap(), 2);
        assert_eq!(q.queue_length(&p(OTHER)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn batches_drain_oldest_first() {
        let (q, _) = queue(QueueConfig::default().with_batch_size(p(TOKEN), 2));
        for n in 1..=5 {
            q.enqueue(&p(TOKEN), &transfer(n)).await.unwrap();
        }

        let batch = q.peek_batch(&p(TOKEN)).await.unwrap();
        assert_eq!(batch.iter().map(|t| t.nonce).collect::<Vec<_>>(), vec![1, 2]);
        // peeking does not consume
        assert_eq!(q.queue_length(&p(TOKEN)).await.unwrap(), 5);

        q.remove_processed(&p(TOKEN)).await.unwrap();
        let batch = q.peek_batch(&p(TOKEN)).await.unwrap();
        assert_eq!(batch.iter().map(|t| t.nonce).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[tokio::test]
    async fn enqueue_during_drain_is_kept() {
        let (q, _) = queue(QueueConfig::default().with_batch_size(p(TOKEN), 2));
        q.enqueue(&p(TOKEN), &transfer(1)).await.unwrap();
        q.enqueue(&p(TOKEN), &transfer(2)).await.unwrap();
        let batch = q.peek_batch(&p(TOKEN)).await.unwrap();
        q.enqueue(&p(TOKEN), &transfer(3)).await.unwrap();
        q.remove_processed(&p(TOKEN)).await.unwrap();

        assert_eq!(batch.len(), 2);
        let left = q.peek_batch(&p(TOKEN)).await.unwrap();
        assert_eq!(left, vec![transfer(3)]);
    }

    #[tokio::test]
    async fn short_batch_trims_only_what_was_peeked() {
        let (q, _) = queue(QueueConfig::default().with_batch_size(p(TOKEN), 5));
        q.enqueue(&p(TOKEN), &transfer(1)).await.unwrap();
        q.enqueue(&p(TOKEN), &transfer(2)).await.unwrap();
        let batch = q.peek_batch(&p(TOKEN)).await.unwrap();
        q.enqueue(&p(TOKEN), &transfer(3)).await.unwrap();

        q.remove_first(&p(TOKEN), batch.len()).await.unwrap();
        assert_eq!(q.peek_batch(&p(TOKEN)).await.unwrap(), vec![transfer(3)]);
    }

    #[tokio::test]
    async fn two_hundred_transfers_fill_one_batch() {
        let (q, _) = queue(QueueConfig::default().with_batch_size(p(TOKEN), 200));
        for n in 0..199 {
            q.enqueue(&p(TOKEN), &transfer(n)).await.unwrap();
        }
        assert!(!q.is_batch_ready(&p(TOKEN)).await.unwrap());
        q.enqueue(&p(TOKEN), &transfer(199)).await.unwrap();
        assert!(q.is_batch_ready(&p(TOKEN)).await.unwrap());

        let batch = q.peek_batch(&p(TOKEN)).await.unwrap();
        assert_eq!(batch.len(), 200);
        assert_eq!(batch[0].nonce, 0);
        assert_eq!(batch[199].nonce, 199);

        q.remove_processed(&p(TOKEN)).await.unwrap();
        assert_eq!(q.queue_length(&p(TOKEN)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_process_uses_minimum() {
        let config = QueueConfig {
            minimum_batch_size: 3,
            ..QueueConfig::default()
        };
        let (q, _) = queue(config.with_batch_size(p(TOKEN), 10));
        q.enqueue(&p(TOKEN), &transfer(1)).await.unwrap();
        q.enqueue(&p(TOKEN), &transfer(2)).await.unwrap();
        assert!(!q.should_process(&p(TOKEN)).await.unwrap());
        q.enqueue(&p(TOKEN), &transfer(3)).await.unwrap();
        assert!(q.should_process(&p(TOKEN)).await.unwrap());
        assert!(!q.is_batch_ready(&p(TOKEN)).await.unwrap());
    }

    #[tokio::test]
    async fn empty_queue_peeks_empty() {
        let (q, _) = queue(QueueConfig::default());
        assert!(q.peek_batch(&p(TOKEN)).await.unwrap().is_empty());
        q.remove_processed(&p(TOKEN)).await.unwrap();
    }

    #[tokio::test]
    async fn lists_and_clears_queues() {
        let (q, store) = queue(QueueConfig::default());
        q.enqueue(&p(TOKEN), &transfer(1)).await.unwrap();
        q.enqueue(&p(OTHER), &transfer(1)).await.unwrap();
        store.set("balance:a:b", "1").await.unwrap();

        let mut tokens: Vec<Principal> = q
            .all_queue_keys()
            .await
            .unwrap()
            .iter()
            .filter_map(|k| TransferQueue::token_from_queue_key(k))
            .collect();
        tokens.sort();
        let mut expected = vec![p(TOKEN), p(OTHER)];
        expected.sort();
        assert_eq!(tokens, expected);

        q.clear(&p(OTHER)).await.unwrap();
        assert_eq!(q.all_queue_keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_record_is_an_error() {
        let (q, store) = queue(QueueConfig::default());
        store
            .rpush(&TransferQueue::queue_key(&p(TOKEN)), "{not json")
            .await
            .unwrap();
        assert!(matches!(
            q.peek_batch(&p(TOKEN)).await,
            Err(QueueError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let (q, store) = queue(QueueConfig::default());
        store.fail_command("RPUSH");
        assert!(matches!(
            q.enqueue(&p(TOKEN), &transfer(1)).await,
            Err(QueueError::Storage(_))
        ));
    }
}
