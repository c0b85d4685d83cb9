//! The key-value store trait.

use async_trait::async_trait;

use crate::{BatchMode, Command, Reply, ScoreBound, StoreError};

/// A Redis-compatible key-value store.
///
/// Backends implement [`execute`](KvStore::execute) and
/// [`execute_batch`](KvStore::execute_batch); the typed helpers are built on
/// top of them.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn execute(&self, command: Command) -> Result<Reply, StoreError>;

    /// Run several commands. Replies come back in command order.
    async fn execute_batch(
        &self,
        commands: Vec<Command>,
        mode: BatchMode,
    ) -> Result<Vec<Reply>, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.execute(Command::Get { key: key.into() })
            .await?
            .into_opt_string("GET")
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.execute(Command::Set {
            key: key.into(),
            value: value.into(),
        })
        .await?
        .into_ack("SET")
    }

    /// Atomically increment an integer key, returning the new value.
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.execute(Command::Incr { key: key.into() })
            .await?
            .into_int("INCR")
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.execute(Command::Del {
            keys: vec![key.into()],
        })
        .await?
        .into_ack("DEL")
    }

    /// Keys matching a glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.execute(Command::Keys {
            pattern: pattern.into(),
        })
        .await?
        .into_strings("KEYS")
    }

    /// Push to the head of a list, returning the new length.
    async fn lpush(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let n = self
            .execute(Command::LPush {
                key: key.into(),
                values: vec![value.into()],
            })
            .await?
            .into_int("LPUSH")?;
        Ok(n.max(0) as u64)
    }

    /// Push to the tail of a list, returning the new length.
    async fn rpush(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let n = self
            .execute(Command::RPush {
                key: key.into(),
                values: vec![value.into()],
            })
            .await?
            .into_int("RPUSH")?;
        Ok(n.max(0) as u64)
    }

    async fn llen(&self, key: &str) -> Result<u64, StoreError> {
        let n = self
            .execute(Command::LLen { key: key.into() })
            .await?
            .into_int("LLEN")?;
        Ok(n.max(0) as u64)
    }

    /// Inclusive index range; negative indices count from the tail.
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        self.execute(Command::LRange {
            key: key.into(),
            start,
            stop,
        })
        .await?
        .into_strings("LRANGE")
    }

    /// Keep only the inclusive index range.
    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<(), StoreError> {
        self.execute(Command::LTrim {
            key: key.into(),
            start,
            stop,
        })
        .await?
        .into_ack("LTRIM")
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError> {
        self.execute(Command::ZAdd {
            key: key.into(),
            score,
            member: member.into(),
        })
        .await?
        .into_ack("ZADD")
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        self.execute(Command::ZRem {
            key: key.into(),
            members: vec![member.into()],
        })
        .await?
        .into_ack("ZREM")
    }

    async fn zcard(&self, key: &str) -> Result<u64, StoreError> {
        let n = self
            .execute(Command::ZCard { key: key.into() })
            .await?
            .into_int("ZCARD")?;
        Ok(n.max(0) as u64)
    }

    /// Members by rank, highest score first.
    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        self.execute(Command::ZRange {
            key: key.into(),
            start,
            stop,
            rev: true,
        })
        .await?
        .into_strings("ZRANGE")
    }

    /// Members with scores in `[min, max]`, lowest score first.
    async fn zrangebyscore(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<String>, StoreError> {
        self.execute(Command::ZRangeByScore {
            key: key.into(),
            min,
            max,
        })
        .await?
        .into_strings("ZRANGEBYSCORE")
    }

    /// Remove members by rank range (lowest score is rank 0).
    async fn zremrangebyrank(&self, key: &str, start: i64, stop: i64) -> Result<(), StoreError> {
        self.execute(Command::ZRemRangeByRank {
            key: key.into(),
            start,
            stop,
        })
        .await?
        .into_ack("ZREMRANGEBYRANK")
    }
}
