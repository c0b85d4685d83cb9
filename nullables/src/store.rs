//! Nullable key-value store: an in-memory Redis for testing.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use blaze_store::{BatchMode, Command, KvStore, Reply, StoreError};

#[derive(Clone, Debug)]
enum Entry {
    Str(String),
    List(VecDeque<String>),
    /// Kept sorted by `(score, member)`.
    ZSet(Vec<(f64, String)>),
}

type Data = HashMap<String, Entry>;

/// An in-memory [`KvStore`] with Redis semantics for the supported commands.
///
/// Transactions apply to a copy of the data and commit only if every
/// command succeeds. Commands can be made to fail by name.
#[derive(Default)]
pub struct NullKvStore {
    data: Mutex<Data>,
    failing: Mutex<HashSet<String>>,
    batches: Mutex<Vec<(BatchMode, usize)>>,
}

impl NullKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future command named `name` (e.g. `"RPUSH"`) fail.
    pub fn fail_command(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_uppercase());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Every batch executed so far, as `(mode, command count)`.
    pub fn batches(&self) -> Vec<(BatchMode, usize)> {
        self.batches.lock().unwrap().clone()
    }

    pub fn key_count(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().unwrap().contains_key(key)
    }

    fn check_failing(&self, command: &Command) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(command.name()) {
            return Err(StoreError::Backend(format!(
                "injected failure for {}",
                command.name()
            )));
        }
        Ok(())
    }
}

fn wrong_type() -> StoreError {
    StoreError::Command(
        "WRONGTYPE Operation against a key holding the wrong kind of value".into(),
    )
}

/// Resolve a Redis inclusive index range against `len`.
fn normalize_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

/// Glob match supporting `*` and `?`.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match(&pattern[1..], text) || (!text.is_empty() && glob_match(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => glob_match(&pattern[1..], &text[1..]),
        _ => false,
    }
}

fn list_mut<'a>(data: &'a mut Data, key: &str) -> Result<&'a mut VecDeque<String>, StoreError> {
    match data
        .entry(key.to_string())
        .or_insert_with(|| Entry::List(VecDeque::new()))
    {
        Entry::List(list) => Ok(list),
        _ => Err(wrong_type()),
    }
}

fn zset_mut<'a>(data: &'a mut Data, key: &str) -> Result<&'a mut Vec<(f64, String)>, StoreError> {
    match data
        .entry(key.to_string())
        .or_insert_with(|| Entry::ZSet(Vec::new()))
    {
        Entry::ZSet(set) => Ok(set),
        _ => Err(wrong_type()),
    }
}

fn list_ref<'a>(data: &'a Data, key: &str) -> Result<Option<&'a VecDeque<String>>, StoreError> {
    match data.get(key) {
        None => Ok(None),
        Some(Entry::List(list)) => Ok(Some(list)),
        Some(_) => Err(wrong_type()),
    }
}

fn zset_ref<'a>(data: &'a Data, key: &str) -> Result<Option<&'a Vec<(f64, String)>>, StoreError> {
    match data.get(key) {
        None => Ok(None),
        Some(Entry::ZSet(set)) => Ok(Some(set)),
        Some(_) => Err(wrong_type()),
    }
}

fn strings(items: impl IntoIterator<Item = String>) -> Reply {
    Reply::Array(items.into_iter().map(Reply::Bulk).collect())
}

/// Drop empty containers, as Redis does.
fn prune(data: &mut Data, key: &str) {
    let empty = match data.get(key) {
        Some(Entry::List(l)) => l.is_empty(),
        Some(Entry::ZSet(z)) => z.is_empty(),
        _ => false,
    };
    if empty {
        data.remove(key);
    }
}

fn apply(data: &mut Data, command: Command) -> Result<Reply, StoreError> {
    match command {
        Command::Get { key } => match data.get(&key) {
            None => Ok(Reply::Nil),
            Some(Entry::Str(s)) => Ok(Reply::Bulk(s.clone())),
            Some(_) => Err(wrong_type()),
        },
        Command::Set { key, value } => {
            data.insert(key, Entry::Str(value));
            Ok(Reply::Bulk("OK".into()))
        }
        Command::Incr { key } => {
            let current = match data.get(&key) {
                None => 0,
                Some(Entry::Str(s)) => s.parse::<i64>().map_err(|_| {
                    StoreError::Command("ERR value is not an integer or out of range".into())
                })?,
                Some(_) => return Err(wrong_type()),
            };
            let next = current + 1;
            data.insert(key, Entry::Str(next.to_string()));
            Ok(Reply::Int(next))
        }
        Command::Del { keys } => {
            let removed = keys.iter().filter(|k| data.remove(*k).is_some()).count();
            Ok(Reply::Int(removed as i64))
        }
        Command::Keys { pattern } => {
            let mut matched: Vec<String> = data
                .keys()
                .filter(|k| glob_match(pattern.as_bytes(), k.as_bytes()))
                .cloned()
                .collect();
            matched.sort();
            Ok(strings(matched))
        }
        Command::LPush { key, values } => {
            let list = list_mut(data, &key)?;
            for v in values {
                list.push_front(v);
            }
            Ok(Reply::Int(list.len() as i64))
        }
        Command::RPush { key, values } => {
            let list = list_mut(data, &key)?;
            list.extend(values);
            Ok(Reply::Int(list.len() as i64))
        }
        Command::LLen { key } => Ok(Reply::Int(
            list_ref(data, &key)?.map_or(0, |l| l.len()) as i64,
        )),
        Command::LRange { key, start, stop } => {
            let Some(list) = list_ref(data, &key)? else {
                return Ok(Reply::Array(Vec::new()));
            };
            Ok(match normalize_range(list.len(), start, stop) {
                Some((s, e)) => strings(list.range(s..=e).cloned()),
                None => Reply::Array(Vec::new()),
            })
        }
        Command::LTrim { key, start, stop } => {
            if list_ref(data, &key)?.is_none() {
                return Ok(Reply::Bulk("OK".into()));
            }
            let list = list_mut(data, &key)?;
            match normalize_range(list.len(), start, stop) {
                Some((s, e)) => {
                    list.truncate(e + 1);
                    list.drain(..s);
                }
                None => list.clear(),
            }
            prune(data, &key);
            Ok(Reply::Bulk("OK".into()))
        }
        Command::ZAdd { key, score, member } => {
            let set = zset_mut(data, &key)?;
            let added = match set.iter().position(|(_, m)| *m == member) {
                Some(i) => {
                    set.remove(i);
                    0
                }
                None => 1,
            };
            let at = set.partition_point(|(s, m)| (*s, m.as_str()) < (score, member.as_str()));
            set.insert(at, (score, member));
            Ok(Reply::Int(added))
        }
        Command::ZRem { key, members } => {
            if zset_ref(data, &key)?.is_none() {
                return Ok(Reply::Int(0));
            }
            let set = zset_mut(data, &key)?;
            let before = set.len();
            set.retain(|(_, m)| !members.contains(m));
            let removed = before - set.len();
            prune(data, &key);
            Ok(Reply::Int(removed as i64))
        }
        Command::ZCard { key } => Ok(Reply::Int(
            zset_ref(data, &key)?.map_or(0, |z| z.len()) as i64,
        )),
        Command::ZRange {
            key,
            start,
            stop,
            rev,
        } => {
            let Some(set) = zset_ref(data, &key)? else {
                return Ok(Reply::Array(Vec::new()));
            };
            let mut members: Vec<String> = set.iter().map(|(_, m)| m.clone()).collect();
            if rev {
                members.reverse();
            }
            Ok(match normalize_range(members.len(), start, stop) {
                Some((s, e)) => strings(members[s..=e].iter().cloned()),
                None => Reply::Array(Vec::new()),
            })
        }
        Command::ZRangeByScore { key, min, max } => {
            let Some(set) = zset_ref(data, &key)? else {
                return Ok(Reply::Array(Vec::new()));
            };
            Ok(strings(
                set.iter()
                    .filter(|(s, _)| min.admits_min(*s) && max.admits_max(*s))
                    .map(|(_, m)| m.clone()),
            ))
        }
        Command::ZRemRangeByRank { key, start, stop } => {
            if zset_ref(data, &key)?.is_none() {
                return Ok(Reply::Int(0));
            }
            let set = zset_mut(data, &key)?;
            let removed = match normalize_range(set.len(), start, stop) {
                Some((s, e)) => set.drain(s..=e).count(),
                None => 0,
            };
            prune(data, &key);
            Ok(Reply::Int(removed as i64))
        }
    }
}

#[async_trait]
impl KvStore for NullKvStore {
    async fn execute(&self, command: Command) -> Result<Reply, StoreError> {
        self.check_failing(&command)?;
        let mut data = self.data.lock().unwrap();
        apply(&mut data, command)
    }

    async fn execute_batch(
        &self,
        commands: Vec<Command>,
        mode: BatchMode,
    ) -> Result<Vec<Reply>, StoreError> {
        self.batches.lock().unwrap().push((mode, commands.len()));
        for command in &commands {
            self.check_failing(command)?;
        }

        let mut data = self.data.lock().unwrap();
        match mode {
            BatchMode::Pipeline => commands
                .into_iter()
                .map(|command| apply(&mut data, command))
                .collect(),
            BatchMode::Transaction => {
                let mut staged = data.clone();
                let replies = commands
                    .into_iter()
                    .map(|command| apply(&mut staged, command))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| StoreError::TransactionAborted)?;
                *data = staged;
                Ok(replies)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blaze_store::ScoreBound;

    #[tokio::test]
    async fn strings_and_incr() {
        let store = NullKvStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "41").await.unwrap();
        assert_eq!(store.incr("k").await.unwrap(), 42);
        assert_eq!(store.incr("fresh").await.unwrap(), 1);
        store.set("s", "abc").await.unwrap();
        assert!(store.incr("s").await.is_err());
    }

    #[tokio::test]
    async fn list_ranges_follow_redis() {
        let store = NullKvStore::new();
        for v in ["a", "b", "c", "d"] {
            store.rpush("l", v).await.unwrap();
        }
        assert_eq!(store.lrange("l", 0, 1).await.unwrap(), vec!["a", "b"]);
        assert_eq!(store.lrange("l", -2, -1).await.unwrap(), vec!["c", "d"]);
        assert_eq!(store.lrange("l", 0, 100).await.unwrap().len(), 4);
        assert!(store.lrange("l", 5, 10).await.unwrap().is_empty());

        store.ltrim("l", 1, -1).await.unwrap();
        assert_eq!(store.lrange("l", 0, -1).await.unwrap(), vec!["b", "c", "d"]);
        store.ltrim("l", 3, -1).await.unwrap();
        assert_eq!(store.llen("l").await.unwrap(), 0);
        assert!(!store.contains_key("l"));

        assert_eq!(store.lpush("p", "x").await.unwrap(), 1);
        assert_eq!(store.lpush("p", "y").await.unwrap(), 2);
        assert_eq!(store.lrange("p", 0, -1).await.unwrap(), vec!["y", "x"]);
    }

    #[tokio::test]
    async fn sorted_sets() {
        let store = NullKvStore::new();
        store.zadd("z", 3.0, "c").await.unwrap();
        store.zadd("z", 1.0, "a").await.unwrap();
        store.zadd("z", 2.0, "b").await.unwrap();
        store.zadd("z", 2.0, "b").await.unwrap();
        assert_eq!(store.zcard("z").await.unwrap(), 3);
        assert_eq!(store.zrevrange("z", 0, 1).await.unwrap(), vec!["c", "b"]);
        assert_eq!(
            store
                .zrangebyscore("z", ScoreBound::Exclusive(1.0), ScoreBound::PosInf)
                .await
                .unwrap(),
            vec!["b", "c"]
        );
        store.zremrangebyrank("z", 0, 0).await.unwrap();
        assert_eq!(store.zrevrange("z", 0, -1).await.unwrap(), vec!["c", "b"]);
        store.zrem("z", "c").await.unwrap();
        assert_eq!(store.zcard("z").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn keys_glob() {
        let store = NullKvStore::new();
        store.rpush("blaze:transfer:queue:A", "1").await.unwrap();
        store.rpush("blaze:transfer:queue:B", "1").await.unwrap();
        store.set("balance:x:y", "1").await.unwrap();
        assert_eq!(
            store.keys("blaze:transfer:queue:*").await.unwrap(),
            vec!["blaze:transfer:queue:A", "blaze:transfer:queue:B"]
        );
        assert_eq!(store.keys("balance:?:y").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_type_is_an_error() {
        let store = NullKvStore::new();
        store.set("k", "v").await.unwrap();
        assert!(store.rpush("k", "x").await.is_err());
        assert!(store.llen("k").await.is_err());
    }

    #[tokio::test]
    async fn transaction_is_all_or_nothing() {
        let store = NullKvStore::new();
        store.set("text", "abc").await.unwrap();
        let result = store
            .execute_batch(
                vec![
                    Command::Set {
                        key: "a".into(),
                        value: "1".into(),
                    },
                    Command::Incr { key: "text".into() },
                ],
                BatchMode::Transaction,
            )
            .await;
        assert!(matches!(result, Err(StoreError::TransactionAborted)));
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.batches(), vec![(BatchMode::Transaction, 2)]);
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = NullKvStore::new();
        store.fail_command("rpush");
        assert!(matches!(
            store.rpush("q", "x").await,
            Err(StoreError::Backend(_))
        ));
        store.clear_failures();
        assert_eq!(store.rpush("q", "x").await.unwrap(), 1);
    }

    #[test]
    fn glob() {
        assert!(glob_match(b"*", b""));
        assert!(glob_match(b"a*c", b"abbbc"));
        assert!(!glob_match(b"a*c", b"abbb"));
        assert!(glob_match(b"a?c", b"abc"));
    }
}
