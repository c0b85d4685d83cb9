//! The command model: the subset of Redis commands the service issues.

use std::fmt;

use crate::StoreError;

/// One end of a sorted-set score range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScoreBound {
    NegInf,
    PosInf,
    Inclusive(f64),
    Exclusive(f64),
}

impl ScoreBound {
    /// `true` if `score` lies on the allowed side of this bound used as a minimum.
    pub fn admits_min(&self, score: f64) -> bool {
        match *self {
            Self::NegInf => true,
            Self::PosInf => false,
            Self::Inclusive(b) => score >= b,
            Self::Exclusive(b) => score > b,
        }
    }

    /// `true` if `score` lies on the allowed side of this bound used as a maximum.
    pub fn admits_max(&self, score: f64) -> bool {
        match *self {
            Self::NegInf => false,
            Self::PosInf => true,
            Self::Inclusive(b) => score <= b,
            Self::Exclusive(b) => score < b,
        }
    }
}

impl fmt::Display for ScoreBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegInf => f.write_str("-inf"),
            Self::PosInf => f.write_str("+inf"),
            Self::Inclusive(b) => write!(f, "{b}"),
            Self::Exclusive(b) => write!(f, "({b}"),
        }
    }
}

/// How a batch of commands is submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchMode {
    /// Sent together; each command succeeds or fails on its own.
    Pipeline,
    /// `MULTI`/`EXEC`: applied atomically, no other client interleaves.
    Transaction,
}

/// A store command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Get { key: String },
    Set { key: String, value: String },
    Incr { key: String },
    Del { keys: Vec<String> },
    Keys { pattern: String },
    LPush { key: String, values: Vec<String> },
    RPush { key: String, values: Vec<String> },
    LLen { key: String },
    LRange { key: String, start: i64, stop: i64 },
    LTrim { key: String, start: i64, stop: i64 },
    ZAdd { key: String, score: f64, member: String },
    ZRem { key: String, members: Vec<String> },
    ZCard { key: String },
    /// Range by rank; `rev` orders by descending score.
    ZRange { key: String, start: i64, stop: i64, rev: bool },
    ZRangeByScore { key: String, min: ScoreBound, max: ScoreBound },
    ZRemRangeByRank { key: String, start: i64, stop: i64 },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "GET",
            Self::Set { .. } => "SET",
            Self::Incr { .. } => "INCR",
            Self::Del { .. } => "DEL",
            Self::Keys { .. } => "KEYS",
            Self::LPush { .. } => "LPUSH",
            Self::RPush { .. } => "RPUSH",
            Self::LLen { .. } => "LLEN",
            Self::LRange { .. } => "LRANGE",
            Self::LTrim { .. } => "LTRIM",
            Self::ZAdd { .. } => "ZADD",
            Self::ZRem { .. } => "ZREM",
            Self::ZCard { .. } => "ZCARD",
            Self::ZRange { .. } => "ZRANGE",
            Self::ZRangeByScore { .. } => "ZRANGEBYSCORE",
            Self::ZRemRangeByRank { .. } => "ZREMRANGEBYRANK",
        }
    }

    /// The command as a Redis argument vector.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.name().to_string()];
        match self {
            Self::Get { key } | Self::Incr { key } | Self::LLen { key } | Self::ZCard { key } => {
                args.push(key.clone())
            }
            Self::Set { key, value } => args.extend([key.clone(), value.clone()]),
            Self::Del { keys } => args.extend(keys.iter().cloned()),
            Self::Keys { pattern } => args.push(pattern.clone()),
            Self::LPush { key, values } | Self::RPush { key, values } => {
                args.push(key.clone());
                args.extend(values.iter().cloned());
            }
            Self::LRange { key, start, stop }
            | Self::LTrim { key, start, stop }
            | Self::ZRemRangeByRank { key, start, stop } => {
                args.extend([key.clone(), start.to_string(), stop.to_string()])
            }
            Self::ZAdd { key, score, member } => {
                args.extend([key.clone(), score.to_string(), member.clone()])
            }
            Self::ZRem { key, members } => {
                args.push(key.clone());
                args.extend(members.iter().cloned());
            }
            Self::ZRange {
                key,
                start,
                stop,
                rev,
            } => {
                args.extend([key.clone(), start.to_string(), stop.to_string()]);
                if *rev {
                    args.push("REV".into());
                }
            }
            Self::ZRangeByScore { key, min, max } => {
                args.extend([key.clone(), min.to_string(), max.to_string()])
            }
        }
        args
    }
}

/// A command reply.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Nil,
    Int(i64),
    Bulk(String),
    Array(Vec<Reply>),
}

impl Reply {
    fn unexpected(&self, command: &str) -> StoreError {
        StoreError::UnexpectedReply {
            command: command.to_string(),
            reply: format!("{self:?}"),
        }
    }

    /// A bulk string or nil.
    pub fn into_opt_string(self, command: &str) -> Result<Option<String>, StoreError> {
        match self {
            Self::Nil => Ok(None),
            Self::Bulk(s) => Ok(Some(s)),
            Self::Int(n) => Ok(Some(n.to_string())),
            other => Err(other.unexpected(command)),
        }
    }

    /// An integer reply. Numeric bulk strings are accepted.
    pub fn into_int(self, command: &str) -> Result<i64, StoreError> {
        match self {
            Self::Int(n) => Ok(n),
            Self::Bulk(ref s) => s.parse().map_err(|_| self.unexpected(command)),
            other => Err(other.unexpected(command)),
        }
    }

    /// An array of bulk strings; nil becomes empty.
    pub fn into_strings(self, command: &str) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Nil => Ok(Vec::new()),
            Self::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Self::Bulk(s) => Ok(s),
                    Self::Int(n) => Ok(n.to_string()),
                    other => Err(other.unexpected(command)),
                })
                .collect(),
            other => Err(other.unexpected(command)),
        }
    }

    /// A simple acknowledgement (`OK`, an integer count, or nil).
    pub fn into_ack(self, command: &str) -> Result<(), StoreError> {
        match self {
            Self::Bulk(_) | Self::Int(_) | Self::Nil => Ok(()),
            other => Err(other.unexpected(command)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_render_like_redis() {
        let cmd = Command::LRange {
            key: "q".into(),
            start: 0,
            stop: -1,
        };
        assert_eq!(cmd.to_args(), vec!["LRANGE", "q", "0", "-1"]);

        let cmd = Command::ZRangeByScore {
            key: "z".into(),
            min: ScoreBound::Exclusive(1500.0),
            max: ScoreBound::PosInf,
        };
        assert_eq!(cmd.to_args(), vec!["ZRANGEBYSCORE", "z", "(1500", "+inf"]);

        let cmd = Command::ZRange {
            key: "z".into(),
            start: 0,
            stop: 9,
            rev: true,
        };
        assert_eq!(cmd.to_args(), vec!["ZRANGE", "z", "0", "9", "REV"]);
    }

    #[test]
    fn zadd_score_has_no_fraction_for_integers() {
        let cmd = Command::ZAdd {
            key: "z".into(),
            score: 1_700_000_000_000.0,
            member: "m".into(),
        };
        assert_eq!(cmd.to_args()[2], "1700000000000");
    }

    #[test]
    fn reply_conversions() {
        assert_eq!(Reply::Nil.into_opt_string("GET").unwrap(), None);
        assert_eq!(Reply::Bulk("42".into()).into_int("GET").unwrap(), 42);
        assert!(Reply::Bulk("x".into()).into_int("GET").is_err());
        assert_eq!(
            Reply::Array(vec![Reply::Bulk("a".into()), Reply::Int(2)])
                .into_strings("LRANGE")
                .unwrap(),
            vec!["a", "2"]
        );
        assert!(Reply::Array(vec![]).into_int("INCR").is_err());
    }

    #[test]
    fn score_bounds() {
        assert!(ScoreBound::Exclusive(5.0).admits_min(6.0));
        assert!(!ScoreBound::Exclusive(5.0).admits_min(5.0));
        assert!(ScoreBound::Inclusive(5.0).admits_max(5.0));
        assert!(ScoreBound::PosInf.admits_max(f64::MAX));
    }
}
