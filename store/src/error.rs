use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("store unreachable: {0}")]
    Unavailable(String),

    #[error("store request timed out")]
    Timeout,

    #[error("command rejected: {0}")]
    Command(String),

    #[error("unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: String, reply: String },

    #[error("transaction aborted")]
    TransactionAborted,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
