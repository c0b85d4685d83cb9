use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("malformed transfer record in {key}: {reason}")]
    Malformed { key: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] blaze_store::StoreError),
}
