use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("corrupt value at {key}: {value:?}")]
    Corrupt { key: String, value: String },

    #[error("insufficient balance for {address}: have {balance}, need {amount}")]
    InsufficientBalance {
        address: String,
        balance: String,
        amount: String,
    },

    #[error("balance overflow for {0}")]
    Overflow(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] blaze_store::StoreError),
}
