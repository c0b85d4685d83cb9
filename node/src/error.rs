use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] blaze_ledger::LedgerError),

    #[error("queue error: {0}")]
    Queue(#[from] blaze_queue::QueueError),

    #[error("chain error: {0}")]
    Chain(#[from] blaze_chain::ChainError),

    #[error("store error: {0}")]
    Store(#[from] blaze_store::StoreError),

    #[error("no subnet contract for token {0}")]
    UnknownToken(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("sender and recipient are the same principal")]
    SelfTransfer,

    #[error("nonce {got} already used; it must exceed {stored}")]
    StaleNonce { stored: u64, got: u64 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl NodeError {
    /// `true` for errors caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownToken(_)
                | Self::InvalidSignature
                | Self::InsufficientBalance
                | Self::SelfTransfer
                | Self::StaleNonce { .. }
                | Self::InvalidRequest(_)
        )
    }
}
