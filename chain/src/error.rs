use blaze_clarity::ClarityError;
use blaze_crypto::TransferSignatureError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain node unreachable: {0}")]
    Unavailable(String),

    #[error("chain request timed out")]
    Timeout,

    #[error("chain request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response from chain node: {0}")]
    InvalidResponse(String),

    #[error("read-only call failed: {0}")]
    ReadOnly(String),

    #[error("broadcast rejected: {error}{}", fmt_reason(.reason))]
    BroadcastRejected {
        error: String,
        reason: Option<String>,
    },

    #[error("transaction encoding failed: {0}")]
    Encoding(String),

    #[error("clarity value error: {0}")]
    Clarity(#[from] ClarityError),

    #[error("signature error: {0}")]
    Signature(#[from] TransferSignatureError),
}

impl From<reqwest::Error> for ChainError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChainError::Timeout
        } else if e.is_connect() {
            ChainError::Unavailable(format!("connection failed: {e}"))
        } else {
            ChainError::RequestFailed(e.to_string())
        }
    }
}

fn fmt_reason(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_rejection_includes_reason() {
        let e = ChainError::BroadcastRejected {
            error: "transaction rejected".into(),
            reason: Some("BadNonce".into()),
        };
        assert_eq!(e.to_string(), "broadcast rejected: transaction rejected (BadNonce)");

        let e = ChainError::BroadcastRejected {
            error: "transaction rejected".into(),
            reason: None,
        };
        assert_eq!(e.to_string(), "broadcast rejected: transaction rejected");
    }
}
