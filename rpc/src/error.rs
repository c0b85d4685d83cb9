//! RPC error types.
//!
//! Every error leaves the server as JSON `{"error": "<message>"}`. Service
//! failures are logged in full and reported to the client generically.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use blaze_ledger::LedgerError;
use blaze_node::NodeError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Forbidden: Invalid authorization")]
    Forbidden,

    #[error("service error: {0}")]
    Node(NodeError),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InsufficientBalance => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Node(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for a missing or malformed parameter.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl From<NodeError> for RpcError {
    fn from(e: NodeError) -> Self {
        match e {
            NodeError::InvalidSignature => Self::InvalidSignature,
            NodeError::InsufficientBalance => Self::InsufficientBalance,
            e if e.is_client_error() => Self::BadRequest(e.to_string()),
            e => Self::Node(e),
        }
    }
}

impl From<LedgerError> for RpcError {
    fn from(e: LedgerError) -> Self {
        NodeError::from(e).into()
    }
}

impl From<JsonRejection> for RpcError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for RpcError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Node(e) => {
                tracing::error!(error = %e, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
