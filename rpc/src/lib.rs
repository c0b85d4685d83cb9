//! HTTP API for the Blaze service.
//!
//! Provides endpoints for:
//! - Transfer intake (`/api/v0/blaze/xfer`)
//! - Balances, balance streams and the balance audit trail
//! - Per-user notifications and the global transfer feed
//! - Queue status and manual draining
//! - Chainhook deposit/withdraw deliveries
//! - Prometheus metrics and health

pub mod error;
pub mod events;
pub mod handlers;
pub mod pagination;
pub mod server;
pub mod stream;

pub use error::RpcError;
pub use server::{router, RpcServer, RpcState};
