//! Blaze subnet service.
//!
//! The service accepts signed off-chain transfers, moves balances in the
//! shared ledger immediately, and settles queued transfers on chain:
//! - [`BlazeService`] owns intake, draining and deposit/withdraw bookkeeping
//! - [`NodeConfig`] and [`TokenRegistry`] describe the served tokens
//! - [`spawn_sweeper`] drains ready queues on an interval
//! - logging, metrics and shutdown plumbing shared by the RPC server and daemon

pub mod config;
pub mod error;
pub mod locks;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod service;
pub mod shutdown;
pub mod sweeper;

pub use config::{NodeConfig, TokenConfig, WELSH_SUBNET, WELSH_TOKEN};
pub use error::NodeError;
pub use locks::KeyedLocks;
pub use logging::{init_logging, LogFormat};
pub use metrics::ServiceMetrics;
pub use registry::TokenRegistry;
pub use service::{
    BalanceView, BlazeService, FailedQueue, ProcessedBatch, QueueStatus, ReceiptBalances,
    SweepReport, TransferReceipt,
};
pub use shutdown::ShutdownController;
pub use sweeper::spawn_sweeper;
