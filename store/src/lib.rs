//! Key-value store abstraction for the Blaze subnet.
//!
//! Balances, nonces, queues and activity feeds live in a shared
//! Redis-compatible store. Every backend (the managed REST service, the
//! in-memory store used in tests) implements [`KvStore`]; the rest of the
//! workspace depends only on the trait.

pub mod command;
pub mod error;
pub mod keys;
pub mod kv;

pub use command::{BatchMode, Command, Reply, ScoreBound};
pub use error::StoreError;
pub use kv::KvStore;
