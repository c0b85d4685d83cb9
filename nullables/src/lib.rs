//! Nullable infrastructure for deterministic testing.
//!
//! All external dependencies (clock, key-value store, chain node) are
//! abstracted behind traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod chain;
pub mod clock;
pub mod store;

pub use chain::{NullChain, ReadOnlyCall};
pub use clock::NullClock;
pub use store::NullKvStore;
