//! Transfer queues for the Blaze subnet.
//!
//! Signed transfers wait here, per token, until a drain settles them on
//! chain in one `batch-transfer` call.

pub mod error;
pub mod queue;

pub use error::QueueError;
pub use queue::{QueueConfig, TransferQueue};
