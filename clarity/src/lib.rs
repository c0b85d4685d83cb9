//! Clarity values and their consensus serialization.
//!
//! Contract-call arguments, read-only call results, and structured-data
//! signing messages are all exchanged as serialized Clarity values.

pub mod codec;
pub mod error;
pub mod value;

pub use codec::{deserialize, deserialize_hex, MAX_DEPTH};
pub use error::ClarityError;
pub use value::ClarityValue;
