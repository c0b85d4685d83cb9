//! Chain access for the Blaze subnet service.
//!
//! - [`ChainClient`] abstracts the node API; [`HttpChainClient`] implements it over HTTP
//! - [`SignatureHelper`] signs transfers with the service key and checks client
//!   signatures through the subnet contract's `verify-signature`
//! - [`ContractBroadcaster`] settles queued transfers with one `batch-transfer` call

pub mod broadcast;
pub mod client;
pub mod error;
pub mod http;
pub mod signer;
pub mod tx;

pub use broadcast::{
    transfer_to_clarity, BatchStatus, BatchTransferResult, ContractBroadcaster,
    BATCH_TRANSFER_FUNCTION, DEFAULT_FEE,
};
pub use client::{BroadcastResponse, ChainClient};
pub use error::ChainError;
pub use http::HttpChainClient;
pub use signer::{SignatureHelper, SigningConfig, VERIFY_FUNCTION};
pub use tx::{ContractCall, SignedTransaction};
