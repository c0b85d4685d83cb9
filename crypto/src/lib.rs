//! Cryptographic primitives for the Blaze subnet service.
//!
//! - **Ed25519** for signing and signature verification
//! - **SHA-256 / SHA-512/256** for structured-data and transaction hashing
//! - **Blake2b-160** for deriving principals from public keys
//! - Structured-data transfer signatures over a `{name, version, chain-id}` domain

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;
pub mod structured;

pub use address::{derive_principal, hash160};
pub use hash::{sha256, sha512_256};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
pub use structured::{
    decode_transfer_signature, sign_transfer, structured_data_hash, verify_transfer_signature,
    Domain, TransferMessage, TransferSignatureError, SIGNATURE_HEX_LEN,
};
