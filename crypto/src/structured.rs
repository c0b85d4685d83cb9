//! Structured-data transfer signatures.
//!
//! A transfer is signed over
//! `sha256("SIP018" || sha256(ser(domain)) || sha256(ser(message)))`,
//! where `ser` is Clarity consensus serialization of the domain tuple
//! `{name, version, chain-id}` and the message tuple `{token, to, amount, nonce}`.
//!
//! The encoded signature is the hex of `ed25519_signature(64) || public_key(32)`,
//! so a verifier can recover the signing principal without a key registry.

use blaze_clarity::{ClarityError, ClarityValue};
use blaze_types::{MicroAmount, NetworkId, Principal, PrivateKey, PublicKey, Signature};

use crate::address::hash160;
use crate::hash::{sha256, sha256_multi};
use crate::keys::public_from_private;
use crate::sign::{sign_message, verify_signature};

/// Prefix mixed into every structured-data hash.
pub const STRUCTURED_DATA_PREFIX: &[u8; 6] = b"SIP018";

/// Encoded signature length in bytes: signature plus public key.
pub const SIGNATURE_LEN: usize = 64 + 32;

/// Encoded signature length in hex characters.
pub const SIGNATURE_HEX_LEN: usize = SIGNATURE_LEN * 2;

#[derive(Debug, thiserror::Error)]
pub enum TransferSignatureError {
    #[error("signature is not hex: {0}")]
    InvalidHex(String),

    #[error("signature length {actual} bytes, expected {expected}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("cannot encode structured data: {0}")]
    Encoding(#[from] ClarityError),
}

/// The signing domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u32,
}

impl Domain {
    /// The Blaze subnet domain on `network`.
    pub fn blaze(network: NetworkId) -> Self {
        Self {
            name: "blaze".into(),
            version: "0.1.0".into(),
            chain_id: network.chain_id(),
        }
    }

    pub fn to_clarity(&self) -> Result<ClarityValue, ClarityError> {
        ClarityValue::tuple([
            ("name", ClarityValue::string_ascii(&self.name)?),
            ("version", ClarityValue::string_ascii(&self.version)?),
            ("chain-id", ClarityValue::uint(self.chain_id)),
        ])
    }
}

/// The signed transfer message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferMessage {
    pub token: Principal,
    pub to: Principal,
    pub amount: MicroAmount,
    pub nonce: u64,
}

impl TransferMessage {
    pub fn to_clarity(&self) -> Result<ClarityValue, ClarityError> {
        ClarityValue::tuple([
            ("token", ClarityValue::principal(&self.token)),
            ("to", ClarityValue::principal(&self.to)),
            ("amount", ClarityValue::uint(self.amount.micro())),
            ("nonce", ClarityValue::uint(self.nonce)),
        ])
    }
}

/// Hash a structured message under `domain`.
pub fn structured_data_hash(
    domain: &Domain,
    message: &ClarityValue,
) -> Result<[u8; 32], ClarityError> {
    let domain_hash = sha256(&domain.to_clarity()?.serialize());
    let message_hash = sha256(&message.serialize());
    Ok(sha256_multi(&[
        STRUCTURED_DATA_PREFIX,
        &domain_hash,
        &message_hash,
    ]))
}

/// Sign a transfer and return the hex-encoded `signature || public_key`.
pub fn sign_transfer(
    message: &TransferMessage,
    domain: &Domain,
    private_key: &PrivateKey,
) -> Result<String, TransferSignatureError> {
    let hash = structured_data_hash(domain, &message.to_clarity()?)?;
    let signature = sign_message(&hash, private_key);
    let public = public_from_private(private_key);

    let mut encoded = Vec::with_capacity(SIGNATURE_LEN);
    encoded.extend_from_slice(signature.as_bytes());
    encoded.extend_from_slice(public.as_bytes());
    Ok(hex::encode(encoded))
}

/// Split an encoded transfer signature into its signature and public key.
///
/// A leading `0x` is accepted.
pub fn decode_transfer_signature(
    encoded: &str,
) -> Result<(Signature, PublicKey), TransferSignatureError> {
    let raw = encoded.strip_prefix("0x").unwrap_or(encoded);
    let bytes = hex::decode(raw).map_err(|e| TransferSignatureError::InvalidHex(e.to_string()))?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(TransferSignatureError::InvalidLength {
            expected: SIGNATURE_LEN,
            actual: bytes.len(),
        });
    }
    let mut sig = [0u8; 64];
    let mut key = [0u8; 32];
    sig.copy_from_slice(&bytes[..64]);
    key.copy_from_slice(&bytes[64..]);
    Ok((Signature(sig), PublicKey(key)))
}

/// Check an encoded transfer signature the way the subnet contract does.
///
/// The signature must verify over the structured hash of `message`, and the
/// embedded public key must hash to `signer`'s account. Any malformed input
/// yields `false`.
pub fn verify_transfer_signature(
    encoded: &str,
    signer: &Principal,
    message: &TransferMessage,
    domain: &Domain,
) -> bool {
    let Principal::Standard(signer) = signer else {
        return false;
    };
    let Ok((signature, public)) = decode_transfer_signature(encoded) else {
        return false;
    };
    if hash160(&public) != *signer.hash160() {
        return false;
    }
    let Ok(clarity) = message.to_clarity() else {
        return false;
    };
    match structured_data_hash(domain, &clarity) {
        Ok(hash) => verify_signature(&hash, &signature, &public),
        Err(_) => false,
    }
}
