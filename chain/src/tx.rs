//! Contract-call transaction encoding.
//!
//! Wire layout, all integers big-endian:
//!
//! ```text
//! version u8 | chain_id u32 | sender_pubkey [32] | nonce u64 | fee u64
//! | contract (version u8, hash160 [20]) | name (u8 len, ascii)
//! | function (u8 len, ascii) | argc u32 | args (Clarity) | signature [64]
//! ```
//!
//! The signature covers SHA-512/256 of every byte before it; the txid is
//! SHA-512/256 of the full encoding.

use blaze_clarity::ClarityValue;
use blaze_crypto::{public_from_private, sha512_256, sign_message};
use blaze_types::{ContractName, NetworkId, PrivateKey, PublicKey, Signature, StandardPrincipal};

use crate::ChainError;

const MAX_NAME_LEN: usize = 128;

/// An unsigned contract call.
#[derive(Clone, Debug, PartialEq)]
pub struct ContractCall {
    pub network: NetworkId,
    pub nonce: u64,
    pub fee: u64,
    pub contract_address: StandardPrincipal,
    pub contract_name: ContractName,
    pub function_name: String,
    pub args: Vec<ClarityValue>,
}

/// A signed contract-call transaction ready for broadcast.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedTransaction {
    body: Vec<u8>,
    signature: Signature,
}

fn write_name(out: &mut Vec<u8>, kind: &str, name: &str) -> Result<(), ChainError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || !name.is_ascii() {
        return Err(ChainError::Encoding(format!("invalid {kind} name: {name:?}")));
    }
    out.push(name.len() as u8);
    out.extend_from_slice(name.as_bytes());
    Ok(())
}

impl ContractCall {
    /// Serialize the signed-over portion for `sender`.
    pub fn encode_body(&self, sender: &PublicKey) -> Result<Vec<u8>, ChainError> {
        let mut out = Vec::with_capacity(128);
        out.push(self.network.transaction_version());
        out.extend_from_slice(&self.network.chain_id().to_be_bytes());
        out.extend_from_slice(sender.as_bytes());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(&self.fee.to_be_bytes());
        out.push(self.contract_address.version());
        out.extend_from_slice(self.contract_address.hash160());
        write_name(&mut out, "contract", self.contract_name.as_str())?;
        write_name(&mut out, "function", &self.function_name)?;

        let argc = u32::try_from(self.args.len())
            .map_err(|_| ChainError::Encoding("too many arguments".into()))?;
        out.extend_from_slice(&argc.to_be_bytes());
        for arg in &self.args {
            arg.serialize_into(&mut out);
        }
        Ok(out)
    }

    /// Sign with `private_key`; the sender key is derived from it.
    pub fn sign(&self, private_key: &PrivateKey) -> Result<SignedTransaction, ChainError> {
        let body = self.encode_body(&public_from_private(private_key))?;
        let signature = sign_message(&sha512_256(&body), private_key);
        Ok(SignedTransaction { body, signature })
    }
}

impl SignedTransaction {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 64);
        out.extend_from_slice(&self.body);
        out.extend_from_slice(self.signature.as_bytes());
        out
    }

    /// Hex txid, `0x`-prefixed.
    pub fn txid(&self) -> String {
        format!("0x{}", hex::encode(sha512_256(&self.to_bytes())))
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The portion covered by the signature.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blaze_crypto::{keypair_from_seed, verify_signature};
    use blaze_types::Principal;

    fn call() -> ContractCall {
        let Principal::Contract { issuer, name } =
            Principal::parse("SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS.blaze-welsh-v0").unwrap()
        else {
            unreachable!()
        };
        ContractCall {
            network: NetworkId::Mainnet,
            nonce: 7,
            fee: 1800,
            contract_address: issuer,
            contract_name: name,
            function_name: "batch-transfer".into(),
            args: vec![ClarityValue::list(vec![ClarityValue::uint(1u8)])],
        }
    }

    #[test]
    fn body_layout() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let body = call().encode_body(&kp.public).unwrap();
        assert_eq!(body[0], 0x00);
        assert_eq!(&body[1..5], &[0, 0, 0, 1]);
        assert_eq!(&body[5..37], kp.public.as_bytes());
        assert_eq!(&body[37..45], &7u64.to_be_bytes());
        assert_eq!(&body[45..53], &1800u64.to_be_bytes());
        assert_eq!(body[53], 22);
        assert_eq!(body[74] as usize, "blaze-welsh-v0".len());
    }

    #[test]
    fn signature_covers_body() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let tx = call().sign(&kp.private).unwrap();
        assert!(verify_signature(&sha512_256(tx.body()), tx.signature(), &kp.public));
        assert_eq!(tx.to_bytes().len(), tx.body().len() + 64);
    }

    #[test]
    fn txid_changes_with_nonce() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let a = call().sign(&kp.private).unwrap();
        let mut next = call();
        next.nonce = 8;
        let b = next.sign(&kp.private).unwrap();
        assert_ne!(a.txid(), b.txid());
        assert_eq!(a.txid().len(), 2 + 64);
    }

    #[test]
    fn rejects_bad_function_name() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let mut bad = call();
        bad.function_name = String::new();
        assert!(matches!(bad.sign(&kp.private), Err(ChainError::Encoding(_))));
    }
}
