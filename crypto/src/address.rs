//! Principal derivation from public keys.
//!
//! The account hash is Blake2b-160 of the public key; the principal is that
//! hash c32check-encoded under the network's single-signature version
//! (`SP...` on mainnet, `ST...` on testnet).

use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest};
use blaze_types::{NetworkId, Principal, PublicKey, StandardPrincipal};

type Blake2b160 = Blake2b<U20>;

/// Compute the 20-byte account hash of a public key.
pub fn hash160(public_key: &PublicKey) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&Blake2b160::digest(public_key.as_bytes()));
    out
}

/// Derive the standard principal controlled by `public_key` on `network`.
pub fn derive_principal(public_key: &PublicKey, network: NetworkId) -> Principal {
    Principal::Standard(StandardPrincipal::new(
        network.address_version(),
        hash160(public_key),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    #[test]
    fn derive_is_deterministic() {
        let kp = keypair_from_seed(&[7u8; 32]);
        let a1 = derive_principal(&kp.public, NetworkId::Mainnet);
        let a2 = derive_principal(&kp.public, NetworkId::Mainnet);
        assert_eq!(a1, a2);
    }

    #[test]
    fn network_prefixes() {
        let kp = keypair_from_seed(&[7u8; 32]);
        assert!(derive_principal(&kp.public, NetworkId::Mainnet)
            .to_string()
            .starts_with("SP"));
        assert!(derive_principal(&kp.public, NetworkId::Testnet)
            .to_string()
            .starts_with("ST"));
    }

    #[test]
    fn derived_principal_parses_back() {
        let kp = keypair_from_seed(&[8u8; 32]);
        let p = derive_principal(&kp.public, NetworkId::Mainnet);
        assert_eq!(Principal::parse(&p.to_string()).unwrap(), p);
    }

    #[test]
    fn different_keys_different_principals() {
        let k1 = keypair_from_seed(&[1u8; 32]);
        let k2 = keypair_from_seed(&[2u8; 32]);
        assert_ne!(
            derive_principal(&k1.public, NetworkId::Mainnet),
            derive_principal(&k2.public, NetworkId::Mainnet)
        );
    }
}
