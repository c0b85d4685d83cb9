//! Crockford-style base32 ("c32") and c32check encoding used by Stacks addresses.
//!
//! Alphabet: `0123456789ABCDEFGHJKMNPQRSTVWXYZ` (no I, L, O, U).
//! c32check appends the first 4 bytes of `sha256(sha256(version || data))`
//! before encoding and prefixes the result with the version character.

use sha2::{Digest, Sha256};

use crate::ParseError;

/// c32 alphabet (32 chars, avoids visually ambiguous I/L/O/U).
pub const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Reverse lookup table: ASCII byte → 5-bit value (0xFF = invalid).
const C32_DECODE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let alpha = C32_ALPHABET;
    let mut i = 0;
    while i < 32 {
        table[alpha[i] as usize] = i as u8;
        // Lowercase input decodes to the same value.
        if alpha[i].is_ascii_uppercase() {
            table[alpha[i].to_ascii_lowercase() as usize] = i as u8;
        }
        i += 1;
    }
    table
};

const CHECKSUM_LEN: usize = 4;

/// Encode bytes as c32. Leading zero bytes become leading `0` characters.
pub fn c32_encode(bytes: &[u8]) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len() * 8 / 5 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;

    for &byte in bytes.iter().rev() {
        let take = 5 - carry_bits;
        let low = (byte as u16) & ((1 << take) - 1);
        out.push(C32_ALPHABET[((low << carry_bits) + carry) as usize]);
        carry_bits = 8 + carry_bits - 5;
        carry = (byte as u16) >> (8 - carry_bits);
        if carry_bits >= 5 {
            out.push(C32_ALPHABET[(carry & 0x1F) as usize]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }
    if carry_bits > 0 {
        out.push(C32_ALPHABET[carry as usize]);
    }

    // Strip the zero digits produced by padding, then re-add one per zero input byte.
    while out.last() == Some(&C32_ALPHABET[0]) {
        out.pop();
    }
    for &byte in bytes {
        if byte != 0 {
            break;
        }
        out.push(C32_ALPHABET[0]);
    }

    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Decode a c32 string into bytes.
pub fn c32_decode(input: &str) -> Result<Vec<u8>, ParseError> {
    let mut digits = Vec::with_capacity(input.len());
    for c in input.chars().rev() {
        let value = if c.is_ascii() {
            C32_DECODE[c as usize]
        } else {
            0xFF
        };
        if value == 0xFF {
            return Err(ParseError::InvalidC32Char(c));
        }
        digits.push(value);
    }

    let mut out = Vec::with_capacity(input.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;
    for &digit in &digits {
        carry += (digit as u16) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            out.push((carry & 0xFF) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }
    if carry_bits > 0 {
        out.push(carry as u8);
    }

    while out.last() == Some(&0) {
        out.pop();
    }
    for &digit in digits.iter().rev() {
        if digit != 0 {
            break;
        }
        out.push(0);
    }

    out.reverse();
    Ok(out)
}

fn checksum(version: u8, data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let first = Sha256::new().chain_update([version]).chain_update(data).finalize();
    let second = Sha256::digest(first);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&second[..CHECKSUM_LEN]);
    out
}

/// c32check-encode `data` under a 5-bit `version`.
///
/// # Panics
/// Panics if `version >= 32`.
pub fn c32check_encode(version: u8, data: &[u8]) -> String {
    assert!(version < 32, "c32check version must fit in 5 bits");
    let mut payload = data.to_vec();
    payload.extend_from_slice(&checksum(version, data));
    let mut out = String::with_capacity(payload.len() * 8 / 5 + 2);
    out.push(C32_ALPHABET[version as usize] as char);
    out.push_str(&c32_encode(&payload));
    out
}

/// Decode a c32check string into `(version, data)`, verifying the checksum.
pub fn c32check_decode(input: &str) -> Result<(u8, Vec<u8>), ParseError> {
    let mut chars = input.chars();
    let version_char = chars
        .next()
        .ok_or_else(|| ParseError::InvalidPrincipal(input.to_string()))?;
    let version = if version_char.is_ascii() {
        C32_DECODE[version_char as usize]
    } else {
        0xFF
    };
    if version == 0xFF {
        return Err(ParseError::InvalidC32Char(version_char));
    }

    let decoded = c32_decode(chars.as_str())?;
    if decoded.len() < CHECKSUM_LEN {
        return Err(ParseError::InvalidLength {
            expected: CHECKSUM_LEN,
            actual: decoded.len(),
        });
    }
    let (data, sum) = decoded.split_at(decoded.len() - CHECKSUM_LEN);
    if sum != checksum(version, data) {
        return Err(ParseError::ChecksumMismatch);
    }
    Ok((version, data.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF, 0x42];
        let encoded = c32_encode(&data);
        assert_eq!(c32_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn leading_zero_bytes_preserved() {
        let data = [0u8, 0, 1, 2];
        let encoded = c32_encode(&data);
        assert!(encoded.starts_with("00"));
        assert_eq!(c32_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn zero_hash_matches_known_burn_address() {
        assert_eq!(c32check_encode(22, &[0u8; 20]), "P000000000000000000002Q6VF78");
        assert_eq!(c32check_encode(26, &[0u8; 20]), "T000000000000000000002AMW42H");
    }

    #[test]
    fn decodes_mainnet_address_body() {
        let (version, data) = c32check_decode("P2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS").unwrap();
        assert_eq!(version, 22);
        assert_eq!(hex::encode(data), "bf584905755be35f11b96c2691fd9c3fc64f4b16");
    }

    #[test]
    fn checksum_mismatch_detected() {
        let err = c32check_decode("P2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KT").unwrap_err();
        assert_eq!(err, ParseError::ChecksumMismatch);
    }

    #[test]
    fn invalid_character_rejected() {
        assert!(matches!(
            c32_decode("ABCO"),
            Err(ParseError::InvalidC32Char('O'))
        ));
    }

    #[test]
    fn lowercase_accepted() {
        let (version, _) = c32check_decode("p2zngj85endy6qrhq5p2d4fxkgzwcktb2t0z55ks").unwrap();
        assert_eq!(version, 22);
    }
}
