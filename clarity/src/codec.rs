//! Consensus serialization of Clarity values.
//!
//! Layout: one type-prefix byte followed by the payload. Integers are
//! 16-byte big-endian, lengths are 4-byte big-endian (names use a 1-byte
//! length), and tuple fields are written in sorted-name order.

use std::collections::BTreeMap;

use blaze_types::{ContractName, StandardPrincipal};

use crate::value::validate_name;
use crate::{ClarityError, ClarityValue};

/// Maximum nesting depth accepted by the decoder.
pub const MAX_DEPTH: usize = 32;

mod prefix {
    pub const INT: u8 = 0x00;
    pub const UINT: u8 = 0x01;
    pub const BUFFER: u8 = 0x02;
    pub const TRUE: u8 = 0x03;
    pub const FALSE: u8 = 0x04;
    pub const STANDARD_PRINCIPAL: u8 = 0x05;
    pub const CONTRACT_PRINCIPAL: u8 = 0x06;
    pub const RESPONSE_OK: u8 = 0x07;
    pub const RESPONSE_ERR: u8 = 0x08;
    pub const NONE: u8 = 0x09;
    pub const SOME: u8 = 0x0a;
    pub const LIST: u8 = 0x0b;
    pub const TUPLE: u8 = 0x0c;
    pub const STRING_ASCII: u8 = 0x0d;
    pub const STRING_UTF8: u8 = 0x0e;
}

impl ClarityValue {
    /// Serialize to consensus bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serialize_into(&mut out);
        out
    }

    /// Serialize to `0x`-prefixed hex, the form used by node read-only APIs.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.serialize()))
    }

    pub fn serialize_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Int(n) => {
                out.push(prefix::INT);
                out.extend_from_slice(&n.to_be_bytes());
            }
            Self::UInt(n) => {
                out.push(prefix::UINT);
                out.extend_from_slice(&n.to_be_bytes());
            }
            Self::Buffer(bytes) => {
                out.push(prefix::BUFFER);
                write_len_prefixed(out, bytes);
            }
            Self::Bool(true) => out.push(prefix::TRUE),
            Self::Bool(false) => out.push(prefix::FALSE),
            Self::StandardPrincipal(p) => {
                out.push(prefix::STANDARD_PRINCIPAL);
                write_standard(out, p);
            }
            Self::ContractPrincipal(p, name) => {
                out.push(prefix::CONTRACT_PRINCIPAL);
                write_standard(out, p);
                write_name(out, name.as_str());
            }
            Self::ResponseOk(v) => {
                out.push(prefix::RESPONSE_OK);
                v.serialize_into(out);
            }
            Self::ResponseErr(v) => {
                out.push(prefix::RESPONSE_ERR);
                v.serialize_into(out);
            }
            Self::OptionalNone => out.push(prefix::NONE),
            Self::OptionalSome(v) => {
                out.push(prefix::SOME);
                v.serialize_into(out);
            }
            Self::List(items) => {
                out.push(prefix::LIST);
                out.extend_from_slice(&(items.len() as u32).to_be_bytes());
                for item in items {
                    item.serialize_into(out);
                }
            }
            Self::Tuple(fields) => {
                out.push(prefix::TUPLE);
                out.extend_from_slice(&(fields.len() as u32).to_be_bytes());
                for (name, value) in fields {
                    write_name(out, name);
                    value.serialize_into(out);
                }
            }
            Self::StringAscii(s) => {
                out.push(prefix::STRING_ASCII);
                write_len_prefixed(out, s.as_bytes());
            }
            Self::StringUtf8(s) => {
                out.push(prefix::STRING_UTF8);
                write_len_prefixed(out, s.as_bytes());
            }
        }
    }
}

fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

fn write_standard(out: &mut Vec<u8>, p: &StandardPrincipal) {
    out.push(p.version());
    out.extend_from_slice(p.hash160());
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(name.len() as u8);
    out.extend_from_slice(name.as_bytes());
}

/// Decode exactly one value from `bytes`; trailing bytes are an error.
pub fn deserialize(bytes: &[u8]) -> Result<ClarityValue, ClarityError> {
    let mut reader = Reader { bytes, pos: 0 };
    let value = reader.value(0)?;
    let remaining = bytes.len() - reader.pos;
    if remaining != 0 {
        return Err(ClarityError::TrailingBytes(remaining));
    }
    Ok(value)
}

/// Decode a hex string (optional `0x` prefix).
pub fn deserialize_hex(s: &str) -> Result<ClarityValue, ClarityError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| ClarityError::InvalidHex(e.to_string()))?;
    deserialize(&bytes)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ClarityError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ClarityError::UnexpectedEof(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClarityError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, ClarityError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn array16(&mut self) -> Result<[u8; 16], ClarityError> {
        let mut out = [0u8; 16];
        out.copy_from_slice(self.take(16)?);
        Ok(out)
    }

    fn len_prefixed(&mut self) -> Result<&'a [u8], ClarityError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn standard(&mut self) -> Result<StandardPrincipal, ClarityError> {
        let version = self.u8()?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(self.take(20)?);
        Ok(StandardPrincipal::new(version, hash))
    }

    fn name(&mut self) -> Result<String, ClarityError> {
        let len = self.u8()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| ClarityError::InvalidUtf8)
    }

    fn value(&mut self, depth: usize) -> Result<ClarityValue, ClarityError> {
        if depth > MAX_DEPTH {
            return Err(ClarityError::DepthExceeded(MAX_DEPTH));
        }
        let type_prefix = self.u8()?;
        let value = match type_prefix {
            prefix::INT => ClarityValue::Int(i128::from_be_bytes(self.array16()?)),
            prefix::UINT => ClarityValue::UInt(u128::from_be_bytes(self.array16()?)),
            prefix::BUFFER => ClarityValue::Buffer(self.len_prefixed()?.to_vec()),
            prefix::TRUE => ClarityValue::Bool(true),
            prefix::FALSE => ClarityValue::Bool(false),
            prefix::STANDARD_PRINCIPAL => ClarityValue::StandardPrincipal(self.standard()?),
            prefix::CONTRACT_PRINCIPAL => {
                let issuer = self.standard()?;
                let name = ContractName::new(self.name()?)?;
                ClarityValue::ContractPrincipal(issuer, name)
            }
            prefix::RESPONSE_OK => ClarityValue::ResponseOk(Box::new(self.value(depth + 1)?)),
            prefix::RESPONSE_ERR => ClarityValue::ResponseErr(Box::new(self.value(depth + 1)?)),
            prefix::NONE => ClarityValue::OptionalNone,
            prefix::SOME => ClarityValue::OptionalSome(Box::new(self.value(depth + 1)?)),
            prefix::LIST => {
                let len = self.u32()? as usize;
                // Every element takes at least one byte.
                let mut items = Vec::with_capacity(len.min(self.bytes.len() - self.pos));
                for _ in 0..len {
                    items.push(self.value(depth + 1)?);
                }
                ClarityValue::List(items)
            }
            prefix::TUPLE => {
                let len = self.u32()? as usize;
                let mut fields = BTreeMap::new();
                for _ in 0..len {
                    let name = self.name()?;
                    validate_name(&name)?;
                    let value = self.value(depth + 1)?;
                    fields.insert(name, value);
                }
                ClarityValue::Tuple(fields)
            }
            prefix::STRING_ASCII => {
                let raw = self.len_prefixed()?;
                if !raw.is_ascii() {
                    return Err(ClarityError::NotAscii);
                }
                ClarityValue::StringAscii(String::from_utf8(raw.to_vec()).map_err(|_| ClarityError::NotAscii)?)
            }
            prefix::STRING_UTF8 => {
                let raw = self.len_prefixed()?;
                ClarityValue::StringUtf8(
                    String::from_utf8(raw.to_vec()).map_err(|_| ClarityError::InvalidUtf8)?,
                )
            }
            other => return Err(ClarityError::UnknownTypePrefix(other)),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_layout() {
        let bytes = ClarityValue::uint(1u8).serialize();
        assert_eq!(bytes.len(), 17);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[16], 0x01);
        assert!(bytes[1..16].iter().all(|b| *b == 0));
    }

    #[test]
    fn bool_layout() {
        assert_eq!(ClarityValue::bool(true).to_hex(), "0x03");
        assert_eq!(ClarityValue::bool(false).to_hex(), "0x04");
    }

    #[test]
    fn string_ascii_layout() {
        let v = ClarityValue::string_ascii("blaze").unwrap();
        assert_eq!(v.to_hex(), "0x0d00000005626c617a65");
    }

    #[test]
    fn standard_principal_layout() {
        let v = ClarityValue::principal_str("SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS").unwrap();
        assert_eq!(v.to_hex(), "0x0516bf584905755be35f11b96c2691fd9c3fc64f4b16");
    }

    #[test]
    fn contract_principal_layout() {
        let v = ClarityValue::principal_str(
            "SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS.blaze-welsh-v0",
        )
        .unwrap();
        let hex = v.to_hex();
        assert!(hex.starts_with("0x0616bf584905755be35f11b96c2691fd9c3fc64f4b160e"));
        assert!(hex.ends_with(&hex::encode("blaze-welsh-v0")));
    }

    #[test]
    fn tuple_fields_are_sorted() {
        let v = ClarityValue::tuple([
            ("to", ClarityValue::uint(2u8)),
            ("amount", ClarityValue::uint(1u8)),
        ])
        .unwrap();
        let bytes = v.serialize();
        assert_eq!(&bytes[..5], &[0x0c, 0, 0, 0, 2]);
        assert_eq!(bytes[5], 6);
        assert_eq!(&bytes[6..12], b"amount");
    }

    #[test]
    fn nested_value_decodes() {
        let v = ClarityValue::ok(ClarityValue::list(vec![
            ClarityValue::tuple([
                ("to", ClarityValue::principal_str("SP2D5BGGJ956A635JG7CJQ59FTRFRB0893514EZPJ").unwrap()),
                ("amount", ClarityValue::uint(1_000_000u64)),
                ("signature", ClarityValue::buffer(vec![1, 2, 3])),
            ])
            .unwrap(),
            ClarityValue::none(),
            ClarityValue::int(-5i64),
            ClarityValue::string_utf8("héllo"),
        ]));
        assert_eq!(deserialize(&v.serialize()).unwrap(), v);
        assert_eq!(deserialize_hex(&v.to_hex()).unwrap(), v);
    }

    #[test]
    fn truncated_input_is_eof() {
        let bytes = ClarityValue::uint(7u8).serialize();
        assert!(matches!(
            deserialize(&bytes[..10]),
            Err(ClarityError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = ClarityValue::bool(true).serialize();
        bytes.push(0);
        assert_eq!(deserialize(&bytes), Err(ClarityError::TrailingBytes(1)));
    }

    #[test]
    fn unknown_prefix_rejected() {
        assert_eq!(deserialize(&[0x42]), Err(ClarityError::UnknownTypePrefix(0x42)));
    }

    #[test]
    fn huge_list_length_does_not_preallocate() {
        let bytes = [0x0b, 0xff, 0xff, 0xff, 0xff];
        assert!(deserialize(&bytes).is_err());
    }

    #[test]
    fn depth_limit_enforced() {
        let mut bytes = vec![prefix::SOME; MAX_DEPTH + 2];
        bytes.push(prefix::TRUE);
        assert_eq!(
            deserialize(&bytes),
            Err(ClarityError::DepthExceeded(MAX_DEPTH))
        );
    }
}
