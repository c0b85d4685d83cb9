//! The Clarity value model.

use std::collections::BTreeMap;
use std::fmt;

use blaze_types::{ContractName, Principal, StandardPrincipal};

use crate::ClarityError;

/// A Clarity value.
///
/// Tuples keep their fields in a `BTreeMap` so iteration (and therefore
/// serialization) follows the canonical sorted-name order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClarityValue {
    Int(i128),
    UInt(u128),
    Buffer(Vec<u8>),
    Bool(bool),
    StandardPrincipal(StandardPrincipal),
    ContractPrincipal(StandardPrincipal, ContractName),
    ResponseOk(Box<ClarityValue>),
    ResponseErr(Box<ClarityValue>),
    OptionalNone,
    OptionalSome(Box<ClarityValue>),
    List(Vec<ClarityValue>),
    Tuple(BTreeMap<String, ClarityValue>),
    StringAscii(String),
    StringUtf8(String),
}

/// Tuple field names follow the Clarity name grammar.
pub(crate) fn validate_name(name: &str) -> Result<(), ClarityError> {
    let mut chars = name.chars();
    let head_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || "-_!?+<>=/*".contains(c));
    if head_ok && tail_ok && name.len() <= 128 {
        Ok(())
    } else {
        Err(ClarityError::InvalidName(name.to_string()))
    }
}

impl ClarityValue {
    pub fn uint(value: impl Into<u128>) -> Self {
        Self::UInt(value.into())
    }

    pub fn int(value: impl Into<i128>) -> Self {
        Self::Int(value.into())
    }

    pub fn bool(value: bool) -> Self {
        Self::Bool(value)
    }

    pub fn buffer(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Buffer(bytes.into())
    }

    /// Buffer from a hex string; a leading `0x` is stripped.
    pub fn buffer_from_hex(s: &str) -> Result<Self, ClarityError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(s)
            .map(Self::Buffer)
            .map_err(|e| ClarityError::InvalidHex(e.to_string()))
    }

    pub fn principal(principal: &Principal) -> Self {
        match principal {
            Principal::Standard(p) => Self::StandardPrincipal(*p),
            Principal::Contract { issuer, name } => Self::ContractPrincipal(*issuer, name.clone()),
        }
    }

    /// Principal from its string form.
    pub fn principal_str(s: &str) -> Result<Self, ClarityError> {
        Ok(Self::principal(&Principal::parse(s)?))
    }

    pub fn string_ascii(s: &str) -> Result<Self, ClarityError> {
        if !s.is_ascii() {
            return Err(ClarityError::NotAscii);
        }
        Ok(Self::StringAscii(s.to_string()))
    }

    pub fn string_utf8(s: &str) -> Self {
        Self::StringUtf8(s.to_string())
    }

    pub fn some(value: ClarityValue) -> Self {
        Self::OptionalSome(Box::new(value))
    }

    pub fn none() -> Self {
        Self::OptionalNone
    }

    pub fn ok(value: ClarityValue) -> Self {
        Self::ResponseOk(Box::new(value))
    }

    pub fn err(value: ClarityValue) -> Self {
        Self::ResponseErr(Box::new(value))
    }

    pub fn list(items: Vec<ClarityValue>) -> Self {
        Self::List(items)
    }

    /// Build a tuple; field names are validated.
    pub fn tuple<K, I>(fields: I) -> Result<Self, ClarityError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ClarityValue)>,
    {
        let mut map = BTreeMap::new();
        for (name, value) in fields {
            let name = name.into();
            validate_name(&name)?;
            map.insert(name, value);
        }
        Ok(Self::Tuple(map))
    }

    /// `true` only for the boolean `true`, including when wrapped in `(ok ..)`.
    pub fn is_true(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::ResponseOk(inner) => inner.is_true(),
            _ => false,
        }
    }

    /// Recover a principal value as a [`Principal`].
    pub fn as_principal(&self) -> Option<Principal> {
        match self {
            Self::StandardPrincipal(p) => Some(Principal::Standard(*p)),
            Self::ContractPrincipal(issuer, name) => {
                Some(Principal::contract(*issuer, name.clone()))
            }
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Self::UInt(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&[u8]> {
        match self {
            Self::Buffer(b) => Some(b),
            _ => None,
        }
    }

    pub fn tuple_field(&self, name: &str) -> Option<&ClarityValue> {
        match self {
            Self::Tuple(map) => map.get(name),
            _ => None,
        }
    }
}

impl fmt::Display for ClarityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::UInt(n) => write!(f, "u{n}"),
            Self::Buffer(b) => write!(f, "0x{}", hex::encode(b)),
            Self::Bool(b) => write!(f, "{b}"),
            Self::StandardPrincipal(p) => write!(f, "'{p}"),
            Self::ContractPrincipal(p, name) => write!(f, "'{p}.{name}"),
            Self::ResponseOk(v) => write!(f, "(ok {v})"),
            Self::ResponseErr(v) => write!(f, "(err {v})"),
            Self::OptionalNone => write!(f, "none"),
            Self::OptionalSome(v) => write!(f, "(some {v})"),
            Self::List(items) => {
                write!(f, "(list")?;
                for item in items {
                    write!(f, " {item}")?;
                }
                write!(f, ")")
            }
            Self::Tuple(map) => {
                write!(f, "{{")?;
                for (i, (name, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
            Self::StringAscii(s) => write!(f, "{s:?}"),
            Self::StringUtf8(s) => write!(f, "u{s:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_rejects_bad_names() {
        assert!(ClarityValue::tuple([("9lives", ClarityValue::uint(1u8))]).is_err());
        assert!(ClarityValue::tuple([("chain-id", ClarityValue::uint(1u8))]).is_ok());
    }

    #[test]
    fn is_true_sees_through_ok() {
        assert!(ClarityValue::bool(true).is_true());
        assert!(ClarityValue::ok(ClarityValue::bool(true)).is_true());
        assert!(!ClarityValue::err(ClarityValue::bool(true)).is_true());
        assert!(!ClarityValue::uint(1u8).is_true());
    }

    #[test]
    fn buffer_from_hex_strips_prefix() {
        assert_eq!(
            ClarityValue::buffer_from_hex("0x1234").unwrap(),
            ClarityValue::Buffer(vec![0x12, 0x34])
        );
        assert!(ClarityValue::buffer_from_hex("0xzz").is_err());
    }

    #[test]
    fn display_is_readable() {
        let v = ClarityValue::tuple([
            ("amount", ClarityValue::uint(5u8)),
            ("memo", ClarityValue::some(ClarityValue::string_utf8("hi"))),
        ])
        .unwrap();
        assert_eq!(v.to_string(), "{amount: u5, memo: (some u\"hi\")}");
    }
}
