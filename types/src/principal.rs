//! Stacks-style principals: standard accounts and contracts.
//!
//! A standard principal is `S` + c32check(version, hash160), e.g.
//! `SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS`. A contract principal appends
//! `.<contract-name>` to its deployer's standard principal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::c32::{c32check_decode, c32check_encode};
use crate::ParseError;

/// Maximum length of a contract name.
pub const MAX_CONTRACT_NAME_LEN: usize = 128;

/// A standard (account) principal: address version + 20-byte hash160.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StandardPrincipal {
    version: u8,
    hash160: [u8; 20],
}

impl StandardPrincipal {
    pub fn new(version: u8, hash160: [u8; 20]) -> Self {
        Self { version, hash160 }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn hash160(&self) -> &[u8; 20] {
        &self.hash160
    }

    fn parse(s: &str) -> Result<Self, ParseError> {
        let body = s
            .strip_prefix('S')
            .ok_or_else(|| ParseError::InvalidPrincipal(s.to_string()))?;
        let (version, data) = c32check_decode(body)?;
        let hash160: [u8; 20] = data.as_slice().try_into().map_err(|_| ParseError::InvalidLength {
            expected: 20,
            actual: data.len(),
        })?;
        Ok(Self { version, hash160 })
    }
}

impl fmt::Display for StandardPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", c32check_encode(self.version, &self.hash160))
    }
}

/// A validated contract name (`[a-zA-Z][a-zA-Z0-9_-]*`, at most 128 chars).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractName(String);

impl ContractName {
    pub fn new(raw: impl Into<String>) -> Result<Self, ParseError> {
        let raw = raw.into();
        let mut chars = raw.chars();
        let valid_head = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_head || !valid_tail || raw.len() > MAX_CONTRACT_NAME_LEN {
            return Err(ParseError::InvalidContractName(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A principal: either a standard account or a deployed contract.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Principal {
    Standard(StandardPrincipal),
    Contract {
        issuer: StandardPrincipal,
        name: ContractName,
    },
}

impl Principal {
    /// Parse and checksum-validate a principal string.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s.split_once('.') {
            Some((issuer, name)) => Ok(Self::Contract {
                issuer: StandardPrincipal::parse(issuer)?,
                name: ContractName::new(name)?,
            }),
            None => Ok(Self::Standard(StandardPrincipal::parse(s)?)),
        }
    }

    /// Build a contract principal from a deployer and name.
    pub fn contract(issuer: StandardPrincipal, name: ContractName) -> Self {
        Self::Contract { issuer, name }
    }

    pub fn is_contract(&self) -> bool {
        matches!(self, Self::Contract { .. })
    }

    /// The standard principal that owns this principal (itself, or the contract deployer).
    pub fn issuer(&self) -> &StandardPrincipal {
        match self {
            Self::Standard(p) => p,
            Self::Contract { issuer, .. } => issuer,
        }
    }

    /// Split a contract principal into `(deployer address, contract name)` strings.
    pub fn contract_parts(&self) -> Option<(String, &str)> {
        match self {
            Self::Standard(_) => None,
            Self::Contract { issuer, name } => Some((issuer.to_string(), name.as_str())),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard(p) => write!(f, "{p}"),
            Self::Contract { issuer, name } => write!(f, "{issuer}.{name}"),
        }
    }
}

impl FromStr for Principal {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Principal {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.to_string()
    }
}

impl From<StandardPrincipal> for Principal {
    fn from(p: StandardPrincipal) -> Self {
        Self::Standard(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENDER: &str = "SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS";
    const TOKEN: &str = "SP3NE50GEXFG9SZGTT51P40X2CKYSZ5CC4ZTZ7A2G.welshcorgicoin-token";

    #[test]
    fn standard_roundtrip() {
        let p = Principal::parse(SENDER).unwrap();
        assert!(!p.is_contract());
        assert_eq!(p.issuer().version(), 22);
        assert_eq!(p.to_string(), SENDER);
    }

    #[test]
    fn contract_roundtrip() {
        let p = Principal::parse(TOKEN).unwrap();
        assert!(p.is_contract());
        let (address, name) = p.contract_parts().unwrap();
        assert_eq!(address, "SP3NE50GEXFG9SZGTT51P40X2CKYSZ5CC4ZTZ7A2G");
        assert_eq!(name, "welshcorgicoin-token");
        assert_eq!(p.to_string(), TOKEN);
    }

    #[test]
    fn missing_prefix_rejected() {
        assert!(Principal::parse("XP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS").is_err());
        assert!(Principal::parse("").is_err());
    }

    #[test]
    fn bad_contract_name_rejected() {
        let bad = format!("{SENDER}.1token");
        assert!(matches!(
            Principal::parse(&bad),
            Err(ParseError::InvalidContractName(_))
        ));
        assert!(ContractName::new("").is_err());
        assert!(ContractName::new("a".repeat(129)).is_err());
    }

    #[test]
    fn serde_uses_string_form() {
        let p = Principal::parse(TOKEN).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, format!("\"{TOKEN}\""));
        let back: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
        assert!(serde_json::from_str::<Principal>("\"SPnotreal\"").is_err());
    }
}
