//! Network identifier.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::ParseError;

/// Identifies which Stacks network the service signs and broadcasts for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    Mainnet,
    /// The public test network.
    Testnet,
}

impl NetworkId {
    /// Chain id used in structured-data domains and transactions.
    pub fn chain_id(&self) -> u32 {
        match self {
            Self::Mainnet => 0x0000_0001,
            Self::Testnet => 0x8000_0000,
        }
    }

    /// Transaction version byte.
    pub fn transaction_version(&self) -> u8 {
        match self {
            Self::Mainnet => 0x00,
            Self::Testnet => 0x80,
        }
    }

    /// Address version for single-signature standard principals (`SP` / `ST`).
    pub fn address_version(&self) -> u8 {
        match self {
            Self::Mainnet => 22,
            Self::Testnet => 26,
        }
    }

    /// Default public API endpoint.
    pub fn default_api_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.mainnet.hiro.so",
            Self::Testnet => "https://api.testnet.hiro.so",
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl FromStr for NetworkId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Self::Mainnet),
            "testnet" | "test" => Ok(Self::Testnet),
            other => Err(ParseError::UnknownNetwork(other.to_string())),
        }
    }
}
