//! Token amounts in micro-units.
//!
//! Amounts are fixed-point integers (u128) to avoid floating-point errors.
//! One whole token is 10^6 micro-units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Number of micro-units in one whole token.
pub const MICRO_PER_TOKEN: u128 = 1_000_000;

/// A token amount in micro-units.
///
/// Serialized as a bare JSON number so stored records match what clients send.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MicroAmount(u128);

impl MicroAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(micro: u128) -> Self {
        Self(micro)
    }

    /// Build an amount from whole tokens.
    pub fn from_tokens(tokens: u128) -> Self {
        Self(tokens.saturating_mul(MICRO_PER_TOKEN))
    }

    pub fn micro(&self) -> u128 {
        self.0
    }

    /// Whole tokens, truncating the fractional part.
    pub fn whole_tokens(&self) -> u128 {
        self.0 / MICRO_PER_TOKEN
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for MicroAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for MicroAmount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl From<u128> for MicroAmount {
    fn from(micro: u128) -> Self {
        Self(micro)
    }
}

impl fmt::Display for MicroAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:06}",
            self.0 / MICRO_PER_TOKEN,
            self.0 % MICRO_PER_TOKEN
        )
    }
}
