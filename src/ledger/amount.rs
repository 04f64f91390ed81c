use std::{fmt, str::FromStr};

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::error::ParseError;

pub const AMOUNT_BITS: u64 = 256;

/// Non-negative 256-bit quantity of ledger units.
///
/// Arithmetic is checked: results above `2^256 - 1` or below zero are
/// reported as `None` instead of wrapping.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigUint);

impl Amount {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn max_value() -> Self {
        Self((BigUint::one() << AMOUNT_BITS as usize) - 1u32)
    }

    /// Wraps `value` if it fits in 256 bits.
    pub fn from_biguint(value: BigUint) -> Option<Self> {
        (value.bits() <= AMOUNT_BITS).then_some(Self(value))
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        Self::from_biguint(&self.0 + &other.0)
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.0 < other.0 {
            return None;
        }
        Some(Self(&self.0 - &other.0))
    }

    /// Big-endian, left-padded to 32 bytes.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let raw = self.0.to_bytes_be();
        let mut out = [0u8; 32];
        out[32 - raw.len()..].copy_from_slice(&raw);
        out
    }

    /// Scales a decimal string such as `"1.5"` by `10^decimals`.
    pub fn parse_units(value: &str, decimals: u8) -> Result<Self, ParseError> {
        let trimmed = value.trim();
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !is_digits(whole) || !is_digits(frac) {
            return Err(ParseError::InvalidAmount(value.to_string()));
        }
        if frac.len() > decimals as usize {
            return Err(ParseError::TooManyDecimals(value.to_string(), decimals));
        }

        let mut digits = String::with_capacity(whole.len() + decimals as usize);
        digits.push_str(whole);
        digits.push_str(frac);
        digits.extend(std::iter::repeat_n('0', decimals as usize - frac.len()));

        let scaled = BigUint::parse_bytes(digits.as_bytes(), 10)
            .ok_or_else(|| ParseError::InvalidAmount(value.to_string()))?;
        Self::from_biguint(scaled).ok_or_else(|| ParseError::AmountOverflow(value.to_string()))
    }

    pub fn format_units(&self, decimals: u8) -> String {
        let base = BigUint::from(10u32).pow(decimals as u32);
        let whole = &self.0 / &base;
        let frac = &self.0 % &base;
        if frac.is_zero() {
            return whole.to_string();
        }
        let padded = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
        format!("{whole}.{}", padded.trim_end_matches('0'))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Amount {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidAmount(s.to_string()));
        }
        let value = BigUint::parse_bytes(trimmed.as_bytes(), 10)
            .ok_or_else(|| ParseError::InvalidAmount(s.to_string()))?;
        Self::from_biguint(value).ok_or_else(|| ParseError::AmountOverflow(s.to_string()))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal string or an unsigned integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }
}

// Strings carry the full 256-bit range; bare JSON integers are accepted for
// hand-written scripts.
impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}
