use std::{fmt, str::FromStr};

use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

pub const ACCOUNT_LEN: usize = 20;

/// Reserved "no account" marker; the source of issuance events.
pub const NULL_ACCOUNT: Account = Account([0u8; ACCOUNT_LEN]);

/// Opaque fixed-width account address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Account([u8; ACCOUNT_LEN]);

impl Account {
    pub const fn new(bytes: [u8; ACCOUNT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_LEN] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        *self == NULL_ACCOUNT
    }
}

impl From<[u8; ACCOUNT_LEN]> for Account {
    fn from(bytes: [u8; ACCOUNT_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Account {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let mut bytes = [0u8; ACCOUNT_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| ParseError::InvalidAccount(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Account {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_prefix() {
        let a: Account = "0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        let b: Account = "f39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("0x1234".parse::<Account>().is_err());
        assert!("0xzz9fd6e51aad88f6f4ce6ab8827279cfffb92266".parse::<Account>().is_err());
    }

    #[test]
    fn null_account_is_all_zero() {
        let parsed: Account = "0x0000000000000000000000000000000000000000".parse().unwrap();
        assert!(parsed.is_null());
        assert!(!Account::new([1u8; ACCOUNT_LEN]).is_null());
    }

    #[test]
    fn serde_uses_hex_string() {
        let account = Account::new([0xab; ACCOUNT_LEN]);
        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(ACCOUNT_LEN)));
        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(back, account);
    }
}
