//! 20-byte account addresses

use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::keccak256;
use crate::types::XyraError;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Address controlled by a secp256k1 public key
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        // Skip the 0x04 uncompressed marker
        let hash = keccak256(&point.as_bytes()[1..]);
        let mut out = [0u8; 20];
        out.copy_from_slice(&hash[12..]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 mixed-case checksum form
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = XyraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // XDC tooling also prints addresses with an `xdc` prefix
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("xdc"))
            .unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| XyraError::Validation(format!("invalid address {}: {}", s, e)))?;
        if bytes.len() != 20 {
            return Err(XyraError::Validation(format!(
                "invalid address {}: expected 20 bytes, got {}",
                s,
                bytes.len()
            )));
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `0x1234...abcd` form used in navigation and profile views
pub fn shorten_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    #[test]
    fn test_address_from_known_key() {
        let key = hex::decode("4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318")
            .unwrap();
        let signing = SigningKey::from_slice(&key).unwrap();
        let address = Address::from_verifying_key(signing.verifying_key());
        assert_eq!(
            address.to_checksum(),
            "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"
        );
    }

    #[test]
    fn test_parse_accepts_xdc_prefix() {
        let a: Address = "xdc742d35Cc6634C0532925a3b844Bc454e4438f44e".parse().unwrap();
        let b: Address = "0x742d35cc6634c0532925a3b844bc454e4438f44e".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not-hex".parse::<Address>().is_err());
    }

    #[test]
    fn test_shorten_address() {
        assert_eq!(
            shorten_address("0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"),
            "0x2c75...5c23"
        );
        assert_eq!(shorten_address("0x12"), "0x12");
    }
}
