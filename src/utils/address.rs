//! Account identifiers and hashes.
//!
//! Accounts are 20-byte addresses. Simulator accounts are derived from a
//! human-readable label so that scripts and tests can refer to them by name.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{Error, Result};

/// Address length in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Hash length in bytes
pub const HASH_LENGTH: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// HASH
// ═══════════════════════════════════════════════════════════════════════════════

/// A 32-byte SHA-256 digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash([u8; HASH_LENGTH]);

impl Hash {
    /// Create from raw bytes
    pub const fn new(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// SHA-256 of the input
    pub fn sha256(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut bytes = [0u8; HASH_LENGTH];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The zero address
    pub const ZERO: Self = Self([0u8; ADDRESS_LENGTH]);

    /// Create from raw bytes
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Deterministic address for a label: the first 20 bytes of `sha256(label)`
    pub fn from_label(label: &str) -> Self {
        let digest = Hash::sha256(label.as_bytes());
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_LENGTH]);
        Self(bytes)
    }

    /// Parse `0x`-prefixed or bare hex
    pub fn from_hex(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| Error::InvalidParameter {
            name: "address".into(),
            reason: e.to_string(),
        })?;
        if bytes.len() != ADDRESS_LENGTH {
            return Err(Error::InvalidParameter {
                name: "address".into(),
                reason: format!("expected {} bytes, got {}", ADDRESS_LENGTH, bytes.len()),
            });
        }
        let mut out = [0u8; ADDRESS_LENGTH];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    /// Hex address if the input looks like one, otherwise the label-derived address
    pub fn parse(s: &str) -> Self {
        Self::from_hex(s).unwrap_or_else(|_| Self::from_label(s))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Short form used in logs
    pub fn short(&self) -> String {
        format!("0x{}…", hex::encode(&self.0[..4]))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SYSTEM ADDRESSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed addresses of the protocol's own components
pub mod system {
    use super::Address;

    /// mShare ledger
    pub fn m_share() -> Address {
        Address::from_label("stablecash:mShare")
    }

    /// bShare ledger
    pub fn b_share() -> Address {
        Address::from_label("stablecash:bShare")
    }

    /// mToken scaled view
    pub fn m_token() -> Address {
        Address::from_label("stablecash:mToken")
    }

    /// bToken scaled view
    pub fn b_token() -> Address {
        Address::from_label("stablecash:bToken")
    }

    /// Orchestrator
    pub fn orchestrator() -> Address {
        Address::from_label("stablecash:orchestrator")
    }

    /// Auction house, which also escrows bids
    pub fn auction_house() -> Address {
        Address::from_label("stablecash:auctionHouse")
    }

    /// Exchange facade
    pub fn exchange() -> Address {
        Address::from_label("stablecash:exchange")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_deterministic() {
        assert_eq!(Address::from_label("alice"), Address::from_label("alice"));
        assert_ne!(Address::from_label("alice"), Address::from_label("bob"));
    }

    #[test]
    fn test_hex_roundtrip() {
        let addr = Address::from_label("alice");
        assert_eq!(Address::from_hex(&addr.to_hex()).unwrap(), addr);
        assert!(Address::from_hex("0x1234").is_err());
        assert!(Address::from_hex("not hex").is_err());
    }

    #[test]
    fn test_parse_falls_back_to_label() {
        let addr = Address::from_label("carol");
        assert_eq!(Address::parse("carol"), addr);
        assert_eq!(Address::parse(&addr.to_hex()), addr);
    }

    #[test]
    fn test_serde_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(Address::from_label("alice"), 5u64);
        let json = serde_json::to_string(&map).unwrap();
        let back: std::collections::BTreeMap<Address, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_system_addresses_distinct() {
        let all = [
            system::m_share(),
            system::b_share(),
            system::m_token(),
            system::b_token(),
            system::orchestrator(),
            system::auction_house(),
            system::exchange(),
        ];
        let mut sorted = all.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), all.len());
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            Hash::sha256(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
