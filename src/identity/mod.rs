/// Identity Resolution System
///
/// Classifies raw caller input, resolves ENS names to addresses through the
/// upstream RPC endpoints, and caches successful resolutions.

pub mod cache;
pub mod resolver;
pub mod retry;
pub mod rpc;

pub use cache::NameCache;
pub use resolver::{IdentityResolver, NameResolver, UpstreamError, UpstreamErrorKind};
pub use retry::RetryPolicy;
pub use rpc::FallbackResolver;

use crate::error::{ProofError, ProofResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// 20-byte account address
///
/// Stored as raw bytes so two addresses differing only in hex case compare
/// equal. Displays and serializes as `0x` followed by 40 lowercase hex chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Canonical lowercase form
    pub fn to_canonical(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Parses exactly `0x` + 40 hex characters, in any case
impl FromStr for Address {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProofError::InvalidInput(format!("Invalid address: {}", s));

        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(invalid)?;
        if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| invalid())?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Where a resolved address came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    Ens,
    Address,
}

/// Classified caller input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Already an address, no lookup needed
    Address(Address),
    /// Candidate ENS name, validated only by resolving it
    Name(String),
}

impl Identifier {
    /// Classify raw input as an address or a resolvable name
    ///
    /// Input is trimmed first. Anything that is not a `0x` address and does
    /// not contain a `.` is rejected.
    pub fn classify(raw: &str) -> ProofResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProofError::InvalidInput(
                "ensOrAddress is required.".to_string(),
            ));
        }

        if is_address_literal(trimmed) {
            return trimmed.parse().map(Identifier::Address);
        }

        if trimmed.contains('.') {
            return Ok(Identifier::Name(trimmed.to_string()));
        }

        Err(ProofError::InvalidInput(
            "Input must be a valid 0x address or ENS name.".to_string(),
        ))
    }

    pub fn source(&self) -> InputSource {
        match self {
            Identifier::Address(_) => InputSource::Address,
            Identifier::Name(_) => InputSource::Ens,
        }
    }
}

/// `^0x[a-fA-F0-9]{40}$`
fn is_address_literal(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(digits) => digits.len() == 40 && digits.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_address_is_case_insensitive() {
        let upper = Identifier::classify("0x000000000000000000000000000000000000dEaD").unwrap();
        let lower = Identifier::classify("0x000000000000000000000000000000000000dead").unwrap();
        assert_eq!(upper, lower);

        match upper {
            Identifier::Address(addr) => {
                assert_eq!(addr.to_string(), "0x000000000000000000000000000000000000dead")
            }
            other => panic!("expected address, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_trims_whitespace() {
        let id = Identifier::classify("  vitalik.eth \n").unwrap();
        assert_eq!(id, Identifier::Name("vitalik.eth".to_string()));
        assert_eq!(id.source(), InputSource::Ens);
    }

    #[test]
    fn test_classify_rejects_empty_and_garbage() {
        for raw in ["", "   ", "not a valid anything", "0x1234", "hello"] {
            let err = Identifier::classify(raw).unwrap_err();
            assert_eq!(err.code(), "INVALID_INPUT", "input {:?}", raw);
        }
    }

    #[test]
    fn test_near_miss_address_with_dot_is_a_name() {
        // Not a valid address, but the dot makes it a resolution candidate
        let id = Identifier::classify("0x1234.eth").unwrap();
        assert_eq!(id, Identifier::Name("0x1234.eth".to_string()));
    }

    #[test]
    fn test_uppercase_prefix_is_not_an_address() {
        let err = Identifier::classify("0X000000000000000000000000000000000000dead").unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_address_serde_roundtrip_is_canonical() {
        let addr: Address = "0xABCDEFabcdefABCDEFabcdefABCDEFabcdefABCD".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0xabcdefabcdefabcdefabcdefabcdefabcdefabcd\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
