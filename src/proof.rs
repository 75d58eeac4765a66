/// Deterministic proof-of-usage derivation
///
/// A proof is a pure function of `(address, chain_id)`: the Keccak-256 hash of
/// a fixed payload string, a score taken from the hash modulo 101, and two tags
/// bucketed from the score and from the hash modulo 3. The payload format,
/// hash function, moduli and thresholds are part of the public contract:
/// changing any of them changes every proof ever issued.
use crate::{identity::rpc::keccak256, identity::Address, metrics};
use serde::{Deserialize, Serialize};

/// Proof policy version embedded in the payload and responses
pub const POLICY_VERSION: &str = "v1";

const PAYLOAD_PREFIX: &str = "ens-proof-of-usage";

/// Deterministic proof record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRecord {
    /// `0x`-prefixed Keccak-256 of the payload
    pub proof_hash: String,
    /// Hash modulo 101, in `0..=100`
    pub score: u8,
    /// `[usage tag, farming-risk tag]`
    pub tags: [String; 2],
}

/// `ens-proof-of-usage:v1:<chainId>:<normalizedAddress>`
pub fn build_payload(address: &Address, chain_id: &str) -> String {
    format!(
        "{}:{}:{}:{}",
        PAYLOAD_PREFIX,
        POLICY_VERSION,
        chain_id,
        address.to_canonical()
    )
}

/// Generate the proof for an address on a chain
pub fn generate_proof(address: &Address, chain_id: &str) -> ProofRecord {
    let payload = build_payload(address, chain_id);
    let hash = keccak256(payload.as_bytes());

    let score = mod_be(&hash, 101) as u8;
    let risk_bucket = mod_be(&hash, 3);

    metrics::record_proof_generated();

    ProofRecord {
        proof_hash: format!("0x{}", hex::encode(hash)),
        score,
        tags: [usage_tag(score).to_string(), risk_tag(risk_bucket).to_string()],
    }
}

fn usage_tag(score: u8) -> &'static str {
    if score >= 70 {
        "usage:high"
    } else if score >= 40 {
        "usage:medium"
    } else {
        "usage:low"
    }
}

fn risk_tag(bucket: u32) -> &'static str {
    match bucket {
        0 => "farming-risk:low",
        1 => "farming-risk:med",
        _ => "farming-risk:high",
    }
}

/// Big-endian byte string taken as an unsigned integer, modulo `m`
fn mod_be(bytes: &[u8], m: u32) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, &b| ((acc << 8) | b as u32) % m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn test_known_vector_dead_mainnet() {
        let address = addr("0x000000000000000000000000000000000000dEaD");
        assert_eq!(
            build_payload(&address, "1"),
            "ens-proof-of-usage:v1:1:0x000000000000000000000000000000000000dead"
        );

        let proof = generate_proof(&address, "1");
        assert_eq!(
            proof.proof_hash,
            "0xcb2e22be9e6680345098bb96bae57fab9b12f5605e2360470cac9b1876b4eb19"
        );
        assert_eq!(proof.score, 1);
        assert_eq!(proof.tags, ["usage:low", "farming-risk:high"]);
    }

    #[test]
    fn test_known_vectors_cover_every_bucket() {
        let dead = addr("0x000000000000000000000000000000000000dead");

        // (chain id, hash, score, usage, risk)
        let cases = [
            (
                "10",
                "0x6cd51c962ffddd0858e55f6cc9d36c383b0ac6274874cb4490507a7695f5ea6f",
                43,
                "usage:medium",
                "farming-risk:low",
            ),
            (
                "137",
                "0x7b7a58bda4e273efa36bfe477a8524d1a8ddb5c564714b7b8c7c78600a1bc7dc",
                80,
                "usage:high",
                "farming-risk:high",
            ),
            (
                "8453",
                "0xcf6048da20d3e78dabe8d3f39e43e519a07e40e45c2cae0e9db9ab391fbe320a",
                29,
                "usage:low",
                "farming-risk:med",
            ),
        ];

        for (chain_id, hash, score, usage, risk) in cases {
            let proof = generate_proof(&dead, chain_id);
            assert_eq!(proof.proof_hash, hash, "chain {}", chain_id);
            assert_eq!(proof.score, score, "chain {}", chain_id);
            assert_eq!(proof.tags, [usage, risk], "chain {}", chain_id);
        }
    }

    #[test]
    fn test_deterministic_and_case_insensitive() {
        let mixed = addr("0xAbCDEFabcdefABCDEFabcdefABCDEFabcdefABCD");
        let lower = addr("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd");

        let first = generate_proof(&mixed, "1");
        let second = generate_proof(&mixed, "1");
        let third = generate_proof(&lower, "1");

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(
            first.proof_hash,
            "0xf88e3c6d72ee6005ed0deb00e4669dc7237e1ad531c2608ee43c755740033688"
        );
        assert_eq!(first.score, 38);
        assert_eq!(first.tags, ["usage:low", "farming-risk:low"]);
    }

    #[test]
    fn test_chain_id_changes_proof() {
        let dead = addr("0x000000000000000000000000000000000000dead");
        assert_ne!(
            generate_proof(&dead, "1").proof_hash,
            generate_proof(&dead, "137").proof_hash
        );
    }

    #[test]
    fn test_tag_thresholds() {
        assert_eq!(usage_tag(0), "usage:low");
        assert_eq!(usage_tag(39), "usage:low");
        assert_eq!(usage_tag(40), "usage:medium");
        assert_eq!(usage_tag(69), "usage:medium");
        assert_eq!(usage_tag(70), "usage:high");
        assert_eq!(usage_tag(100), "usage:high");
    }

    #[test]
    fn test_mod_be_matches_integer_arithmetic() {
        // 0x0102 = 258
        assert_eq!(mod_be(&[0x01, 0x02], 101), 258 % 101);
        assert_eq!(mod_be(&[0xff; 8], 3), (u64::MAX % 3) as u32);
        assert_eq!(mod_be(&[0xff; 8], 101), (u64::MAX % 101) as u32);
    }

    #[test]
    fn test_serializes_camel_case() {
        let proof = generate_proof(&addr("0x000000000000000000000000000000000000dead"), "1");
        let json = serde_json::to_value(&proof).unwrap();
        assert_eq!(json["score"], 1);
        assert_eq!(json["tags"][1], "farming-risk:high");
        assert!(json["proofHash"].as_str().unwrap().starts_with("0xcb2e22be"));
    }
}
