//! Transport format for challenges and proofs.
//!
//! Big integers travel as hex strings so nothing is lost in JSON. Public
//! parameters are never part of a message.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::arith::{from_hex, to_hex};
use crate::challenge::{Challenge, ChallengeEntry};
use crate::error::{AuditError, Result};
use crate::proof::Proof;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeEntryMessage {
    pub block_index: u64,
    pub coefficient: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeMessage {
    pub file_id: String,
    pub entries: Vec<ChallengeEntryMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofMessage {
    pub file_id: String,
    pub commitment: String,
    pub mu: String,
    pub aggregated_tag: String,
    pub challenge_ref: String,
}

fn malformed(reason: impl Into<String>) -> AuditError {
    AuditError::MalformedProof(reason.into())
}

fn decode_hex(key: &str, text: &str) -> Result<BigUint> {
    from_hex(key, text).map_err(|e| malformed(e.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| malformed(e.to_string()))
}

fn from_json<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| malformed(e.to_string()))
}

impl ChallengeMessage {
    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        from_json(text)
    }
}

impl ProofMessage {
    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        from_json(text)
    }
}

impl From<&Challenge> for ChallengeMessage {
    fn from(challenge: &Challenge) -> Self {
        Self {
            file_id: challenge.file_id().to_string(),
            entries: challenge
                .entries()
                .iter()
                .map(|e| ChallengeEntryMessage {
                    block_index: e.block_index,
                    coefficient: to_hex(&e.coefficient),
                })
                .collect(),
        }
    }
}

impl TryFrom<&ChallengeMessage> for Challenge {
    type Error = AuditError;

    fn try_from(message: &ChallengeMessage) -> Result<Self> {
        if message.entries.is_empty() {
            return Err(malformed("challenge has no entries"));
        }
        let mut entries = Vec::with_capacity(message.entries.len());
        let mut previous: Option<u64> = None;
        for entry in &message.entries {
            if previous.is_some_and(|p| p >= entry.block_index) {
                return Err(malformed("challenge indices must be strictly increasing"));
            }
            previous = Some(entry.block_index);
            let coefficient = decode_hex("coefficient", &entry.coefficient)?;
            if coefficient.is_zero() {
                return Err(malformed(format!(
                    "zero coefficient for block {}",
                    entry.block_index
                )));
            }
            entries.push(ChallengeEntry {
                block_index: entry.block_index,
                coefficient,
            });
        }
        Ok(Challenge::from_parts(message.file_id.clone(), entries))
    }
}

impl From<&Proof> for ProofMessage {
    fn from(proof: &Proof) -> Self {
        Self {
            file_id: proof.file_id.clone(),
            commitment: to_hex(&proof.commitment),
            mu: to_hex(&proof.mu),
            aggregated_tag: to_hex(&proof.aggregated_tag),
            challenge_ref: proof.challenge_ref.clone(),
        }
    }
}

impl TryFrom<&ProofMessage> for Proof {
    type Error = AuditError;

    fn try_from(message: &ProofMessage) -> Result<Self> {
        Ok(Proof {
            file_id: message.file_id.clone(),
            challenge_ref: message.challenge_ref.clone(),
            commitment: decode_hex("commitment", &message.commitment)?,
            mu: decode_hex("mu", &message.mu)?,
            aggregated_tag: decode_hex("aggregatedTag", &message.aggregated_tag)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;
    use crate::challenge::build_challenge;
    use crate::params::testing::small_params;

    #[test]
    fn challenge_survives_json() {
        let params = small_params();
        let challenge = build_challenge(&params, "F1", &[0, 2, 5, 9], 3, &mut OsRng).unwrap();
        let json = ChallengeMessage::from(&challenge).to_json().unwrap();
        let decoded = Challenge::try_from(&ChallengeMessage::from_json(&json).unwrap()).unwrap();
        assert_eq!(decoded, challenge);
        assert_eq!(decoded.reference(), challenge.reference());
    }

    #[test]
    fn proof_field_names_are_camel_case() {
        let message = ProofMessage::from(&Proof {
            file_id: "F1".into(),
            challenge_ref: "ref".into(),
            commitment: BigUint::from(10u32),
            mu: BigUint::from(255u32),
            aggregated_tag: BigUint::from(16u32),
        });
        let json: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(json["fileId"], "F1");
        assert_eq!(json["commitment"], "a");
        assert_eq!(json["mu"], "ff");
        assert_eq!(json["aggregatedTag"], "10");
        assert_eq!(json["challengeRef"], "ref");
    }

    #[test]
    fn rejects_malformed_challenges() {
        let entry = |block_index, coefficient: &str| ChallengeEntryMessage {
            block_index,
            coefficient: coefficient.into(),
        };
        let cases = [
            vec![],
            vec![entry(1, "0")],
            vec![entry(1, "zz")],
            vec![entry(3, "1"), entry(3, "2")],
            vec![entry(3, "1"), entry(2, "2")],
        ];
        for entries in cases {
            let message = ChallengeMessage {
                file_id: "F1".into(),
                entries,
            };
            let err = Challenge::try_from(&message).unwrap_err();
            assert!(matches!(err, AuditError::MalformedProof(_)));
        }
    }

    #[test]
    fn rejects_garbage_json() {
        assert!(ProofMessage::from_json("{\"fileId\": 3}").is_err());
    }
}
