//! Values stored on the ledger, JSON-encoded.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::arith::from_hex;
use crate::error::Result;
use crate::verify::Verdict;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    pub id: String,
    pub owner: String,
    pub file_id: String,
    pub block_index: u64,
    /// `g^m mod N`, hex.
    pub tag_value: String,
    pub created_at: String,
}

impl TagRecord {
    pub fn value(&self) -> Result<BigUint> {
        from_hex("tagValue", &self.tag_value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Malicious,
}

impl From<Verdict> for AuditStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Valid => AuditStatus::Success,
            Verdict::Invalid => AuditStatus::Malicious,
        }
    }
}

impl From<AuditStatus> for Verdict {
    fn from(status: AuditStatus) -> Self {
        match status {
            AuditStatus::Success => Verdict::Valid,
            AuditStatus::Malicious => Verdict::Invalid,
        }
    }
}

/// Outcome of one audit round. `sequence` orders records of one file;
/// `timestamp` is for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: String,
    pub file_id: String,
    pub owner: String,
    pub sequence: u64,
    /// Absent when the round failed before a proof existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_hash: Option<String>,
    /// Blinded response, hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mu: Option<String>,
    pub status: AuditStatus,
    pub challenged_blocks: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: String,
}

/// An access decision on a file download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub id: String,
    pub file_id: String,
    pub owner: String,
    pub user_id: String,
    pub allowed: bool,
    /// Hex SHA-256 of the (encrypted) request.
    pub request_hash: String,
    pub sequence: u64,
    pub timestamp: String,
}
