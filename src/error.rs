//! Error taxonomy for tagging, auditing and ledger anchoring.
//!
//! Only `InvalidModulus` and `InvalidGenerator` are fatal: they mean the
//! process was configured with unusable public parameters and must not start.
//! Everything else is recoverable at the caller's discretion. Cryptographic
//! mismatch is never an error; the verifier reports it as
//! [`Verdict::Invalid`](crate::verify::Verdict::Invalid).

use thiserror::Error;

/// Errors raised by the ledger collaborator itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The ledger could not be reached or refused the commit.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Unified error type for every operation in this crate.
#[derive(Debug, Error)]
pub enum AuditError {
    /// `N` is missing, `<= 1`, or even.
    #[error("invalid modulus: {0}")]
    InvalidModulus(String),

    /// `g` is outside `(1, N)` or shares a factor with `N`.
    #[error("invalid generator: {0}")]
    InvalidGenerator(String),

    /// A configuration or encoded value could not be parsed.
    #[error("invalid value for {key}: {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("block {block_index} of file {file_id} is empty")]
    EmptyBlock { file_id: String, block_index: u64 },

    #[error("file {file_id} has no auditable blocks")]
    NoAuditableBlocks { file_id: String },

    /// A challenged block could not be fetched from storage.
    #[error("block {block_index} of file {file_id} is missing")]
    MissingBlock { file_id: String, block_index: u64 },

    /// A challenged block has no anchored tag.
    #[error("no anchored tag for block {block_index} of file {file_id}")]
    MissingTag { file_id: String, block_index: u64 },

    /// A different tag value is already anchored for this block.
    #[error("conflicting tag already anchored for block {block_index} of file {file_id}")]
    DuplicateTag { file_id: String, block_index: u64 },

    /// The secure random source failed; no weaker source is substituted.
    #[error("secure randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    #[error(transparent)]
    LedgerUnavailable(#[from] LedgerError),

    /// A value read back from the ledger did not decode.
    #[error("undecodable ledger record at {key}: {reason}")]
    LedgerRecord { key: String, reason: String },

    #[error("malformed proof: {0}")]
    MalformedProof(String),
}

impl AuditError {
    /// Whether this error is evidence of data loss or prover misbehaviour.
    ///
    /// An audit round that fails with one of these must be anchored as a
    /// `MALICIOUS` outcome rather than dropped.
    pub fn is_evidence(&self) -> bool {
        matches!(
            self,
            AuditError::MissingBlock { .. }
                | AuditError::MissingTag { .. }
                | AuditError::MalformedProof(_)
        )
    }

    /// Whether this error indicates a misconfigured process.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            AuditError::InvalidModulus(_) | AuditError::InvalidGenerator(_)
        )
    }
}

pub type Result<T, E = AuditError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_classification() {
        let missing = AuditError::MissingBlock {
            file_id: "F1".into(),
            block_index: 2,
        };
        assert!(missing.is_evidence());
        assert!(!missing.is_startup_fatal());

        let ledger = AuditError::from(LedgerError::Unavailable("down".into()));
        assert!(!ledger.is_evidence());
        assert!(AuditError::InvalidModulus("even".into()).is_startup_fatal());
    }

    #[test]
    fn ledger_error_is_transparent() {
        let err = AuditError::from(LedgerError::Unavailable("peer offline".into()));
        assert_eq!(err.to_string(), "ledger unavailable: peer offline");
    }
}
