//! Binding between the audit protocol and the ledger.
//!
//! Per file the ledger moves `Uninitialized -> Tagged -> Audited(..)`, and
//! audited files can be audited again indefinitely. Audit records are never
//! updated: each round appends one record with the next per-file sequence
//! number, assigned inside the same transaction as the append. "Latest" is
//! the highest sequence number, not the newest timestamp.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::keys;
use super::records::{AuditRecord, AuditStatus, DownloadRecord, TagRecord};
use super::{LedgerStore, LedgerTxn};
use crate::arith::to_hex;
use crate::challenge::Challenge;
use crate::error::{AuditError, Result};
use crate::proof::{Proof, TagSet};
use crate::tag::Tag;
use crate::verify::Verdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAuditState {
    /// No tag anchored yet.
    Uninitialized,
    /// Tags anchored, never audited.
    Tagged,
    /// Verdict of the latest audit round.
    Audited(Verdict),
}

/// What a finished audit round contributes to its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditOutcome {
    pub verdict: Verdict,
    pub proof_hash: Option<String>,
    pub mu: Option<String>,
    pub challenged_blocks: usize,
    pub reason: Option<String>,
}

impl AuditOutcome {
    /// A round whose proof was checked by the verifier.
    pub fn verified(challenge: &Challenge, proof: &Proof, verdict: Verdict) -> Self {
        Self {
            verdict,
            proof_hash: Some(proof.hash()),
            mu: Some(to_hex(&proof.mu)),
            challenged_blocks: challenge.len(),
            reason: None,
        }
    }

    /// A round that could not produce a checkable proof. Always `Invalid`.
    pub fn failed(challenge: &Challenge, error: &AuditError) -> Self {
        Self {
            verdict: Verdict::Invalid,
            proof_hash: None,
            mu: None,
            challenged_blocks: challenge.len(),
            reason: Some(error.to_string()),
        }
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| AuditError::LedgerRecord {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| AuditError::LedgerRecord {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn scan<T: DeserializeOwned>(txn: &impl LedgerTxn, prefix: &str) -> Result<Vec<T>> {
    let (start, end) = keys::prefix_range(prefix);
    txn.range_scan(&start, &end)?
        .iter()
        .map(|(key, bytes)| decode(key, bytes))
        .collect()
}

fn has_tags(txn: &impl LedgerTxn, file_id: &str) -> Result<bool> {
    let (start, end) = keys::prefix_range(&keys::tag_prefix(file_id));
    Ok(!txn.range_scan(&start, &end)?.is_empty())
}

// read-increment-write of a per-file counter; only sound inside one transaction
fn next_sequence(txn: &mut impl LedgerTxn, counter_key: &str) -> Result<u64> {
    let current = match txn.get(counter_key)? {
        Some(bytes) => decode::<u64>(counter_key, &bytes)?,
        None => 0,
    };
    let next = current + 1;
    txn.put(counter_key, encode(counter_key, &next)?)?;
    Ok(next)
}

fn validate_file_id(file_id: &str) -> Result<()> {
    if file_id.is_empty() {
        return Err(AuditError::InvalidParameter {
            key: "fileId".to_string(),
            reason: "file id must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Anchors tags, audit outcomes and download decisions on a ledger.
#[derive(Debug)]
pub struct AuditLedger<S> {
    store: S,
}

impl<S: LedgerStore> AuditLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Anchor a batch of tags atomically.
    ///
    /// Re-anchoring an identical tag is a no-op; anchoring a different value
    /// for an already tagged block fails the whole batch with `DuplicateTag`.
    /// Returns the number of newly written tags.
    pub fn anchor_tags(&self, owner: &str, tags: &[Tag]) -> Result<usize> {
        let created_at = now_iso();
        let written = self.store.transact(|txn| {
            let mut written = 0;
            for tag in tags {
                validate_file_id(&tag.file_id)?;
                let key = keys::tag_key(&tag.file_id, tag.block_index);
                let tag_value = to_hex(&tag.value);
                if let Some(bytes) = txn.get(&key)? {
                    let existing: TagRecord = decode(&key, &bytes)?;
                    if existing.tag_value == tag_value {
                        continue;
                    }
                    return Err(AuditError::DuplicateTag {
                        file_id: tag.file_id.clone(),
                        block_index: tag.block_index,
                    });
                }
                let record = TagRecord {
                    id: key.clone(),
                    owner: owner.to_string(),
                    file_id: tag.file_id.clone(),
                    block_index: tag.block_index,
                    tag_value,
                    created_at: created_at.clone(),
                };
                txn.put(&key, encode(&key, &record)?)?;
                written += 1;
            }
            Ok::<_, AuditError>(written)
        })?;
        info!(owner, submitted = tags.len(), written, "anchored block tags");
        Ok(written)
    }

    /// All tag records of a file, ordered by block index.
    pub fn tags_for_file(&self, file_id: &str) -> Result<Vec<TagRecord>> {
        self.store
            .transact(|txn| scan(&*txn, &keys::tag_prefix(file_id)))
    }

    /// Consistent snapshot of a file's anchored tags for one audit round.
    pub fn tag_set(&self, file_id: &str) -> Result<TagSet> {
        let records = self.tags_for_file(file_id)?;
        let mut set = TagSet::new(file_id);
        for record in records {
            set.insert(record.block_index, record.value()?);
        }
        Ok(set)
    }

    /// Append one audit record. Requires at least one anchored tag.
    pub fn record_audit(&self, owner: &str, file_id: &str, outcome: &AuditOutcome) -> Result<AuditRecord> {
        let timestamp = now_iso();
        let record = self.store.transact(|txn| {
            if !has_tags(&*txn, file_id)? {
                return Err(AuditError::NoAuditableBlocks {
                    file_id: file_id.to_string(),
                });
            }
            let sequence = next_sequence(txn, &keys::audit_seq_key(file_id))?;
            let key = keys::audit_key(file_id, sequence);
            let record = AuditRecord {
                id: key.clone(),
                file_id: file_id.to_string(),
                owner: owner.to_string(),
                sequence,
                proof_hash: outcome.proof_hash.clone(),
                mu: outcome.mu.clone(),
                status: AuditStatus::from(outcome.verdict),
                challenged_blocks: outcome.challenged_blocks,
                reason: outcome.reason.clone(),
                timestamp: timestamp.clone(),
            };
            txn.put(&key, encode(&key, &record)?)?;
            Ok::<_, AuditError>(record)
        })?;

        match record.status {
            AuditStatus::Success => {
                info!(file_id, sequence = record.sequence, status = ?record.status, "anchored audit result")
            }
            AuditStatus::Malicious => warn!(
                file_id,
                sequence = record.sequence,
                status = ?record.status,
                reason = record.reason.as_deref().unwrap_or("proof rejected"),
                "anchored failed audit"
            ),
        }
        Ok(record)
    }

    /// Every audit record of a file in append order.
    pub fn audit_history(&self, file_id: &str) -> Result<Vec<AuditRecord>> {
        let mut records: Vec<AuditRecord> = self
            .store
            .transact(|txn| scan(&*txn, &keys::audit_prefix(file_id)))?;
        records.sort_by_key(|r| r.sequence);
        Ok(records)
    }

    /// The record with the highest sequence number, whatever order the
    /// ledger returns records in.
    pub fn latest_audit(&self, file_id: &str) -> Result<Option<AuditRecord>> {
        let records: Vec<AuditRecord> = self
            .store
            .transact(|txn| scan(&*txn, &keys::audit_prefix(file_id)))?;
        Ok(records.into_iter().max_by_key(|r| r.sequence))
    }

    pub fn file_state(&self, file_id: &str) -> Result<FileAuditState> {
        let (tagged, latest) = self.store.transact(|txn| {
            let tagged = has_tags(&*txn, file_id)?;
            let records: Vec<AuditRecord> = scan(&*txn, &keys::audit_prefix(file_id))?;
            Ok::<_, AuditError>((tagged, records.into_iter().max_by_key(|r| r.sequence)))
        })?;
        Ok(match (tagged, latest) {
            (_, Some(record)) => FileAuditState::Audited(record.status.into()),
            (true, None) => FileAuditState::Tagged,
            (false, None) => FileAuditState::Uninitialized,
        })
    }

    /// Anchor an access decision. Only the hash of `request` is stored.
    pub fn log_download(
        &self,
        owner: &str,
        file_id: &str,
        user_id: &str,
        allowed: bool,
        request: &[u8],
    ) -> Result<DownloadRecord> {
        validate_file_id(file_id)?;
        let request_hash = hex::encode(Sha256::digest(request));
        let timestamp = now_iso();
        let record = self.store.transact(|txn| {
            let sequence = next_sequence(txn, &keys::download_seq_key(file_id))?;
            let key = keys::download_key(file_id, sequence);
            let record = DownloadRecord {
                id: key.clone(),
                file_id: file_id.to_string(),
                owner: owner.to_string(),
                user_id: user_id.to_string(),
                allowed,
                request_hash: request_hash.clone(),
                sequence,
                timestamp: timestamp.clone(),
            };
            txn.put(&key, encode(&key, &record)?)?;
            Ok::<_, AuditError>(record)
        })?;
        debug!(file_id, user_id, allowed, sequence = record.sequence, "anchored download decision");
        Ok(record)
    }

    pub fn download_history(&self, file_id: &str) -> Result<Vec<DownloadRecord>> {
        let mut records: Vec<DownloadRecord> = self
            .store
            .transact(|txn| scan(&*txn, &keys::download_prefix(file_id)))?;
        records.sort_by_key(|r| r.sequence);
        Ok(records)
    }
}
