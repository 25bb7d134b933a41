//! Verifier-side challenge construction.
//!
//! A challenge picks a random subset of tagged block indices and a fresh,
//! nonzero coefficient for each. Coefficients only ever come from the secure
//! random source passed to [`build_challenge`]; there is no constructor that
//! accepts caller-chosen coefficients, so a previous round's coefficients
//! cannot be replayed into a new one.

use std::collections::BTreeSet;

use num_bigint::BigUint;
use num_traits::Zero;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{AuditError, Result};
use crate::params::ModulusParams;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeEntry {
    pub block_index: u64,
    pub coefficient: BigUint,
}

/// One audit round's challenge. Entries are sorted by block index and the
/// indices are distinct.
#[derive(Debug, PartialEq, Eq)]
pub struct Challenge {
    file_id: String,
    entries: Vec<ChallengeEntry>,
}

impl Challenge {
    /// Only for decoding a transport message; callers must have checked that
    /// entries are sorted, distinct and carry nonzero coefficients.
    pub(crate) fn from_parts(file_id: String, entries: Vec<ChallengeEntry>) -> Self {
        Self { file_id, entries }
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn entries(&self) -> &[ChallengeEntry] {
        &self.entries
    }

    pub fn indices(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|e| e.block_index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hex SHA-256 of the canonical encoding; proofs carry this to bind
    /// themselves to exactly one challenge.
    pub fn reference(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.file_id.len() as u64).to_be_bytes());
        hasher.update(self.file_id.as_bytes());
        for entry in &self.entries {
            let coefficient = entry.coefficient.to_bytes_be();
            hasher.update(entry.block_index.to_be_bytes());
            hasher.update((coefficient.len() as u64).to_be_bytes());
            hasher.update(&coefficient);
        }
        hex::encode(hasher.finalize())
    }
}

pub(crate) fn fill<R: RngCore + CryptoRng>(rng: &mut R, buf: &mut [u8]) -> Result<()> {
    rng.try_fill_bytes(buf)
        .map_err(|e| AuditError::RandomnessUnavailable(e.to_string()))
}

// uniform in [0, bound) by rejection; bound > 0
fn random_below<R: RngCore + CryptoRng>(rng: &mut R, bound: u64) -> Result<u64> {
    let threshold = bound.wrapping_neg() % bound;
    let mut buf = [0u8; 8];
    loop {
        fill(rng, &mut buf)?;
        let v = u64::from_be_bytes(buf);
        if v >= threshold {
            return Ok(v % bound);
        }
    }
}

// uniform in [1, N) by rejection over byte strings the width of N
fn random_coefficient<R: RngCore + CryptoRng>(rng: &mut R, params: &ModulusParams) -> Result<BigUint> {
    let n = params.modulus();
    let len = params.byte_len();
    let excess = (len as u64) * 8 - n.bits();
    let mask = 0xFFu8 >> excess;
    let mut buf = vec![0u8; len];
    loop {
        fill(rng, &mut buf)?;
        buf[0] &= mask;
        let candidate = BigUint::from_bytes_be(&buf);
        if !candidate.is_zero() && candidate < *n {
            return Ok(candidate);
        }
    }
}

/// Build a fresh challenge over `min(sample_size, |available|)` distinct
/// indices. A `sample_size` of zero still challenges one block.
pub fn build_challenge<R: RngCore + CryptoRng>(
    params: &ModulusParams,
    file_id: &str,
    available: &[u64],
    sample_size: usize,
    rng: &mut R,
) -> Result<Challenge> {
    let mut pool: Vec<u64> = available
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if pool.is_empty() {
        return Err(AuditError::NoAuditableBlocks {
            file_id: file_id.to_string(),
        });
    }

    // partial Fisher-Yates: the first k slots end up a uniform k-subset
    let k = sample_size.clamp(1, pool.len());
    for i in 0..k {
        let remaining = (pool.len() - i) as u64;
        let j = i + random_below(rng, remaining)? as usize;
        pool.swap(i, j);
    }
    let mut selected = pool[..k].to_vec();
    selected.sort_unstable();

    let mut entries = Vec::with_capacity(k);
    for block_index in selected {
        entries.push(ChallengeEntry {
            block_index,
            coefficient: random_coefficient(rng, params)?,
        });
    }

    debug!(file_id, challenged = k, available = pool.len(), "built challenge");
    Ok(Challenge {
        file_id: file_id.to_string(),
        entries,
    })
}
