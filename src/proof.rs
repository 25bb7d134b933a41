//! Prover-side proof generation.
//!
//! Runs wherever the blocks are readable. For a challenge `{(i, c_i)}` the
//! prover forms the coefficient-weighted digest sum `σ = Σ c_i · m_i` and
//! `T = Π tag_i^{c_i} mod N` from the *anchored* tags. `σ` itself never
//! leaves the prover. It is blinded instead:
//!
//! - draw a secret `r` much wider than `γ·σ` and commit to `R = g^r mod N`,
//! - derive the weight `γ = SHA-256(challenge_ref ‖ R)`,
//! - send `μ = r + γ·σ` together with `R` and `T`.
//!
//! The verifier checks `g^μ ≡ R · T^γ (mod N)`. Because `r` statistically
//! hides `γ·σ`, neither the verifier nor a ledger reader can divide an
//! individual `m_i` back out of `μ`, even for a one-block challenge.
//!
//! `μ` is an exact integer. Reducing it modulo any public value would break
//! the check, because the order of `g` is unknown. Its size is instead capped
//! by [`mu_bound`], which depends only on the challenge.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::arith::{modmul, modpow};
use crate::challenge::{Challenge, fill};
use crate::error::{AuditError, Result};
use crate::params::ModulusParams;
use crate::tag::{Tag, block_digest};

/// Bits of statistical distance between `μ` and a uniformly blinded value.
const HIDING_BITS: u64 = 128;

/// Width of a block digest and of the weight `γ`.
const DIGEST_BITS: u64 = 256;

/// Resolves `(file_id, block_index)` to the stored ciphertext.
pub trait BlockFetcher {
    fn fetch_block(&self, file_id: &str, block_index: u64) -> Option<Vec<u8>>;

    /// The requested blocks that exist, in request order.
    fn fetch_blocks(&self, file_id: &str, indices: &[u64]) -> Vec<(u64, Vec<u8>)> {
        indices
            .iter()
            .filter_map(|&i| self.fetch_block(file_id, i).map(|block| (i, block)))
            .collect()
    }
}

impl<F> BlockFetcher for F
where
    F: Fn(&str, u64) -> Option<Vec<u8>>,
{
    fn fetch_block(&self, file_id: &str, block_index: u64) -> Option<Vec<u8>> {
        self(file_id, block_index)
    }
}

/// Snapshot of the anchored tags of one file, keyed by block index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    file_id: String,
    tags: BTreeMap<u64, BigUint>,
}

impl TagSet {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            tags: BTreeMap::new(),
        }
    }

    pub fn from_tags(file_id: impl Into<String>, tags: impl IntoIterator<Item = Tag>) -> Self {
        let mut set = Self::new(file_id);
        for tag in tags {
            set.insert(tag.block_index, tag.value);
        }
        set
    }

    pub fn insert(&mut self, block_index: u64, value: BigUint) {
        self.tags.insert(block_index, value);
    }

    pub fn get(&self, block_index: u64) -> Option<&BigUint> {
        self.tags.get(&block_index)
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn indices(&self) -> Vec<u64> {
        self.tags.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    pub file_id: String,
    pub challenge_ref: String,
    /// `R = g^r mod N`, the commitment to the blinding value.
    pub commitment: BigUint,
    /// Blinded response `r + γ·Σ c_i·m_i`.
    pub mu: BigUint,
    pub aggregated_tag: BigUint,
}

impl Proof {
    /// Hex SHA-256 of the canonical encoding; this is what the ledger keeps
    /// instead of the raw proof.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [self.file_id.as_bytes(), self.challenge_ref.as_bytes()] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part);
        }
        for value in [&self.commitment, &self.mu, &self.aggregated_tag] {
            let bytes = value.to_bytes_be();
            hasher.update((bytes.len() as u64).to_be_bytes());
            hasher.update(&bytes);
        }
        hex::encode(hasher.finalize())
    }
}

/// `γ = SHA-256(u64be(len ref) ‖ ref ‖ R)` as a big-endian integer, never zero.
pub fn blinding_weight(challenge_ref: &str, commitment: &BigUint) -> BigUint {
    let mut hasher = Sha256::new();
    hasher.update((challenge_ref.len() as u64).to_be_bytes());
    hasher.update(challenge_ref.as_bytes());
    hasher.update(commitment.to_bytes_be());
    let gamma = BigUint::from_bytes_be(&hasher.finalize());
    if gamma.is_zero() { BigUint::one() } else { gamma }
}

// width of r: covers γ·σ < 2^256 · k·N · 2^256 plus the hiding margin
fn blinding_bits(params: &ModulusParams, challenge: &Challenge) -> u64 {
    let kn = params.modulus() * BigUint::from(challenge.len());
    kn.bits() + 2 * DIGEST_BITS + HIDING_BITS
}

/// Exclusive upper bound on an honest `μ`.
///
/// `r < 2^w` and `γ·σ < 2^w` for `w` = [`blinding_bits`], so `μ < 2^{w+1}`.
pub fn mu_bound(params: &ModulusParams, challenge: &Challenge) -> BigUint {
    BigUint::one() << (blinding_bits(params, challenge) + 1)
}

fn random_blinding<R: RngCore + CryptoRng>(rng: &mut R, bits: u64) -> Result<BigUint> {
    let len = bits.div_ceil(8) as usize;
    let mut buf = vec![0u8; len];
    fill(rng, &mut buf)?;
    buf[0] &= 0xFFu8 >> (len as u64 * 8 - bits);
    Ok(BigUint::from_bytes_be(&buf))
}

/// `Π tag_i^{c_i} mod N` over the challenged entries, using anchored tags.
pub fn aggregate_tags(params: &ModulusParams, challenge: &Challenge, tags: &TagSet) -> Result<BigUint> {
    let n = params.modulus();
    let mut acc = BigUint::one();
    for entry in challenge.entries() {
        let tag = tags.get(entry.block_index).ok_or_else(|| AuditError::MissingTag {
            file_id: challenge.file_id().to_string(),
            block_index: entry.block_index,
        })?;
        let term = modpow(tag, &entry.coefficient, n)?;
        acc = modmul(&acc, &term, n)?;
    }
    Ok(acc)
}

/// Answer `challenge` from the stored blocks and the anchored tags, blinding
/// with the operating system's secure random source.
///
/// Fails with `MissingTag` before touching storage if any challenged block
/// was never anchored, and with `MissingBlock` if a block cannot be fetched.
/// Both are evidence and must end up as a failed round.
pub fn generate_proof<F: BlockFetcher + ?Sized>(
    params: &ModulusParams,
    challenge: &Challenge,
    fetcher: &F,
    tags: &TagSet,
) -> Result<Proof> {
    generate_proof_with_rng(params, challenge, fetcher, tags, &mut OsRng)
}

pub fn generate_proof_with_rng<F, R>(
    params: &ModulusParams,
    challenge: &Challenge,
    fetcher: &F,
    tags: &TagSet,
    rng: &mut R,
) -> Result<Proof>
where
    F: BlockFetcher + ?Sized,
    R: RngCore + CryptoRng,
{
    let file_id = challenge.file_id();
    let aggregated_tag = aggregate_tags(params, challenge, tags)?;

    let indices: Vec<u64> = challenge.indices().collect();
    let blocks: BTreeMap<u64, Vec<u8>> = fetcher.fetch_blocks(file_id, &indices).into_iter().collect();
    let mut sigma = BigUint::zero();
    for entry in challenge.entries() {
        let block = blocks
            .get(&entry.block_index)
            .ok_or_else(|| AuditError::MissingBlock {
                file_id: file_id.to_string(),
                block_index: entry.block_index,
            })?;
        let m = block_digest(file_id, entry.block_index, block);
        sigma += &entry.coefficient * m;
    }

    let r = random_blinding(rng, blinding_bits(params, challenge))?;
    let commitment = modpow(params.generator(), &r, params.modulus())?;
    let challenge_ref = challenge.reference();
    let gamma = blinding_weight(&challenge_ref, &commitment);

    debug!(file_id, challenged = challenge.len(), "generated proof");
    Ok(Proof {
        file_id: file_id.to_string(),
        challenge_ref,
        commitment,
        mu: r + gamma * sigma,
        aggregated_tag,
    })
}
