//! Homomorphic verifiable tags: `tag_i = g^{m_i} mod N`.

use num_bigint::BigUint;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::arith::modpow;
use crate::error::{AuditError, Result};
use crate::params::ModulusParams;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub file_id: String,
    pub block_index: u64,
    pub value: BigUint,
}

// m = SHA-256(len(fileId) || fileId || blockIndex || ciphertext) as a 256-bit integer
pub fn block_digest(file_id: &str, block_index: u64, ciphertext: &[u8]) -> BigUint {
    let mut hasher = Sha256::new();
    hasher.update((file_id.len() as u64).to_be_bytes());
    hasher.update(file_id.as_bytes());
    hasher.update(block_index.to_be_bytes());
    hasher.update(ciphertext);
    BigUint::from_bytes_be(&hasher.finalize())
}

/// Tag one block. Pure and deterministic: the same block always yields the
/// same tag, so re-tagging is idempotent.
pub fn generate_tag(
    params: &ModulusParams,
    file_id: &str,
    block_index: u64,
    ciphertext: &[u8],
) -> Result<Tag> {
    if ciphertext.is_empty() {
        return Err(AuditError::EmptyBlock {
            file_id: file_id.to_string(),
            block_index,
        });
    }
    let m = block_digest(file_id, block_index, ciphertext);
    let value = modpow(params.generator(), &m, params.modulus())?;
    debug!(file_id, block_index, "generated block tag");
    Ok(Tag {
        file_id: file_id.to_string(),
        block_index,
        value,
    })
}

/// Tag every block of a file in parallel; block `i` gets index `i`.
pub fn generate_tags(params: &ModulusParams, file_id: &str, blocks: &[Vec<u8>]) -> Result<Vec<Tag>> {
    blocks
        .par_iter()
        .enumerate()
        .map(|(i, block)| generate_tag(params, file_id, i as u64, block))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::testing::small_params;

    #[test]
    fn tagging_is_deterministic() {
        let params = small_params();
        let a = generate_tag(&params, "F1", 3, b"ciphertext").unwrap();
        let b = generate_tag(&params, "F1", 3, b"ciphertext").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tag_depends_on_identity_and_content() {
        let params = small_params();
        let base = generate_tag(&params, "F1", 0, b"abc").unwrap();
        assert_ne!(base.value, generate_tag(&params, "F1", 1, b"abc").unwrap().value);
        assert_ne!(base.value, generate_tag(&params, "F2", 0, b"abc").unwrap().value);
        assert_ne!(base.value, generate_tag(&params, "F1", 0, b"abd").unwrap().value);
    }

    #[test]
    fn digest_fits_256_bits() {
        let m = block_digest("F1", 0, b"x");
        assert!(m.bits() <= 256);
        assert_ne!(m, block_digest("F", 0, b"1x"));
    }

    #[test]
    fn empty_block_is_rejected() {
        let err = generate_tag(&small_params(), "F1", 0, &[]).unwrap_err();
        assert!(matches!(err, AuditError::EmptyBlock { block_index: 0, .. }));
    }

    #[test]
    fn batch_matches_single() {
        let params = small_params();
        let blocks = vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()];
        let tags = generate_tags(&params, "F1", &blocks).unwrap();
        assert_eq!(tags.len(), 3);
        for (i, tag) in tags.iter().enumerate() {
            assert_eq!(tag.block_index, i as u64);
            assert_eq!(*tag, generate_tag(&params, "F1", i as u64, &blocks[i]).unwrap());
        }
        let with_empty = vec![b"one".to_vec(), Vec::new()];
        assert!(generate_tags(&params, "F1", &with_empty).is_err());
    }
}
