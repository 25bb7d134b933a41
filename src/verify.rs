//! Proof verification.
//!
//! The verifier recomputes `expected = Π tag_i^{c_i} mod N` from the
//! challenge and the anchored tags, derives `γ` from the challenge reference
//! and the prover's commitment `R`, then checks `g^μ == R · expected^γ` and
//! `expected == T`. It always returns a verdict: anything it cannot decide
//! is [`Verdict::Invalid`].

use num_traits::Zero;
use tracing::{debug, warn};

use crate::arith::{modmul, modpow};
use crate::challenge::Challenge;
use crate::params::ModulusParams;
use crate::proof::{Proof, TagSet, aggregate_tags, blinding_weight, mu_bound};
use crate::wire::ProofMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Valid,
    Invalid,
}

impl Verdict {
    pub fn is_valid(self) -> bool {
        self == Verdict::Valid
    }
}

impl From<bool> for Verdict {
    fn from(ok: bool) -> Self {
        if ok { Verdict::Valid } else { Verdict::Invalid }
    }
}

pub fn verify(params: &ModulusParams, proof: &Proof, challenge: &Challenge, tags: &TagSet) -> Verdict {
    let file_id = challenge.file_id();
    if proof.file_id != file_id || tags.file_id() != file_id {
        warn!(file_id, proof_file = %proof.file_id, "proof or tags belong to another file");
        return Verdict::Invalid;
    }
    if proof.challenge_ref != challenge.reference() {
        warn!(file_id, "proof answers a different challenge");
        return Verdict::Invalid;
    }
    if proof.mu >= mu_bound(params, challenge) {
        warn!(file_id, "mu exceeds the public bound");
        return Verdict::Invalid;
    }
    let n = params.modulus();
    if proof.commitment.is_zero() || proof.commitment >= *n {
        warn!(file_id, "commitment is not a residue mod N");
        return Verdict::Invalid;
    }

    let expected = match aggregate_tags(params, challenge, tags) {
        Ok(expected) => expected,
        Err(err) => {
            warn!(file_id, error = %err, "cannot recompute aggregated tag");
            return Verdict::Invalid;
        }
    };
    let gamma = blinding_weight(&proof.challenge_ref, &proof.commitment);
    let sides = modpow(params.generator(), &proof.mu, n).and_then(|lhs| {
        let rhs = modmul(&proof.commitment, &modpow(&expected, &gamma, n)?, n)?;
        Ok((lhs, rhs))
    });
    let (lhs, rhs) = match sides {
        Ok(sides) => sides,
        Err(err) => {
            warn!(file_id, error = %err, "cannot evaluate the verification equation");
            return Verdict::Invalid;
        }
    };

    let verdict = Verdict::from(lhs == rhs && expected == proof.aggregated_tag);
    debug!(file_id, ?verdict, "verified proof");
    verdict
}

/// Decode a transport proof and verify it; a proof that does not decode is
/// `Invalid`.
pub fn verify_message(
    params: &ModulusParams,
    message: &ProofMessage,
    challenge: &Challenge,
    tags: &TagSet,
) -> Verdict {
    match Proof::try_from(message) {
        Ok(proof) => verify(params, &proof, challenge, tags),
        Err(err) => {
            warn!(file_id = challenge.file_id(), error = %err, "proof failed to decode");
            Verdict::Invalid
        }
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use rand::rngs::OsRng;

    use super::*;
    use crate::challenge::build_challenge;
    use crate::params::testing::small_params;
    use crate::proof::generate_proof;
    use crate::tag::generate_tags;

    struct Setup {
        params: ModulusParams,
        blocks: Vec<Vec<u8>>,
        tags: TagSet,
    }

    impl Setup {
        fn new() -> Self {
            let params = small_params();
            let blocks: Vec<Vec<u8>> = (0u8..6).map(|i| vec![i ^ 0x5a; 48]).collect();
            let tags = TagSet::from_tags("F1", generate_tags(&params, "F1", &blocks).unwrap());
            Self { params, blocks, tags }
        }

        fn challenge(&self, k: usize) -> Challenge {
            build_challenge(&self.params, "F1", &self.tags.indices(), k, &mut OsRng).unwrap()
        }

        fn prove(&self, challenge: &Challenge) -> Proof {
            let fetch = |_: &str, i: u64| self.blocks.get(i as usize).cloned();
            generate_proof(&self.params, challenge, &fetch, &self.tags).unwrap()
        }
    }

    #[test]
    fn honest_proof_is_valid() {
        let s = Setup::new();
        let challenge = s.challenge(4);
        let proof = s.prove(&challenge);
        assert_eq!(verify(&s.params, &proof, &challenge, &s.tags), Verdict::Valid);
    }

    #[test]
    fn tampered_mu_is_invalid() {
        let s = Setup::new();
        let challenge = s.challenge(3);
        let mut proof = s.prove(&challenge);
        proof.mu += 1u32;
        assert_eq!(verify(&s.params, &proof, &challenge, &s.tags), Verdict::Invalid);
    }

    #[test]
    fn tampered_aggregate_is_invalid() {
        let s = Setup::new();
        let challenge = s.challenge(3);
        let mut proof = s.prove(&challenge);
        proof.aggregated_tag = BigUint::from(4u32);
        assert_eq!(verify(&s.params, &proof, &challenge, &s.tags), Verdict::Invalid);
    }

    #[test]
    fn oversized_mu_is_invalid() {
        let s = Setup::new();
        let challenge = s.challenge(2);
        let mut proof = s.prove(&challenge);
        proof.mu = mu_bound(&s.params, &challenge);
        assert_eq!(verify(&s.params, &proof, &challenge, &s.tags), Verdict::Invalid);
    }

    #[test]
    fn tampered_commitment_is_invalid() {
        let s = Setup::new();
        let challenge = s.challenge(3);
        let mut proof = s.prove(&challenge);
        proof.commitment = modmul(&proof.commitment, s.params.generator(), s.params.modulus()).unwrap();
        assert_eq!(verify(&s.params, &proof, &challenge, &s.tags), Verdict::Invalid);

        proof.commitment = BigUint::from(0u32);
        assert_eq!(verify(&s.params, &proof, &challenge, &s.tags), Verdict::Invalid);
    }

    #[test]
    fn commitment_cancelling_the_aggregate_is_invalid() {
        // pick any μ and solve R = g^μ · T^{-1}; γ depends on R so the
        // equation no longer balances
        let s = Setup::new();
        let challenge = s.challenge(3);
        let honest = s.prove(&challenge);
        let n = s.params.modulus();
        let mu = BigUint::from(123_456_789u64);
        let inverse = honest.aggregated_tag.modinv(n).unwrap();
        let forged = Proof {
            commitment: modmul(&modpow(s.params.generator(), &mu, n).unwrap(), &inverse, n).unwrap(),
            mu,
            ..honest
        };
        assert_eq!(verify(&s.params, &forged, &challenge, &s.tags), Verdict::Invalid);
    }

    #[test]
    fn wrong_file_is_invalid() {
        let s = Setup::new();
        let challenge = s.challenge(2);
        let mut proof = s.prove(&challenge);
        proof.file_id = "F2".into();
        assert_eq!(verify(&s.params, &proof, &challenge, &s.tags), Verdict::Invalid);
    }

    #[test]
    fn missing_anchored_tag_is_invalid() {
        let s = Setup::new();
        let challenge = s.challenge(6);
        let proof = s.prove(&challenge);
        let empty = TagSet::new("F1");
        assert_eq!(verify(&s.params, &proof, &challenge, &empty), Verdict::Invalid);
    }

    #[test]
    fn undecodable_message_is_invalid() {
        let s = Setup::new();
        let challenge = s.challenge(2);
        let mut message = ProofMessage::from(&s.prove(&challenge));
        assert_eq!(verify_message(&s.params, &message, &challenge, &s.tags), Verdict::Valid);
        message.mu = "not hex".into();
        assert_eq!(verify_message(&s.params, &message, &challenge, &s.tags), Verdict::Invalid);
    }
}
