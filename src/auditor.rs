//! Audit round orchestration.
//!
//! ```text
//! ingest ──► tags anchored
//! issue_challenge ──► AuditRound ──(ChallengeMessage)──► prover
//!                                  ◄──(ProofMessage)────
//! conclude(round, response) ──► AuditRecord anchored
//! ```
//!
//! Every concluded round leaves exactly one record. A prover that cannot
//! answer because a block or tag is missing, or that answers with garbage,
//! is recorded as `MALICIOUS`; only infrastructure failures (ledger down)
//! propagate without a record.

use rand::rngs::OsRng;
use tracing::{info, warn};

use crate::challenge::{Challenge, build_challenge};
use crate::config::AuditConfig;
use crate::error::Result;
use crate::ledger::{AuditLedger, AuditOutcome, AuditRecord, LedgerStore};
use crate::params::ModulusParams;
use crate::proof::{BlockFetcher, Proof, TagSet, generate_proof};
use crate::tag::{Tag, generate_tags};
use crate::verify::verify;
use crate::wire::{ChallengeMessage, ProofMessage};

/// One issued challenge together with the tag snapshot it was drawn from.
/// Concluding the round consumes it.
#[derive(Debug)]
pub struct AuditRound {
    challenge: Challenge,
    tags: TagSet,
}

impl AuditRound {
    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// What gets sent to the prover.
    pub fn message(&self) -> ChallengeMessage {
        ChallengeMessage::from(&self.challenge)
    }
}

pub struct Auditor<S> {
    params: ModulusParams,
    ledger: AuditLedger<S>,
    sample_size: usize,
}

impl<S: LedgerStore> Auditor<S> {
    pub fn new(params: ModulusParams, ledger: AuditLedger<S>, sample_size: usize) -> Self {
        Self {
            params,
            ledger,
            sample_size,
        }
    }

    pub fn from_config(config: &AuditConfig, store: S) -> Result<Self> {
        Ok(Self::new(config.params()?, AuditLedger::new(store), config.sample_size))
    }

    pub fn params(&self) -> &ModulusParams {
        &self.params
    }

    pub fn ledger(&self) -> &AuditLedger<S> {
        &self.ledger
    }

    /// Tag every block of a file and anchor the tags in one transaction.
    /// The file is auditable once this returns.
    pub fn ingest(&self, owner: &str, file_id: &str, blocks: &[Vec<u8>]) -> Result<Vec<Tag>> {
        let tags = generate_tags(&self.params, file_id, blocks)?;
        self.ledger.anchor_tags(owner, &tags)?;
        info!(owner, file_id, blocks = tags.len(), "file ingested");
        Ok(tags)
    }

    /// Draw a fresh challenge over the file's currently anchored tags.
    pub fn issue_challenge(&self, file_id: &str) -> Result<AuditRound> {
        let tags = self.ledger.tag_set(file_id)?;
        let challenge = build_challenge(
            &self.params,
            file_id,
            &tags.indices(),
            self.sample_size,
            &mut OsRng,
        )?;
        Ok(AuditRound { challenge, tags })
    }

    /// Verify the prover's response and anchor the outcome.
    pub fn conclude(
        &self,
        owner: &str,
        round: AuditRound,
        response: Result<ProofMessage>,
    ) -> Result<AuditRecord> {
        let AuditRound { challenge, tags } = round;
        let decoded = response.and_then(|message| Proof::try_from(&message));
        let outcome = match decoded {
            Ok(proof) => {
                let verdict = verify(&self.params, &proof, &challenge, &tags);
                AuditOutcome::verified(&challenge, &proof, verdict)
            }
            Err(err) if err.is_evidence() => {
                warn!(file_id = challenge.file_id(), error = %err, "audit round failed");
                AuditOutcome::failed(&challenge, &err)
            }
            Err(err) => return Err(err),
        };
        self.ledger.record_audit(owner, challenge.file_id(), &outcome)
    }

    /// A full round against a prover co-located with `fetcher`.
    pub fn run_round<F: BlockFetcher + ?Sized>(
        &self,
        owner: &str,
        file_id: &str,
        fetcher: &F,
    ) -> Result<AuditRecord> {
        let round = self.issue_challenge(file_id)?;
        let response = generate_proof(&self.params, &round.challenge, fetcher, &round.tags)
            .map(|proof| ProofMessage::from(&proof));
        self.conclude(owner, round, response)
    }
}
