//! Provable data possession over an RSA modulus, with ledger-anchored
//! audit outcomes.
//!
//! A data owner tags every stored block with `tag_i = g^{m_i} mod N`, where
//! `m_i` is a digest of the block's identity and ciphertext, and anchors the
//! tags on an append-only ledger. To audit, the verifier sends a random
//! subset of indices with random coefficients `c_i`; the storage side answers
//! with `T = Π tag_i^{c_i} mod N`, a commitment `R = g^r mod N` and the
//! blinded sum `μ = r + γ·Σ c_i·m_i`, where `γ` hashes the challenge and `R`.
//! The verifier accepts iff `g^μ ≡ R · (Π tag_i^{c_i})^γ (mod N)` and the
//! recomputed aggregate equals `T`. Every verdict is appended to the ledger.
//!
//! ```no_run
//! use pdp::{AuditConfig, Auditor, MemoryBlockStore, MemoryLedger};
//!
//! # fn main() -> pdp::Result<()> {
//! let config = AuditConfig::load_layered("pdp.toml")?;
//! let auditor = Auditor::from_config(&config, MemoryLedger::new())?;
//!
//! let blocks = vec![b"encrypted block 0".to_vec(), b"encrypted block 1".to_vec()];
//! let storage = MemoryBlockStore::new();
//! storage.store_blocks("owner", "file-1", &blocks)?;
//! auditor.ingest("owner", "file-1", &blocks)?;
//!
//! let record = auditor.run_round("owner", "file-1", &storage)?;
//! println!("{:?}", record.status);
//! # Ok(())
//! # }
//! ```

pub mod arith;
pub mod auditor;
pub mod challenge;
pub mod config;
pub mod error;
pub mod ledger;
pub mod params;
pub mod proof;
pub mod storage;
pub mod tag;
pub mod verify;
pub mod wire;

pub use auditor::{AuditRound, Auditor};
pub use challenge::{Challenge, ChallengeEntry, build_challenge};
pub use config::AuditConfig;
pub use error::{AuditError, LedgerError, Result};
pub use ledger::{
    AuditLedger, AuditOutcome, AuditRecord, AuditStatus, DownloadRecord, FileAuditState,
    LedgerStore, LedgerTxn, MemoryLedger, TagRecord,
};
pub use params::ModulusParams;
pub use proof::{
    BlockFetcher, Proof, TagSet, blinding_weight, generate_proof, generate_proof_with_rng, mu_bound,
};
pub use storage::MemoryBlockStore;
pub use tag::{Tag, block_digest, generate_tag, generate_tags};
pub use verify::{Verdict, verify, verify_message};
pub use wire::{ChallengeMessage, ProofMessage};
