use std::process::ExitCode;

use pdp::{AuditConfig, AuditLedger, Auditor, MemoryBlockStore, MemoryLedger};
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn run() -> pdp::Result<()> {
    // Step 1: Load N and g from trusted configuration
    let path = std::env::var("PDP_CONFIG").unwrap_or_else(|_| "pdp.toml".to_string());
    let config = AuditConfig::load_layered(&path)?;
    let auditor = Auditor::from_config(&config, MemoryLedger::new())?;

    // Step 2: Split an encrypted file into blocks (simulated as random bytes)
    let blocks: Vec<Vec<u8>> = (0..10)
        .map(|_| {
            let mut block = vec![0u8; 4096];
            OsRng.fill_bytes(&mut block);
            block
        })
        .collect();
    let storage = MemoryBlockStore::new();
    storage.store_blocks("owner-1", "file-1", &blocks)?;

    // Step 3: Tag every block and anchor the tags
    auditor.ingest("owner-1", "file-1", &blocks)?;

    // Step 4: Audit an honest storage node
    let record = auditor.run_round("owner-1", "file-1", &storage)?;
    println!("Round {}: {:?}", record.sequence, record.status);

    // Step 5: Silently corrupt one block and audit again
    storage.corrupt_block("file-1", 0, vec![0xff; 4096]);
    let record = auditor.run_round("owner-1", "file-1", &storage)?;
    println!("Round {}: {:?}", record.sequence, record.status);

    // Step 6: Read the audit trail back from the ledger
    let ledger: &AuditLedger<MemoryLedger> = auditor.ledger();
    if let Some(latest) = ledger.latest_audit("file-1")? {
        println!("Latest status: {:?} at {}", latest.status, latest.timestamp);
    }
    for record in ledger.audit_history("file-1")? {
        println!(
            "  #{} {:?} challenged={} proof={}",
            record.sequence,
            record.status,
            record.challenged_blocks,
            record.proof_hash.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, fatal = err.is_startup_fatal(), "audit demo failed");
            ExitCode::FAILURE
        }
    }
}
