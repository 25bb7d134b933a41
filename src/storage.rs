//! In-memory block store standing in for the storage node.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{AuditError, Result};
use crate::proof::BlockFetcher;

/// Blocks keyed by `(file_id, block_index)`.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<(String, u64), Vec<u8>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file's blocks; block `i` gets index `i`. Existing blocks are
    /// left untouched, since stored blocks are never mutated.
    pub fn store_blocks(&self, owner: &str, file_id: &str, blocks: &[Vec<u8>]) -> Result<usize> {
        if let Some(i) = blocks.iter().position(|b| b.is_empty()) {
            return Err(AuditError::EmptyBlock {
                file_id: file_id.to_string(),
                block_index: i as u64,
            });
        }
        let mut map = self.blocks.write();
        let mut stored = 0;
        for (i, data) in blocks.iter().enumerate() {
            map.entry((file_id.to_string(), i as u64)).or_insert_with(|| {
                stored += 1;
                data.clone()
            });
        }
        debug!(owner, file_id, stored, "stored blocks");
        Ok(stored)
    }

    /// Overwrite a block in place, as silent corruption would.
    pub fn corrupt_block(&self, file_id: &str, block_index: u64, data: Vec<u8>) -> bool {
        match self.blocks.write().get_mut(&(file_id.to_string(), block_index)) {
            Some(block) => {
                *block = data;
                true
            }
            None => false,
        }
    }

    /// Drop a block, as data loss would.
    pub fn lose_block(&self, file_id: &str, block_index: u64) -> bool {
        self.blocks
            .write()
            .remove(&(file_id.to_string(), block_index))
            .is_some()
    }
}

impl BlockFetcher for MemoryBlockStore {
    fn fetch_block(&self, file_id: &str, block_index: u64) -> Option<Vec<u8>> {
        self.blocks
            .read()
            .get(&(file_id.to_string(), block_index))
            .cloned()
    }

    // one read lock for the whole challenge
    fn fetch_blocks(&self, file_id: &str, indices: &[u64]) -> Vec<(u64, Vec<u8>)> {
        let map = self.blocks.read();
        indices
            .iter()
            .filter_map(|&i| map.get(&(file_id.to_string(), i)).map(|b| (i, b.clone())))
            .collect()
    }
}
