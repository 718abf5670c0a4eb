//! Bounded recent-block history.
//!
//! The most-normalized strategy folds a recent block fingerprint into its
//! output. Only the last [`BLOCK_HASH_WINDOW`] blocks before the current one
//! are visible; anything else reads as [`ZERO_HASH`] rather than failing.

use std::collections::VecDeque;
use std::sync::RwLock;

use sha2::{Digest, Sha256};

/// Number of past blocks whose fingerprints remain queryable.
pub const BLOCK_HASH_WINDOW: u64 = 256;

/// Fingerprint returned for blocks outside the visible window.
pub const ZERO_HASH: [u8; 32] = [0u8; 32];

/// Source of recent block fingerprints.
pub trait BlockHistory: Send + Sync {
    /// Index of the block currently being built.
    fn current_index(&self) -> u64;

    /// Raw lookup of a sealed block's fingerprint, if the source still has it.
    fn stored_hash(&self, index: u64) -> Option<[u8; 32]>;

    /// Fingerprint of `index`, or [`ZERO_HASH`] when `index` is the current
    /// block, in the future, or more than [`BLOCK_HASH_WINDOW`] blocks old.
    fn block_hash(&self, index: u64) -> [u8; 32] {
        let current = self.current_index();
        if index >= current || current - index > BLOCK_HASH_WINDOW {
            return ZERO_HASH;
        }
        self.stored_hash(index).unwrap_or(ZERO_HASH)
    }
}

/// History that never has any sealed blocks. Every lookup yields [`ZERO_HASH`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHistory;

impl BlockHistory for NoHistory {
    fn current_index(&self) -> u64 {
        0
    }

    fn stored_hash(&self, _index: u64) -> Option<[u8; 32]> {
        None
    }
}

struct Blocks {
    /// Index of the block being built; `hashes` holds the sealed ones below it.
    current: u64,
    hashes: VecDeque<[u8; 32]>,
}

/// Ring buffer of the last [`BLOCK_HASH_WINDOW`] sealed block fingerprints.
///
/// Safe to share between a block producer and any number of readers.
pub struct RecentBlocks {
    inner: RwLock<Blocks>,
}

impl RecentBlocks {
    /// Empty history positioned at block `start`.
    pub fn new(start: u64) -> Self {
        RecentBlocks {
            inner: RwLock::new(Blocks {
                current: start,
                hashes: VecDeque::with_capacity(BLOCK_HASH_WINDOW as usize),
            }),
        }
    }

    /// Seal the current block with `hash` and advance to the next index.
    ///
    /// Returns the index of the sealed block.
    pub fn seal(&self, hash: [u8; 32]) -> u64 {
        let mut blocks = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if blocks.hashes.len() as u64 == BLOCK_HASH_WINDOW {
            blocks.hashes.pop_front();
        }
        blocks.hashes.push_back(hash);
        let sealed = blocks.current;
        blocks.current = blocks.current.saturating_add(1);
        sealed
    }

    /// Seal the current block with a fingerprint chained from the previous one:
    /// `sha256(previous_hash || index_le)`.
    pub fn seal_next(&self) -> u64 {
        let (previous, index) = {
            let blocks = self.inner.read().unwrap_or_else(|e| e.into_inner());
            (
                blocks.hashes.back().copied().unwrap_or(ZERO_HASH),
                blocks.current,
            )
        };
        let mut hasher = Sha256::new();
        hasher.update(previous);
        hasher.update(index.to_le_bytes());
        self.seal(hasher.finalize().into())
    }
}

impl Default for RecentBlocks {
    fn default() -> Self {
        Self::new(0)
    }
}

impl BlockHistory for RecentBlocks {
    fn current_index(&self) -> u64 {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).current
    }

    fn stored_hash(&self, index: u64) -> Option<[u8; 32]> {
        let blocks = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let age = blocks.current.checked_sub(index)?;
        let len = blocks.hashes.len() as u64;
        if age == 0 || age > len {
            return None;
        }
        blocks.hashes.get((len - age) as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(blocks: u64) -> RecentBlocks {
        let history = RecentBlocks::new(0);
        for _ in 0..blocks {
            history.seal_next();
        }
        history
    }

    #[test]
    fn current_block_reads_as_zero() {
        let history = filled(10);
        assert_eq!(history.current_index(), 10);
        assert_eq!(history.block_hash(10), ZERO_HASH);
        assert_eq!(history.block_hash(11), ZERO_HASH);
        assert_ne!(history.block_hash(9), ZERO_HASH);
    }

    #[test]
    fn window_edges() {
        let history = filled(1000);
        assert_ne!(history.block_hash(1000 - BLOCK_HASH_WINDOW), ZERO_HASH);
        assert_eq!(history.block_hash(1000 - BLOCK_HASH_WINDOW - 1), ZERO_HASH);
        assert_eq!(history.block_hash(0), ZERO_HASH);
    }

    #[test]
    fn sealed_hashes_are_distinct() {
        let history = filled(300);
        let a = history.block_hash(299);
        let b = history.block_hash(298);
        assert_ne!(a, b);
    }

    #[test]
    fn seal_returns_sealed_index() {
        let history = RecentBlocks::new(42);
        assert_eq!(history.seal([7u8; 32]), 42);
        assert_eq!(history.current_index(), 43);
        assert_eq!(history.block_hash(42), [7u8; 32]);
    }

    #[test]
    fn no_history_is_always_zero() {
        assert_eq!(NoHistory.block_hash(0), ZERO_HASH);
        assert_eq!(NoHistory.block_hash(u64::MAX), ZERO_HASH);
    }
}
