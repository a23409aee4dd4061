//! Per-chain cache of the highest block known to be finalized.

use dashmap::DashMap;
use std::sync::Arc;

use crate::evm::types::ChainName;
use crate::observability::metrics;

/// Thread-safe, shared by every concurrent flow. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FinalizedBlockCache {
    inner: Arc<DashMap<ChainName, u64>>,
}

impl FinalizedBlockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest finalized height seen for `chain`, 0 when unknown.
    pub fn get(&self, chain: &ChainName) -> u64 {
        self.inner.get(chain).map(|entry| *entry.value()).unwrap_or(0)
    }

    /// Record `height`; never moves an entry backwards.
    pub fn set(&self, chain: &ChainName, height: u64) {
        let mut entry = self.inner.entry(chain.clone()).or_insert(0);
        if height > *entry {
            *entry = height;
            metrics::record_finalized_height(chain.as_str(), height);
        }
    }

    /// Whether `block` is already known to be finalized on `chain`. A height of
    /// 0 means unknown, so a cold cache covers nothing, not even block 0.
    pub fn covers(&self, chain: &ChainName, block: u64) -> bool {
        let known = self.get(chain);
        let hit = known > 0 && known >= block;
        metrics::record_cache_lookup(chain.as_str(), hit);
        hit
    }
}
