//! Combined-kernel cache.
//!
//! A chain is searched and built at most once while its entry stays
//! resident. Lookups walk the bucket's collision chain comparing hash and
//! key bytes. When the pool is saturated, the unpinned entry with the
//! smallest usage counter is evicted.

use kdll_common::{chain_key, CacheConfig, CacheError, CacheId, FilterEntry};
use kdll_csc::CscParams;
use kdll_linker::LinkedKernel;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::hash::fnv1a;
use crate::pool::BlockPool;
use crate::table::HashTable;

/// What a build produces and the cache keeps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombinedKernel {
    pub linked: LinkedKernel,
    pub csc: CscParams,
}

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub id: CacheId,
    pub hash: u32,
    pub kernel: CombinedKernel,
    /// Value of the cache's usage counter at the last hit or insert.
    pub usage: u32,
    /// Pinned entries are never evicted.
    pub pinned: bool,
    hash_slot: usize,
}

impl CacheEntry {
    pub fn binary(&self) -> &[u8] {
        &self.kernel.linked.binary
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    /// Pool slots allocated so far.
    pub capacity: usize,
}

pub struct KernelCache {
    table: HashTable,
    pool: BlockPool<CacheEntry>,
    block_size: usize,
    rebase_threshold: u32,
    counter: u32,
    next_id: u32,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl KernelCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            table: HashTable::new(config.max_entries),
            pool: BlockPool::new(
                config.initial_entries,
                config.grow_entries,
                config.max_entries,
            ),
            block_size: config.block_size,
            rebase_threshold: config.rebase_threshold,
            counter: 0,
            next_id: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Find the entry for a chain key. A hit bumps its usage counter.
    pub fn lookup(&mut self, key: &[u8], hash: u32) -> Option<&CacheEntry> {
        match self.find_slot(key, hash) {
            Some(slot) => {
                self.hits += 1;
                self.touch(slot);
                self.pool.get(slot)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a freshly built kernel, evicting if the pool is saturated.
    pub fn insert(
        &mut self,
        key: Vec<u8>,
        hash: u32,
        kernel: CombinedKernel,
    ) -> Result<&CacheEntry, CacheError> {
        let size = kernel.linked.binary.len();
        if size > self.block_size {
            return Err(CacheError::EntryTooLarge {
                size,
                block: self.block_size,
            });
        }

        let slot = match self.pool.allocate() {
            Some(slot) => slot,
            None => {
                self.collect()?;
                self.pool.allocate().ok_or(CacheError::PoolExhausted {
                    capacity: self.pool.capacity(),
                })?
            }
        };
        let Some(hash_slot) = self.table.insert(hash, key, slot) else {
            self.pool.unreserve(slot);
            return Err(CacheError::PoolExhausted {
                capacity: self.pool.capacity(),
            });
        };

        let id = CacheId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.pool.store(
            slot,
            CacheEntry {
                id,
                hash,
                kernel,
                usage: 0,
                pinned: false,
                hash_slot,
            },
        );
        self.touch(slot);
        debug!(
            id = %id,
            hash,
            bytes = size,
            entries = self.table.len(),
            "Cached combined kernel"
        );
        self.entry(slot)
    }

    /// Return the cached kernel for `chain`, running `build` on a miss.
    ///
    /// `hash` is trusted as the chain's hash; the key bytes are still
    /// compared, so a colliding hash never produces a false hit. A failed
    /// build inserts nothing.
    pub fn lookup_or_build<E, F>(
        &mut self,
        chain: &[FilterEntry],
        hash: u32,
        build: F,
    ) -> Result<&CacheEntry, E>
    where
        E: From<CacheError>,
        F: FnOnce() -> Result<CombinedKernel, E>,
    {
        self.lookup_or_build_keyed(chain_key(chain), hash, build)
    }

    /// [`lookup_or_build`](Self::lookup_or_build) with the FNV-1a hash of
    /// the chain key.
    pub fn lookup_or_build_hashed<E, F>(
        &mut self,
        chain: &[FilterEntry],
        build: F,
    ) -> Result<&CacheEntry, E>
    where
        E: From<CacheError>,
        F: FnOnce() -> Result<CombinedKernel, E>,
    {
        let key = chain_key(chain);
        let hash = fnv1a(&key);
        self.lookup_or_build_keyed(key, hash, build)
    }

    /// Lookup-or-build over caller-composed key bytes, for requests whose
    /// identity covers more than the filter chain.
    pub fn lookup_or_build_keyed<E, F>(
        &mut self,
        key: Vec<u8>,
        hash: u32,
        build: F,
    ) -> Result<&CacheEntry, E>
    where
        E: From<CacheError>,
        F: FnOnce() -> Result<CombinedKernel, E>,
    {
        if let Some(slot) = self.find_slot(&key, hash) {
            self.hits += 1;
            self.touch(slot);
            debug!(hash, "Kernel cache hit");
            return Ok(self.entry(slot)?);
        }
        self.misses += 1;
        debug!(hash, "Kernel cache miss");
        let kernel = build()?;
        Ok(self.insert(key, hash, kernel)?)
    }

    pub fn get(&self, id: CacheId) -> Option<&CacheEntry> {
        self.pool.iter().map(|(_, e)| e).find(|e| e.id == id)
    }

    pub fn pin(&mut self, id: CacheId) -> bool {
        self.set_pinned(id, true)
    }

    pub fn unpin(&mut self, id: CacheId) -> bool {
        self.set_pinned(id, false)
    }

    fn set_pinned(&mut self, id: CacheId, pinned: bool) -> bool {
        match self.pool.iter_mut().find(|e| e.id == id) {
            Some(e) => {
                e.pinned = pinned;
                true
            }
            None => false,
        }
    }

    /// Drop an entry. Pool blocks grown past the initial size are returned
    /// once they trail the pool empty.
    pub fn remove(&mut self, id: CacheId) -> Option<CacheEntry> {
        let slot = self.pool.iter().find(|(_, e)| e.id == id).map(|(s, _)| s)?;
        let entry = self.evict(slot);
        self.release_additional();
        entry
    }

    /// Return vacant pool blocks at the end of the pool, keeping the
    /// initial allocation. Returns the number of blocks released.
    pub fn release_additional(&mut self) -> usize {
        let released = self.pool.release_additional();
        if released > 0 {
            debug!(
                released,
                capacity = self.pool.capacity(),
                "Released grown kernel cache blocks"
            );
        }
        released
    }

    /// Mutable access for in-place coefficient refresh.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut CacheEntry> {
        self.pool.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn usage_counter(&self) -> u32 {
        self.counter
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            entries: self.table.len(),
            capacity: self.pool.capacity(),
        }
    }

    // ── internal helpers ──────────────────────────────────────────

    fn entry(&self, slot: usize) -> Result<&CacheEntry, CacheError> {
        self.pool.get(slot).ok_or(CacheError::MissingEntry { slot })
    }

    fn find_slot(&self, key: &[u8], hash: u32) -> Option<usize> {
        let index = self.table.find(hash, key)?;
        self.table.get(index).map(|e| e.slot)
    }

    fn touch(&mut self, slot: usize) {
        self.counter = self.counter.wrapping_add(1);
        let counter = self.counter;
        if let Some(e) = self.pool.get_mut(slot) {
            e.usage = counter;
        }
        if self.counter >= self.rebase_threshold {
            self.rebase();
        }
    }

    /// Renumber usage counters 1..=n in their current order.
    fn rebase(&mut self) {
        let mut order: Vec<(u32, usize)> = self.pool.iter().map(|(s, e)| (e.usage, s)).collect();
        order.sort_unstable();
        for (rank, (_, slot)) in order.iter().enumerate() {
            if let Some(e) = self.pool.get_mut(*slot) {
                e.usage = rank as u32 + 1;
            }
        }
        self.counter = order.len() as u32;
        debug!(entries = order.len(), "Rebased kernel cache usage counters");
    }

    /// Evict the least recently used unpinned entry.
    fn collect(&mut self) -> Result<(), CacheError> {
        let victim = self
            .pool
            .iter()
            .filter(|(_, e)| !e.pinned)
            .min_by_key(|(_, e)| e.usage)
            .map(|(slot, _)| slot);
        let Some(slot) = victim else {
            warn!(
                capacity = self.pool.capacity(),
                "Kernel cache full and every entry is pinned"
            );
            return Err(CacheError::PoolExhausted {
                capacity: self.pool.capacity(),
            });
        };
        if let Some(e) = self.evict(slot) {
            self.evictions += 1;
            debug!(id = %e.id, usage = e.usage, "Evicted cached kernel");
        }
        Ok(())
    }

    fn evict(&mut self, slot: usize) -> Option<CacheEntry> {
        let entry = self.pool.release(slot)?;
        self.table.remove(entry.hash_slot);
        Some(entry)
    }
}

impl std::fmt::Debug for KernelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelCache")
            .field("entries", &self.table.len())
            .field("capacity", &self.pool.capacity())
            .field("counter", &self.counter)
            .finish()
    }
}
