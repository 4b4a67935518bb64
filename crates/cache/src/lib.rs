//! `kdll-cache` — Cache of linked combined kernels keyed by filter chain.
//!
//! - **Hash**: FNV-1a over the canonical chain key, folded to 256 buckets
//! - **Table**: collision chains threaded through a fixed arena
//! - **Pool**: fixed-block slots grown in increments up to a ceiling
//! - **Cache**: `KernelCache` with pinning, stats and LRU-by-counter eviction

pub mod cache;
pub mod hash;
pub mod pool;
pub mod table;

// Re-export commonly used items at crate root
pub use cache::{CacheEntry, CacheStats, CombinedKernel, KernelCache};
pub use hash::{bucket, chain_hash, fnv1a, fnv1a_extend, BUCKETS};
pub use pool::BlockPool;
pub use table::{HashEntry, HashTable};
