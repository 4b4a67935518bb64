//! Filter-chain hashing.

use kdll_common::{chain_key, FilterEntry};

pub const BUCKETS: usize = 256;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
pub fn fnv1a(bytes: &[u8]) -> u32 {
    fnv1a_extend(FNV_OFFSET, bytes)
}

/// Continue an FNV-1a hash over more bytes.
pub fn fnv1a_extend(hash: u32, bytes: &[u8]) -> u32 {
    bytes.iter().fold(hash, |h, b| {
        (h ^ u32::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// Fold a 32-bit hash to its bucket by xor-ing the four bytes.
pub fn bucket(hash: u32) -> u8 {
    let [a, b, c, d] = hash.to_le_bytes();
    a ^ b ^ c ^ d
}

pub fn chain_hash(chain: &[FilterEntry]) -> u32 {
    fnv1a(&chain_key(chain))
}
