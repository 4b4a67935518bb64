//! Core identifiers with newtype pattern for type safety.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a component kernel inside a kernel repository.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KernelId(pub u16);

impl KernelId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "K{}", self.0)
    }
}

/// Symbol label shared by the imports and exports of one repository.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabelId(pub u16);

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// CSC coefficient slot addressed by the compositing kernels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoeffId(pub u8);

impl CoeffId {
    /// Slot reserved for the main-video (or render-target) matrix, served
    /// by the fast patch path.
    pub const PRIMARY: Self = Self(0);

    /// Number of coefficient slots the kernels can address.
    pub const SLOTS: usize = 6;

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CoeffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Identifier handed out to every combined kernel inserted into the cache.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CacheId(pub u32);

impl fmt::Display for CacheId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KC{}", self.0)
    }
}
