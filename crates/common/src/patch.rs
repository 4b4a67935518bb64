//! Constant patch data attached to selected kernels.

use serde::{Deserialize, Serialize};

/// Source of the bytes fetched by a `SetPatchData` action.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatchKind {
    /// CSC coefficients of the matrix used by src0.
    CscCoeffSrc0,
    /// CSC coefficients of the matrix used by src1.
    CscCoeffSrc1,
}

/// Copy `size` bytes from offset `src` of the record's data to byte `dst`
/// of the kernel binary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatchBlock {
    pub dst: u16,
    pub src: u8,
    pub size: u8,
}

impl PatchBlock {
    pub const fn new(dst: u16, src: u8, size: u8) -> Self {
        Self { dst, src, size }
    }

    pub fn src_end(&self) -> usize {
        self.src as usize + self.size as usize
    }

    pub fn dst_end(&self) -> usize {
        self.dst as usize + self.size as usize
    }
}

/// Patch data plus the blocks describing where it goes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRecord {
    pub data: Vec<u8>,
    pub blocks: Vec<PatchBlock>,
}

impl PatchRecord {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
