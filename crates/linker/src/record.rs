//! Link records: one import or export of a component kernel.
//!
//! Two little-endian u32 words per record:
//!
//! ```text
//! word 0:  kuid:16 | label:16
//! word 1:  export:1 | resolved:1 | offset_dwords:20 | inline:1 | reserved:9
//! ```

use kdll_common::{KernelId, LabelId};
use serde::{Deserialize, Serialize};

pub const RECORD_SIZE: usize = 8;

const EXPORT_BIT: u32 = 1 << 0;
const RESOLVED_BIT: u32 = 1 << 1;
const OFFSET_SHIFT: u32 = 2;
const OFFSET_MASK: u32 = (1 << 20) - 1;
const INLINE_BIT: u32 = 1 << 22;

/// Largest representable offset, in dwords.
pub const MAX_OFFSET_DWORDS: u32 = OFFSET_MASK;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Kernel the record belongs to.
    pub kernel: KernelId,
    pub label: LabelId,
    pub export: bool,
    pub resolved: bool,
    /// Position inside the kernel, in dwords.
    pub offset_dwords: u32,
    /// Import: the defining kernel is placed right after this one and
    /// reached by fall-through. Export: only reachable by inlining.
    pub inline: bool,
}

impl LinkRecord {
    pub fn import(kernel: KernelId, label: LabelId, offset_dwords: u32) -> Self {
        Self {
            kernel,
            label,
            export: false,
            resolved: false,
            offset_dwords,
            inline: false,
        }
    }

    pub fn export(kernel: KernelId, label: LabelId, offset_dwords: u32) -> Self {
        Self {
            export: true,
            ..Self::import(kernel, label, offset_dwords)
        }
    }

    pub fn inlined(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn offset_bytes(&self) -> usize {
        self.offset_dwords as usize * 4
    }

    pub fn encode(&self) -> [u32; 2] {
        let w0 = u32::from(self.kernel.0) | (u32::from(self.label.0) << 16);
        let mut w1 = (self.offset_dwords & OFFSET_MASK) << OFFSET_SHIFT;
        if self.export {
            w1 |= EXPORT_BIT;
        }
        if self.resolved {
            w1 |= RESOLVED_BIT;
        }
        if self.inline {
            w1 |= INLINE_BIT;
        }
        [w0, w1]
    }

    pub fn decode([w0, w1]: [u32; 2]) -> Self {
        Self {
            kernel: KernelId((w0 & 0xFFFF) as u16),
            label: LabelId((w0 >> 16) as u16),
            export: w1 & EXPORT_BIT != 0,
            resolved: w1 & RESOLVED_BIT != 0,
            offset_dwords: (w1 >> OFFSET_SHIFT) & OFFSET_MASK,
            inline: w1 & INLINE_BIT != 0,
        }
    }
}
