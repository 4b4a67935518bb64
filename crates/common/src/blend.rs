//! Layer processing (blend) modes.

use serde::{Deserialize, Serialize};

/// How a sampled layer is combined with the layers beneath it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Processing {
    /// Opaque source-over.
    Composite,
    XorComposite,
    /// Premultiplied source alpha.
    PartialBlend,
    /// Constant alpha.
    ConstBlend,
    /// Per-pixel source alpha.
    SourceBlend,
    /// 4-bit source alpha (palettised sub pictures).
    SourceBlend4Bits,
    ConstSourceBlend,
    ConstPartialBlend,
    Deinterlace,
    Denoise,
    DenoiseDeinterlace,
}

impl Processing {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Composite => "Composite",
            Self::XorComposite => "XOR Composite",
            Self::PartialBlend => "Partial Blend",
            Self::ConstBlend => "Constant Blend",
            Self::SourceBlend => "Source Blend",
            Self::SourceBlend4Bits => "Source Blend (4 bit)",
            Self::ConstSourceBlend => "Constant Source Blend",
            Self::ConstPartialBlend => "Constant Partial Blend",
            Self::Deinterlace => "Deinterlace",
            Self::Denoise => "Denoise",
            Self::DenoiseDeinterlace => "Denoise + Deinterlace",
        }
    }

    /// Blend modes that read the source alpha channel.
    pub fn uses_source_alpha(self) -> bool {
        matches!(
            self,
            Self::PartialBlend
                | Self::SourceBlend
                | Self::SourceBlend4Bits
                | Self::ConstSourceBlend
                | Self::ConstPartialBlend
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_usage() {
        assert!(Processing::PartialBlend.uses_source_alpha());
        assert!(!Processing::Composite.uses_source_alpha());
        assert!(!Processing::ConstBlend.uses_source_alpha());
    }
}
