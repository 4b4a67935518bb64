//! Per-layer composition attributes: role, rotation, sampling and surface
//! layout.

use serde::{Deserialize, Serialize};

/// Role of a filter entry within the composition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerRole {
    Background,
    MainVideo,
    SubVideo,
    SubPicture1,
    SubPicture2,
    SubPicture3,
    SubPicture4,
    Graphics,
    RenderTarget,
}

impl LayerRole {
    /// Legacy numeric id, kept for the opcode decoder and diagnostics.
    pub fn legacy_id(self) -> i32 {
        match self {
            Self::Background => 0,
            Self::MainVideo => 1,
            Self::SubVideo => 2,
            Self::SubPicture1 => 3,
            Self::SubPicture2 => 4,
            Self::SubPicture3 => 5,
            Self::SubPicture4 => 6,
            Self::Graphics => 14,
            Self::RenderTarget => 15,
        }
    }

    pub fn from_legacy_id(id: i32) -> Option<Self> {
        Some(match id {
            0 => Self::Background,
            1 => Self::MainVideo,
            2 => Self::SubVideo,
            3 => Self::SubPicture1,
            4 => Self::SubPicture2,
            5 => Self::SubPicture3,
            6 => Self::SubPicture4,
            14 => Self::Graphics,
            15 => Self::RenderTarget,
            _ => return None,
        })
    }

    pub fn is_render_target(self) -> bool {
        self == Self::RenderTarget
    }
}

/// Rotation / mirroring applied while sampling a layer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
    MirrorHorizontal,
    MirrorVertical,
    /// Rotate 90 then mirror vertically.
    Rotate90MirrorVertical,
    /// Rotate 90 then mirror horizontally.
    Rotate90MirrorHorizontal,
}

impl Rotation {
    pub fn is_identity(self) -> bool {
        self == Self::Identity
    }
}

/// Sampler mode used to fetch a layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sampling {
    /// 16-bit 4:4:4 bilinear scaling.
    Scaling,
    /// Scaling with a factor at or below 0.34 (downscale path).
    Scaling034x,
    /// Interlaced (field) scaling.
    IScaling,
    IScaling034x,
    IScalingAvs,
    /// Adaptive video scaler (8x8 sampler output).
    ScalingAvs,
}

impl Sampling {
    /// Samplers producing 8x8-tiled output that needs reordering.
    pub fn is_avs(self) -> bool {
        matches!(self, Self::ScalingAvs | Self::IScalingAvs)
    }

    pub fn is_interlaced(self) -> bool {
        matches!(self, Self::IScaling | Self::IScaling034x | Self::IScalingAvs)
    }
}

/// Scaling-ratio bucket used by walker-based generations to pick a block size.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalingRatio {
    /// Upscale (factor above 1).
    Over1,
    /// (1/2, 1]
    B1p2To1,
    /// (1/4, 1/2]
    B1p4To1p2,
    /// (1/8, 1/4]
    B1p8To1p4,
    /// Anything smaller, or unknown.
    #[default]
    Any,
}

impl ScalingRatio {
    pub fn from_factor(factor: f32) -> Self {
        if factor > 1.0 {
            Self::Over1
        } else if factor > 0.5 {
            Self::B1p2To1
        } else if factor > 0.25 {
            Self::B1p4To1p2
        } else if factor > 0.125 {
            Self::B1p8To1p4
        } else {
            Self::Any
        }
    }
}

/// Memory tiling of a surface.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    #[default]
    Linear,
    TileX,
    TileY,
    TileYs,
}

/// How the combined kernel is dispatched.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderMethod {
    #[default]
    MediaObject,
    MediaWalker,
}

/// How CSC coefficients reach the kernel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CscCoeffMode {
    /// Constant URB entry (runtime constants).
    #[default]
    Curbe,
    /// Immediate values patched into the kernel binary.
    Patch,
}

/// Sampler output reordering applied by the save kernels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shuffling {
    #[default]
    None,
    /// Reorder every AVS-sampled layer into the common 16x16 layout.
    All8x8Layer,
    /// Write the render target directly in AVS order.
    RenderTarget,
}
