//! Surface formats and colorspaces understood by the kernel selector.

use serde::{Deserialize, Serialize};

/// Surface format of a layer or of the render target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Argb8,
    Xrgb8,
    Abgr8,
    Xbgr8,
    Rgb565,
    R10G10B10A2,
    B10G10R10A2,
    /// Packed 4:4:4 YUV with alpha.
    Ayuv,
    Yuy2,
    Yuyv,
    Yvyu,
    Uyvy,
    Vyuy,
    /// Y plane + interleaved UV at half resolution.
    Nv12,
    Nv21,
    /// 10-bit NV12 variant.
    P010,
    Yv12,
    I420,
    /// Luma only.
    Y400,
    /// Three-plane RGB.
    Rgbp,
    Bgrp,
}

/// Coarse format families used by rule predicates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatClass {
    /// Packed RGB (8-bit, 5:6:5 and 10-bit variants).
    Rgb,
    Ayuv,
    /// Packed 4:2:2 YUV.
    Packed,
    /// Two-plane YUV.
    Planar2,
    /// Three-plane YUV.
    Planar3,
    /// Three-plane RGB.
    PlanarRgb,
    Luma,
}

impl PixelFormat {
    pub fn class(self) -> FormatClass {
        match self {
            Self::Argb8
            | Self::Xrgb8
            | Self::Abgr8
            | Self::Xbgr8
            | Self::Rgb565
            | Self::R10G10B10A2
            | Self::B10G10R10A2 => FormatClass::Rgb,
            Self::Ayuv => FormatClass::Ayuv,
            Self::Yuy2 | Self::Yuyv | Self::Yvyu | Self::Uyvy | Self::Vyuy => FormatClass::Packed,
            Self::Nv12 | Self::Nv21 | Self::P010 => FormatClass::Planar2,
            Self::Yv12 | Self::I420 => FormatClass::Planar3,
            Self::Rgbp | Self::Bgrp => FormatClass::PlanarRgb,
            Self::Y400 => FormatClass::Luma,
        }
    }

    pub fn is_yuv(self) -> bool {
        !matches!(self.class(), FormatClass::Rgb | FormatClass::PlanarRgb)
    }

    /// 32-bit packed RGB, the formats eligible for wide saves.
    pub fn is_rgb32(self) -> bool {
        matches!(self, Self::Argb8 | Self::Xrgb8 | Self::Abgr8 | Self::Xbgr8)
    }

    pub fn has_alpha(self) -> bool {
        matches!(
            self,
            Self::Argb8 | Self::Abgr8 | Self::R10G10B10A2 | Self::B10G10R10A2 | Self::Ayuv
        )
    }
}

/// YUV matrix standard.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YuvStandard {
    Bt601,
    Bt709,
    Bt2020,
}

/// Quantization range of a colorspace.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Range {
    /// 16..235 luma / 16..240 chroma (or the studio RGB equivalent).
    Limited,
    Full,
}

/// Colorspace of a layer or render target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSpace {
    Bt601,
    Bt709,
    Bt601FullRange,
    Bt709FullRange,
    XvYcc601,
    XvYcc709,
    Bt2020,
    Bt2020FullRange,
    /// Full-range RGB.
    Srgb,
    /// Studio (limited-range) RGB.
    StRgb,
    Bt2020Rgb,
    Bt2020StRgb,
}

impl ColorSpace {
    pub fn is_rgb(self) -> bool {
        matches!(
            self,
            Self::Srgb | Self::StRgb | Self::Bt2020Rgb | Self::Bt2020StRgb
        )
    }

    pub fn is_yuv(self) -> bool {
        !self.is_rgb()
    }

    /// Matrix standard; RGB spaces report the standard of their gamut.
    pub fn standard(self) -> YuvStandard {
        match self {
            Self::Bt601 | Self::Bt601FullRange | Self::XvYcc601 => YuvStandard::Bt601,
            Self::Bt709 | Self::Bt709FullRange | Self::XvYcc709 | Self::Srgb | Self::StRgb => {
                YuvStandard::Bt709
            }
            Self::Bt2020 | Self::Bt2020FullRange | Self::Bt2020Rgb | Self::Bt2020StRgb => {
                YuvStandard::Bt2020
            }
        }
    }

    pub fn range(self) -> Range {
        match self {
            Self::Bt601FullRange | Self::Bt709FullRange | Self::Bt2020FullRange => Range::Full,
            Self::Srgb | Self::Bt2020Rgb => Range::Full,
            Self::Bt601
            | Self::Bt709
            | Self::XvYcc601
            | Self::XvYcc709
            | Self::Bt2020
            | Self::StRgb
            | Self::Bt2020StRgb => Range::Limited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_classes() {
        assert_eq!(PixelFormat::Nv12.class(), FormatClass::Planar2);
        assert_eq!(PixelFormat::Yuy2.class(), FormatClass::Packed);
        assert_eq!(PixelFormat::Rgbp.class(), FormatClass::PlanarRgb);
        assert!(PixelFormat::Ayuv.is_yuv());
        assert!(!PixelFormat::Argb8.is_yuv());
        assert!(PixelFormat::Xbgr8.is_rgb32());
        assert!(!PixelFormat::Rgb565.is_rgb32());
    }

    #[test]
    fn colorspace_families() {
        assert!(ColorSpace::Srgb.is_rgb());
        assert!(ColorSpace::XvYcc709.is_yuv());
        assert_eq!(ColorSpace::Bt2020StRgb.standard(), YuvStandard::Bt2020);
        assert_eq!(ColorSpace::Bt709FullRange.range(), Range::Full);
        assert_eq!(ColorSpace::StRgb.range(), Range::Limited);
    }
}
