//! Procamp as an affine transform in YUV code space.

use kdll_common::{ColorSpace, Procamp, Range};

use crate::matrix::Affine;
use crate::tables::{conversion, CHROMA_ZERO, LIMITED_BLACK};

/// Brightness/contrast on luma, hue rotation and saturation on chroma.
pub fn procamp_matrix(p: &Procamp, range: Range) -> Affine {
    let black = match range {
        Range::Limited => LIMITED_BLACK,
        Range::Full => 0.0,
    };
    let c = p.contrast;
    let (sin, cos) = p.hue.to_radians().sin_cos();
    let cs = cos * c * p.saturation;
    let sn = sin * c * p.saturation;
    Affine([
        c, 0.0, 0.0, black - black * c + p.brightness, //
        0.0, cs, sn, CHROMA_ZERO - CHROMA_ZERO * (cs + sn), //
        0.0, -sn, cs, CHROMA_ZERO - CHROMA_ZERO * (cs - sn),
    ])
}

/// Conversion `src -> dst` with the procamp folded in.
///
/// The procamp is applied in YUV: in `src` itself when it is a YUV space,
/// otherwise in `dst` (if YUV) or in BT.601 limited range.
pub fn conversion_with_procamp(src: ColorSpace, dst: ColorSpace, p: &Procamp) -> Affine {
    let yuv = if src.is_yuv() {
        src
    } else if dst.is_yuv() {
        dst
    } else {
        ColorSpace::Bt601
    };
    conversion(src, yuv)
        .then(&procamp_matrix(p, yuv.range()))
        .then(&conversion(yuv, dst))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_procamp_is_identity() {
        let p = Procamp::new(0.0, 1.0, 0.0, 1.0);
        assert!(procamp_matrix(&p, Range::Limited).approx_eq(&Affine::IDENTITY, 1e-5));
        assert!(procamp_matrix(&p, Range::Full).approx_eq(&Affine::IDENTITY, 1e-5));
    }

    #[test]
    fn brightness_shifts_luma_only() {
        let p = Procamp::new(10.0, 1.0, 0.0, 1.0);
        let out = procamp_matrix(&p, Range::Limited).apply([100.0, 128.0, 128.0]);
        assert!((out[0] - 110.0).abs() < 1e-4);
        assert!((out[1] - 128.0).abs() < 1e-4);
        assert!((out[2] - 128.0).abs() < 1e-4);
    }

    #[test]
    fn contrast_pivots_on_black() {
        let p = Procamp::new(0.0, 2.0, 0.0, 1.0);
        let m = procamp_matrix(&p, Range::Limited);
        assert!((m.apply([16.0, 128.0, 128.0])[0] - 16.0).abs() < 1e-4);
        assert!((m.apply([26.0, 128.0, 128.0])[0] - 36.0).abs() < 1e-4);
    }

    #[test]
    fn rgb_source_goes_through_yuv() {
        let p = Procamp::new(0.0, 1.0, 0.0, 1.0);
        let m = conversion_with_procamp(ColorSpace::Srgb, ColorSpace::Srgb, &p);
        assert!(m.approx_eq(&Affine::IDENTITY, 1e-2));
        let p = Procamp::new(0.0, 1.0, 0.0, 0.0);
        let grey = conversion_with_procamp(ColorSpace::Srgb, ColorSpace::Bt709, &p)
            .apply([200.0, 10.0, 10.0]);
        assert!((grey[1] - 128.0).abs() < 1e-3);
        assert!((grey[2] - 128.0).abs() < 1e-3);
    }
}
