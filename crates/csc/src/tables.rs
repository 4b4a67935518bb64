//! Per-colorspace conversion tables.
//!
//! Everything is expressed in 8-bit code values. YUV spaces convert to and
//! from full-range RGB of the same standard; gamut (primaries) conversion is
//! not performed.

use kdll_common::{ColorSpace, Range, YuvStandard};

use crate::matrix::Affine;

// ---------------------------------------------------------------------------
// Matrix coefficients (normalized, full range)
// ---------------------------------------------------------------------------

const BT601_RGB_TO_YUV: [f32; 9] = [
    0.299, 0.587, 0.114, //
    -0.168736, -0.331264, 0.5, //
    0.5, -0.418688, -0.081312,
];

const BT601_YUV_TO_RGB: [f32; 9] = [
    1.0, 0.0, 1.402, //
    1.0, -0.344136, -0.714136, //
    1.0, 1.772, 0.0,
];

const BT709_RGB_TO_YUV: [f32; 9] = [
    0.2126, 0.7152, 0.0722, //
    -0.114572, -0.385428, 0.5, //
    0.5, -0.454153, -0.045847,
];

const BT709_YUV_TO_RGB: [f32; 9] = [
    1.0, 0.0, 1.5748, //
    1.0, -0.187324, -0.468124, //
    1.0, 1.8556, 0.0,
];

const BT2020_RGB_TO_YUV: [f32; 9] = [
    0.2627, 0.678, 0.0593, //
    -0.13963, -0.36037, 0.5, //
    0.5, -0.459786, -0.040214,
];

const BT2020_YUV_TO_RGB: [f32; 9] = [
    1.0, 0.0, 1.4746, //
    1.0, -0.164553, -0.571353, //
    1.0, 1.8814, 0.0,
];

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

const LUMA_SPAN: f32 = 219.0;
const CHROMA_SPAN: f32 = 224.0;
const FULL_SPAN: f32 = 255.0;
/// Black level of limited-range luma / studio RGB.
pub const LIMITED_BLACK: f32 = 16.0;
pub const CHROMA_ZERO: f32 = 128.0;

fn rgb_to_yuv(standard: YuvStandard) -> [f32; 9] {
    match standard {
        YuvStandard::Bt601 => BT601_RGB_TO_YUV,
        YuvStandard::Bt709 => BT709_RGB_TO_YUV,
        YuvStandard::Bt2020 => BT2020_RGB_TO_YUV,
    }
}

fn yuv_to_rgb(standard: YuvStandard) -> [f32; 9] {
    match standard {
        YuvStandard::Bt601 => BT601_YUV_TO_RGB,
        YuvStandard::Bt709 => BT709_YUV_TO_RGB,
        YuvStandard::Bt2020 => BT2020_YUV_TO_RGB,
    }
}

/// Scale from code values to full-range units and the code-value origin.
fn yuv_quantization(range: Range) -> ([f32; 3], [f32; 3]) {
    match range {
        Range::Limited => (
            [
                FULL_SPAN / LUMA_SPAN,
                FULL_SPAN / CHROMA_SPAN,
                FULL_SPAN / CHROMA_SPAN,
            ],
            [LIMITED_BLACK, CHROMA_ZERO, CHROMA_ZERO],
        ),
        Range::Full => ([1.0, 1.0, 1.0], [0.0, CHROMA_ZERO, CHROMA_ZERO]),
    }
}

fn mul3(a: &[f32; 9], s: [f32; 3]) -> [f32; 9] {
    // a * diag(s)
    let mut out = *a;
    for r in 0..3 {
        for c in 0..3 {
            out[r * 3 + c] *= s[c];
        }
    }
    out
}

fn diag_mul3(s: [f32; 3], a: &[f32; 9]) -> [f32; 9] {
    // diag(s) * a
    let mut out = *a;
    for r in 0..3 {
        for c in 0..3 {
            out[r * 3 + c] *= s[r];
        }
    }
    out
}

/// Code values of `cs` to full-range RGB.
pub fn to_rgb(cs: ColorSpace) -> Affine {
    if cs.is_rgb() {
        return match cs.range() {
            Range::Full => Affine::IDENTITY,
            Range::Limited => {
                let s = FULL_SPAN / LUMA_SPAN;
                Affine::scale_offset([s; 3], [-LIMITED_BLACK * s; 3])
            }
        };
    }
    let (scale, origin) = yuv_quantization(cs.range());
    let m = mul3(&yuv_to_rgb(cs.standard()), scale);
    let mut offset = [0.0f32; 3];
    for (r, o) in offset.iter_mut().enumerate() {
        *o = -(0..3).map(|c| m[r * 3 + c] * origin[c]).sum::<f32>();
    }
    Affine::from_parts(m, offset)
}

/// Full-range RGB to code values of `cs`.
pub fn from_rgb(cs: ColorSpace) -> Affine {
    if cs.is_rgb() {
        return match cs.range() {
            Range::Full => Affine::IDENTITY,
            Range::Limited => {
                Affine::scale_offset([LUMA_SPAN / FULL_SPAN; 3], [LIMITED_BLACK; 3])
            }
        };
    }
    let (scale, origin) = yuv_quantization(cs.range());
    let inv = [1.0 / scale[0], 1.0 / scale[1], 1.0 / scale[2]];
    let m = diag_mul3(inv, &rgb_to_yuv(cs.standard()));
    Affine::from_parts(m, origin)
}

/// Conversion from `src` code values to `dst` code values.
///
/// YUV to YUV conversions between standards pass through full-range RGB.
pub fn conversion(src: ColorSpace, dst: ColorSpace) -> Affine {
    if src == dst {
        return Affine::IDENTITY;
    }
    to_rgb(src).then(&from_rgb(dst))
}
