//! Float to fixed-point coefficient mapping.

use crate::matrix::Affine;

/// Converts a float conversion matrix into the 12 signed 16-bit values the
/// kernels consume. One implementation per hardware generation.
pub trait CoefficientMapping: Send + Sync {
    fn name(&self) -> &str;

    fn map(&self, matrix: &Affine) -> [i16; 12];
}

/// Multipliers in Q`multiplier_bits`, offsets in Q`offset_bits`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShiftMapping {
    pub multiplier_bits: u32,
    pub offset_bits: u32,
}

impl Default for ShiftMapping {
    fn default() -> Self {
        Self {
            multiplier_bits: 7,
            offset_bits: 4,
        }
    }
}

impl CoefficientMapping for ShiftMapping {
    fn name(&self) -> &str {
        "shift"
    }

    fn map(&self, matrix: &Affine) -> [i16; 12] {
        let mult = (1u32 << self.multiplier_bits) as f32;
        let off = (1u32 << self.offset_bits) as f32;
        let mut out = [0i16; 12];
        for (i, v) in matrix.0.iter().enumerate() {
            let scale = if i % 4 == 3 { off } else { mult };
            out[i] = to_fixed(*v * scale);
        }
        out
    }
}

/// Round half away from zero and saturate.
pub fn to_fixed(v: f32) -> i16 {
    let r = v.round();
    if r >= i16::MAX as f32 {
        i16::MAX
    } else if r <= i16::MIN as f32 {
        i16::MIN
    } else {
        r as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_and_saturation() {
        assert_eq!(to_fixed(2.5), 3);
        assert_eq!(to_fixed(-2.5), -3);
        assert_eq!(to_fixed(2.49), 2);
        assert_eq!(to_fixed(1e9), i16::MAX);
        assert_eq!(to_fixed(-1e9), i16::MIN);
    }

    #[test]
    fn default_mapping_scales() {
        let m = ShiftMapping::default().map(&Affine::IDENTITY);
        assert_eq!(m, [128, 0, 0, 0, 0, 128, 0, 0, 0, 0, 128, 0]);
        let shifted = Affine::scale_offset([1.0; 3], [16.0, -128.0, 0.5]);
        let m = ShiftMapping::default().map(&shifted);
        assert_eq!((m[3], m[7], m[11]), (256, -2048, 8));
    }
}
