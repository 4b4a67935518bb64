//! 3x4 affine transforms in 8-bit code space.
//!
//! Layout is row-major with the offset in the fourth column:
//!
//! ```text
//! | m0  m1  m2  | m3  |
//! | m4  m5  m6  | m7  |
//! | m8  m9  m10 | m11 |
//! ```

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affine(pub [f32; 12]);

impl Affine {
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0,
    ]);

    /// Build from a 3x3 matrix and an offset vector.
    pub fn from_parts(m: [f32; 9], offset: [f32; 3]) -> Self {
        Self([
            m[0], m[1], m[2], offset[0], //
            m[3], m[4], m[5], offset[1], //
            m[6], m[7], m[8], offset[2],
        ])
    }

    /// Per-channel scale followed by an offset.
    pub fn scale_offset(scale: [f32; 3], offset: [f32; 3]) -> Self {
        Self::from_parts(
            [scale[0], 0.0, 0.0, 0.0, scale[1], 0.0, 0.0, 0.0, scale[2]],
            offset,
        )
    }

    pub fn offset(&self, row: usize) -> f32 {
        self.0[row * 4 + 3]
    }

    /// `self` applied after `first`: `x -> self(first(x))`.
    pub fn after(&self, first: &Affine) -> Affine {
        let a = &first.0;
        let b = &self.0;
        let mut out = [0.0f32; 12];
        for r in 0..3 {
            for c in 0..3 {
                out[r * 4 + c] = (0..3).map(|k| b[r * 4 + k] * a[k * 4 + c]).sum();
            }
            out[r * 4 + 3] = (0..3).map(|k| b[r * 4 + k] * a[k * 4 + 3]).sum::<f32>() + b[r * 4 + 3];
        }
        Affine(out)
    }

    /// `first` then `self`, written left to right.
    pub fn then(&self, next: &Affine) -> Affine {
        next.after(self)
    }

    pub fn apply(&self, x: [f32; 3]) -> [f32; 3] {
        let m = &self.0;
        let mut out = [0.0f32; 3];
        for (r, o) in out.iter_mut().enumerate() {
            *o = m[r * 4] * x[0] + m[r * 4 + 1] * x[1] + m[r * 4 + 2] * x[2] + m[r * 4 + 3];
        }
        out
    }

    pub fn approx_eq(&self, other: &Affine, eps: f32) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    pub fn is_identity(&self) -> bool {
        self.approx_eq(&Self::IDENTITY, 1e-6)
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Index<usize> for Affine {
    type Output = f32;

    fn index(&self, i: usize) -> &f32 {
        &self.0[i]
    }
}

impl fmt::Debug for Affine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "Affine[[{:.6} {:.6} {:.6} | {:.4}] [{:.6} {:.6} {:.6} | {:.4}] [{:.6} {:.6} {:.6} | {:.4}]]",
            m[0], m[1], m[2], m[3], m[4], m[5], m[6], m[7], m[8], m[9], m[10], m[11]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_neutral() {
        let a = Affine::from_parts([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0], [1.0, 2.0, 3.0]);
        assert!(a.after(&Affine::IDENTITY).approx_eq(&a, 1e-6));
        assert!(Affine::IDENTITY.after(&a).approx_eq(&a, 1e-6));
    }

    #[test]
    fn composition_order() {
        let scale = Affine::scale_offset([2.0, 2.0, 2.0], [0.0, 0.0, 0.0]);
        let shift = Affine::scale_offset([1.0, 1.0, 1.0], [1.0, 1.0, 1.0]);
        // scale, then shift: 2x + 1
        let m = scale.then(&shift);
        assert_eq!(m.apply([3.0, 0.0, 1.0]), [7.0, 1.0, 3.0]);
        // shift, then scale: 2(x + 1)
        let m = shift.then(&scale);
        assert_eq!(m.apply([3.0, 0.0, 1.0]), [8.0, 2.0, 4.0]);
    }
}
