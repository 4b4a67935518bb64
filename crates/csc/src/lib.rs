//! `kdll-csc` — Colorspace conversion for the KDLL engine.
//!
//! - **Matrix**: `Affine`, a 3x4 transform in 8-bit code space
//! - **Tables**: per-colorspace conversions to and from full-range RGB
//! - **Procamp**: brightness/contrast/hue/saturation folded into a conversion
//! - **Fixed point**: `CoefficientMapping` strategy (`ShiftMapping` default)
//! - **Planner**: `CscPlanner` picks the working colorspace and assigns
//!   coefficient slots, producing `CscParams`

pub mod fixed;
pub mod matrix;
pub mod planner;
pub mod procamp;
pub mod tables;

pub use fixed::{to_fixed, CoefficientMapping, ShiftMapping};
pub use matrix::Affine;
pub use planner::{select_working, CscMatrix, CscParams, CscPlanner};
pub use procamp::{conversion_with_procamp, procamp_matrix};
pub use tables::{conversion, from_rgb, to_rgb};
