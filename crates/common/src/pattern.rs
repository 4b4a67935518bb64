//! Wildcard patterns used by rule predicates and operands used by rule actions.

use serde::{Deserialize, Serialize};

use crate::color::{FormatClass, PixelFormat};

/// Predicate literal that may be a wildcard.
///
/// `Any` matches any value that is set, `None` matches only an unset value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pattern<T> {
    Any,
    None,
    Is(T),
}

impl<T: PartialEq + Copy> Pattern<T> {
    pub fn matches(&self, value: Option<T>) -> bool {
        match (self, value) {
            (Self::Any, Some(_)) => true,
            (Self::None, None) => true,
            (Self::Is(expected), Some(v)) => *expected == v,
            _ => false,
        }
    }
}

impl<T> From<T> for Pattern<T> {
    fn from(v: T) -> Self {
        Self::Is(v)
    }
}

/// Value written by a set action.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand<T> {
    /// Copy the attribute from the layer under the cursor.
    Source,
    Clear,
    Value(T),
}

impl<T: Copy> Operand<T> {
    /// Resolve against the current layer's own value.
    pub fn resolve(&self, source: Option<T>) -> Option<T> {
        match self {
            Self::Source => source,
            Self::Clear => None,
            Self::Value(v) => Some(*v),
        }
    }
}

/// Format literal: an exact format or one of the format families.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatPattern {
    Any,
    None,
    Exact(PixelFormat),
    /// Packed RGB.
    Rgb,
    /// Packed 4:2:2 YUV.
    Packed,
    /// Two-plane YUV.
    Planar2,
    /// Three-plane YUV.
    Planar3,
    /// Three-plane RGB.
    Planar3Rgb,
}

impl FormatPattern {
    pub fn matches(&self, value: Option<PixelFormat>) -> bool {
        let Some(format) = value else {
            return *self == Self::None;
        };
        match self {
            Self::Any => true,
            Self::None => false,
            Self::Exact(f) => *f == format,
            Self::Rgb => format.class() == FormatClass::Rgb,
            Self::Packed => format.class() == FormatClass::Packed,
            Self::Planar2 => format.class() == FormatClass::Planar2,
            Self::Planar3 => format.class() == FormatClass::Planar3,
            Self::Planar3Rgb => format.class() == FormatClass::PlanarRgb,
        }
    }
}

impl From<PixelFormat> for FormatPattern {
    fn from(f: PixelFormat) -> Self {
        Self::Exact(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_semantics() {
        assert!(Pattern::<u8>::Any.matches(Some(3)));
        assert!(!Pattern::<u8>::Any.matches(None));
        assert!(Pattern::<u8>::None.matches(None));
        assert!(!Pattern::<u8>::None.matches(Some(0)));
        assert!(Pattern::Is(2u8).matches(Some(2)));
        assert!(!Pattern::Is(2u8).matches(Some(1)));
    }

    #[test]
    fn operand_resolution() {
        assert_eq!(Operand::<u8>::Source.resolve(Some(4)), Some(4));
        assert_eq!(Operand::<u8>::Clear.resolve(Some(4)), None);
        assert_eq!(Operand::Value(1u8).resolve(None), Some(1));
    }

    #[test]
    fn format_families() {
        assert!(FormatPattern::Planar2.matches(Some(PixelFormat::Nv12)));
        assert!(FormatPattern::Planar2.matches(Some(PixelFormat::P010)));
        assert!(!FormatPattern::Planar2.matches(Some(PixelFormat::Yv12)));
        assert!(FormatPattern::Rgb.matches(Some(PixelFormat::Rgb565)));
        assert!(!FormatPattern::Rgb.matches(Some(PixelFormat::Rgbp)));
        assert!(FormatPattern::Planar3Rgb.matches(Some(PixelFormat::Bgrp)));
        assert!(FormatPattern::None.matches(None));
        assert!(!FormatPattern::Any.matches(None));
    }
}
