//! Rule model: predicates, actions and the tagged rule stream.
//!
//! A rule stream is a flat sequence of [`Rule`]s. Each rule set starts with
//! [`Rule::NewEntry`], continues with match rules (the first one must test
//! the parser state) and ends with one or more actions. The stream is
//! terminated by [`Rule::Eof`].

use kdll_common::{
    CoeffId, ColorSpace, CscCoeffMode, FormatPattern, LayerRole, Operand, PatchBlock, PatchKind,
    Pattern, PixelFormat, Processing, RenderMethod, Rotation, RuleGroup, Sampling, ScalingRatio,
    Shuffling, TileType, KernelId,
};
use serde::{Deserialize, Serialize};

use crate::state::ParserState;

/// How a match rule combines with its neighbours.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Logic {
    /// Plain AND with the rest of the set (also terminates an `Or` group).
    #[default]
    None,
    /// Member of a contiguous OR group.
    Or,
    /// Inverted comparison.
    Not,
}

/// Cursor movement for [`Action::NextLayer`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerStep {
    Next,
    Previous,
    ToRenderTarget,
    /// Back to the main-video layer (linear scan from the start).
    ToMainVideo,
}

impl LayerStep {
    pub fn legacy_value(self) -> i32 {
        match self {
            Self::Next => 0,
            Self::Previous => -1,
            Self::ToRenderTarget => 2,
            Self::ToMainVideo => -2,
        }
    }

    pub fn from_legacy(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Next,
            -1 => Self::Previous,
            2 => Self::ToRenderTarget,
            -2 => Self::ToMainVideo,
            _ => return None,
        })
    }
}

/// One attribute test.
///
/// `Layer*` predicates read the filter entry under the cursor, `Src0*` and
/// `Src1*` read the working source slots, `Target*` read the render target
/// captured at search start.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    ParserState(ParserState),
    TargetColorSpace(Pattern<ColorSpace>),
    LayerId(Pattern<LayerRole>),
    LayerFormat(FormatPattern),
    RenderMethod(RenderMethod),
    Shuffling(Shuffling),
    DualOutput(bool),
    LayerRotation(Rotation),
    RtRotate(bool),

    Src0Format(FormatPattern),
    Src0Sampling(Pattern<Sampling>),
    Src0Rotation(Rotation),
    Src0ColorFill(bool),
    Src0LumaKey(bool),
    Src0Procamp(Pattern<u8>),
    Src0Coeff(Pattern<CoeffId>),
    Src0Processing(Pattern<Processing>),
    Src0ChromaSiting(Pattern<u8>),

    Src1Format(FormatPattern),
    Src1Sampling(Pattern<Sampling>),
    Src1LumaKey(bool),
    Src1SamplerLumaKey(bool),
    Src1Procamp(Pattern<u8>),
    Src1Coeff(Pattern<CoeffId>),
    Src1Processing(Pattern<Processing>),
    Src1ChromaSiting(Pattern<u8>),

    LayerNumber(usize),
    Quadrant(u8),
    CscBeforeMix(bool),
    TargetFormat(FormatPattern),
    WideSaveEnabled(bool),
    TargetTileType(TileType),
    ProcampEnabled(bool),
    CoeffMode(CscCoeffMode),
    ConstOutAlpha(bool),
    DitherNeeded(bool),
    ScalingRatio(ScalingRatio),
}

/// One state mutation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    TargetColorSpace(Operand<ColorSpace>),
    ParserState(ParserState),

    Src0Format(Operand<PixelFormat>),
    Src0Sampling(Operand<Sampling>),
    Src0Rotation(Operand<Rotation>),
    Src0ColorFill(Operand<bool>),
    Src0LumaKey(Operand<bool>),
    Src0Procamp(Operand<u8>),
    Src0Coeff(Operand<CoeffId>),
    Src0Processing(Operand<Processing>),

    Src1Format(Operand<PixelFormat>),
    Src1Sampling(Operand<Sampling>),
    Src1Rotation(Operand<Rotation>),
    Src1LumaKey(Operand<bool>),
    Src1SamplerLumaKey(Operand<bool>),
    Src1Procamp(Operand<u8>),
    Src1Coeff(Operand<CoeffId>),
    Src1Processing(Operand<Processing>),

    /// Append a kernel to the selection.
    Kernel(KernelId),
    NextLayer(LayerStep),
    /// Fetch patch data for the most recently selected kernel.
    PatchData(PatchKind),
    Quadrant(u8),
    CscBeforeMix(bool),
}

/// Actions carrying a variable-length payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtendedAction {
    /// Patch blocks applied to the most recently selected kernel.
    Patch(Vec<PatchBlock>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    NewEntry(RuleGroup),
    Match(Predicate, Logic),
    Set(Action),
    Extended(ExtendedAction),
    Eof,
}

impl Rule {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match(..))
    }

    /// `Set` or `Extended`.
    pub fn is_action(&self) -> bool {
        matches!(self, Self::Set(_) | Self::Extended(_))
    }
}

/// A resolved action of a compiled rule set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    Set(Action),
    Extended(ExtendedAction),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_step_legacy_values() {
        for step in [
            LayerStep::Next,
            LayerStep::Previous,
            LayerStep::ToRenderTarget,
            LayerStep::ToMainVideo,
        ] {
            assert_eq!(LayerStep::from_legacy(step.legacy_value()), Some(step));
        }
        assert_eq!(LayerStep::from_legacy(1), None);
    }

    #[test]
    fn classification() {
        assert!(Rule::Match(Predicate::Quadrant(0), Logic::None).is_match());
        assert!(Rule::Set(Action::Quadrant(2)).is_action());
        assert!(Rule::Extended(ExtendedAction::Patch(Vec::new())).is_action());
        assert!(!Rule::Eof.is_action());
        assert!(!Rule::NewEntry(RuleGroup::Default).is_match());
    }
}
