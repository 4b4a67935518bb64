//! Parser states of the kernel-selection state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node of the selection state machine. Rule sets are bucketed by the
/// state they match in; the search starts in `Begin` and stops in `End`.
///
/// Declaration order is the legacy numbering used by the opcode decoder.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParserState {
    Begin,
    SetRenderMethod,
    SetupLayer0,
    SetupLayer1,
    SetParamsLayer0,
    SetParamsLayer1,
    SetParamsTarget,
    SampleLayer0,
    SampleLayer0Mix,
    SampleLayer0ColorFill,
    RotateLayer0Check,
    RotateLayer0,
    SampleLayer0Done,
    ShuffleLayer0,
    SampleLayer1,
    SampleLayer1Done,
    ShuffleLayer1,
    SampleLayer0SelectCsc,
    SetupCsc0,
    ExecuteCsc0,
    ExecuteCsc0Done,
    SetupCsc1,
    ExecuteCsc1,
    ExecuteCsc1Done,
    Lumakey,
    ProcessLayer,
    ProcessLayerDone,
    DualOutput,
    Rotation,
    DestSurfIndex,
    Colorfill,
    WriteOutput,
    End,
    Custom,
}

impl ParserState {
    pub const COUNT: usize = 34;

    pub const ALL: [ParserState; Self::COUNT] = [
        Self::Begin,
        Self::SetRenderMethod,
        Self::SetupLayer0,
        Self::SetupLayer1,
        Self::SetParamsLayer0,
        Self::SetParamsLayer1,
        Self::SetParamsTarget,
        Self::SampleLayer0,
        Self::SampleLayer0Mix,
        Self::SampleLayer0ColorFill,
        Self::RotateLayer0Check,
        Self::RotateLayer0,
        Self::SampleLayer0Done,
        Self::ShuffleLayer0,
        Self::SampleLayer1,
        Self::SampleLayer1Done,
        Self::ShuffleLayer1,
        Self::SampleLayer0SelectCsc,
        Self::SetupCsc0,
        Self::ExecuteCsc0,
        Self::ExecuteCsc0Done,
        Self::SetupCsc1,
        Self::ExecuteCsc1,
        Self::ExecuteCsc1Done,
        Self::Lumakey,
        Self::ProcessLayer,
        Self::ProcessLayerDone,
        Self::DualOutput,
        Self::Rotation,
        Self::DestSurfIndex,
        Self::Colorfill,
        Self::WriteOutput,
        Self::End,
        Self::Custom,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_legacy(value: i32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
