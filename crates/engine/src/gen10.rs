//! Gen10 kernel library.
//!
//! Media-object or media-walker dispatch, 16x16 blocks sampled into six
//! buffers (0-3 for the bottom layer, 4-5 for the layer being blended),
//! up to eight layers, CSC either from CURBE or patched into the kernel.

use std::ops::Range;

use kdll_common::FormatPattern::{self, Exact, Packed, Planar2, Planar3, Planar3Rgb, Rgb};
use kdll_common::{
    CoeffId, CscCoeffMode, Operand, PatchBlock, PatchKind, Pattern, PixelFormat, Processing,
    RenderMethod, Rotation, RuleError, RuleGroup, Sampling,
};
use kdll_rules::{Action, KernelCatalog, LayerStep, ParserState, Predicate, Rule, TableBuilder};

use crate::generation::{self, render_target, Generation};

#[derive(Copy, Clone, Debug, Default)]
pub struct Gen10;

impl Generation for Gen10 {
    fn name(&self) -> &'static str {
        "gen10"
    }

    fn kernel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = ["EOT", "VP_Setup", "VP_Setup_MediaWalker"]
            .map(String::from)
            .to_vec();
        names.extend((0..8).map(|n| format!("Set_Layer_{n}")));

        for family in &FAMILIES {
            for method in ["444Scale16", "444AVS16"] {
                for buf in 0..6 {
                    for suffix in ROTATED_SUFFIXES {
                        names.push(format!("{}_{method}_Buf_{buf}{suffix}", family.prefix));
                    }
                }
            }
        }
        names.extend(FAMILIES.iter().map(|f| f.mirror.to_string()));
        for (prefix, method, _) in &DOWNSCALE {
            names.extend(buffers(&format!("{prefix}_{method}"), 0..6));
        }
        for (_, mode) in &HDC_TARGETS {
            names.extend(buffers(&format!("PA_444AVS16_HDC_DW_{mode}"), 0..4));
        }
        names.extend(buffers("PA_444iAVS16", 0..4));
        for prefix in ["PA", "PL2", "PL3"] {
            for method in ["444iScale16", "444iDScale16"] {
                names.extend(buffers(&format!("{prefix}_{method}"), 0..4));
            }
        }
        names.extend(buffers("Interlace_420_16", 0..4));
        names.extend(buffers("Interlace_444_16", 0..4));
        names.extend((0..6).map(|i| format!("Set_CSC_Src_Buf{i}")));
        names.extend(
            BLEND_FILLS
                .iter()
                .map(|(_, suffix)| format!("Colorfill_444Scale16{suffix}")),
        );
        names.extend(BLEND_CALLS.iter().map(|(_, call)| call.to_string()));
        names.extend(FIXED_KERNELS.iter().map(|k| k.to_string()));
        names
    }

    fn rules(&self, catalog: &KernelCatalog) -> Result<Vec<Rule>, RuleError> {
        let mut b = TableBuilder::new(catalog);
        generation::begin(&mut b);
        setup(&mut b);
        generation::layer0_params(&mut b);
        layer1_params(&mut b);
        generation::target_params(&mut b);
        sample_layer0(&mut b);
        sample_layer0_done(&mut b);
        sample_layer1(&mut b);
        csc(&mut b);
        lumakey(&mut b);
        process_layer(&mut b);
        write_output(&mut b);
        b.finish()
    }
}

// ── tables ──

const ROTATED_SUFFIXES: [&str; 4] = ["", "_Rot_90", "_Rot_180", "_Rot_270"];

/// Rotation, sampler kernel suffix, and whether a horizontal mirror call
/// follows each sampled buffer.
const ROTATIONS: [(Rotation, &str, bool); 7] = [
    (Rotation::Rotate90, "_Rot_90", false),
    (Rotation::Rotate180, "_Rot_180", false),
    (Rotation::Rotate270, "_Rot_270", false),
    (Rotation::MirrorHorizontal, "", true),
    (Rotation::MirrorVertical, "_Rot_180", true),
    (Rotation::Rotate90MirrorVertical, "_Rot_270", true),
    (Rotation::Rotate90MirrorHorizontal, "_Rot_90", true),
];

const PA_FORMATS: [FormatPattern; 5] = [
    Rgb,
    Exact(PixelFormat::Ayuv),
    Packed,
    Exact(PixelFormat::Nv12),
    Exact(PixelFormat::Y400),
];

/// Sampler kernels shared by a group of source formats.
struct Family {
    prefix: &'static str,
    formats: &'static [FormatPattern],
    mirror: &'static str,
}

const FAMILIES: [Family; 3] = [
    Family {
        prefix: "PA",
        formats: &PA_FORMATS,
        mirror: "Call_Mirror_H_YUVA",
    },
    Family {
        prefix: "PL2",
        formats: &[Planar2],
        mirror: "Call_Mirror_H_YUV",
    },
    Family {
        prefix: "PL3",
        formats: &[Planar3, Planar3Rgb],
        mirror: "Call_Mirror_H_YUV",
    },
];

/// 0.34x downscale kernels. The PL2 kernel name is lower-case in the library.
const DOWNSCALE: [(&str, &str, &[FormatPattern]); 3] = [
    ("PA", "444DScale16", &PA_FORMATS),
    ("PL2", "444Dscale16", &[Planar2]),
    ("PL3", "444DScale16", &[Planar3, Planar3Rgb]),
];

/// AVS direct write to the target surface, by target layout.
const HDC_TARGETS: [(&[PixelFormat], &str); 5] = [
    (&[PixelFormat::Yuy2, PixelFormat::Yuyv], "YCRCB_NORMAL"),
    (&[PixelFormat::Vyuy], "YCRCB_SWAPUVY"),
    (&[PixelFormat::Yvyu], "YCRCB_SWAPUV"),
    (&[PixelFormat::Uyvy], "YCRCB_SWAPY"),
    (&[PixelFormat::Nv12], "PLANAR_420_8"),
];

/// Interlaced sampling: formats, kernel prefix, next state.
const INTERLACED: [(&[FormatPattern], &str, ParserState); 5] = [
    (&[Rgb], "PA", ParserState::SampleLayer0SelectCsc),
    (
        &[
            Exact(PixelFormat::Ayuv),
            Packed,
            Exact(PixelFormat::Nv12),
            Exact(PixelFormat::Y400),
        ],
        "PA",
        ParserState::SampleLayer0Mix,
    ),
    (&[Planar2], "PL2", ParserState::SampleLayer0Mix),
    (&[Planar3], "PL3", ParserState::SampleLayer0Mix),
    (&[Planar3Rgb], "PL3", ParserState::SampleLayer0SelectCsc),
];

const BLEND_FILLS: [(Processing, &str); 4] = [
    (Processing::SourceBlend, "_SrcBlend"),
    (Processing::ConstBlend, "_ConstBlend"),
    (Processing::ConstSourceBlend, "_ConstSrcBlend"),
    (Processing::PartialBlend, "_PartBlend"),
];

const BLEND_CALLS: [(Processing, &str); 7] = [
    (Processing::Composite, "Call_Composite"),
    (Processing::ConstBlend, "Call_ConstBlend"),
    (Processing::SourceBlend, "Call_SrcBlend"),
    (Processing::SourceBlend4Bits, "Call_SrcBlend_4bits"),
    (Processing::PartialBlend, "Call_PartBlend"),
    (Processing::ConstSourceBlend, "Call_ConstSrcBlend"),
    (Processing::ConstPartialBlend, "Call_AlphaSrcBlendG"),
];

/// Quadrant and the buffer pairs blended in it.
const QUADRANTS: [(u8, &str, &str); 2] = [
    (0, "Set_Buf0_Buf4", "Set_Buf1_Buf5"),
    (2, "Set_Buf2_Buf4", "Set_Buf3_Buf5"),
];

/// Six 4-byte coefficient rows, one per instruction, 16 bytes apart.
const CSC_PATCH: [PatchBlock; 6] = [
    PatchBlock::new(0x0c, 0, 4),
    PatchBlock::new(0x1c, 4, 4),
    PatchBlock::new(0x2c, 8, 4),
    PatchBlock::new(0x3c, 12, 4),
    PatchBlock::new(0x4c, 16, 4),
    PatchBlock::new(0x5c, 20, 4),
];

const FIXED_KERNELS: [&str; 28] = [
    "Compute_Lumakey_Buf0123",
    "Colorfill_444Scale16",
    "Set_Scale_Buf_0123_Colorfill",
    "Set_CURBE_CSC_Coeff",
    "Set_Patched_CSC_Coeff",
    "Call_CSC",
    "Call_CSC_Premultiplied",
    "Set_Buf0_Buf4",
    "Set_Buf1_Buf5",
    "Set_Buf2_Buf4",
    "Set_Buf3_Buf5",
    "Prepare_LumaKey_SampleUnorm",
    "Compute_Lumakey",
    "Set_Sec_Half_Buf45",
    "Set_Dest_Surf_Indexes_Primary",
    "Save_444SCALE16_RGB_64Byte",
    "Save_444SCALE16_ARGB_64Byte",
    "Save_444Scale16_ARGB",
    "Save_444Scale16_RGB",
    "Save_444Scale16_RGB16",
    "Save_444Scale16_R10G10B10",
    "Save_444Scale16_R10G10B10A2",
    "Save_444Scale16_VUYA",
    "Save_444Scale16_SrcVUYA",
    "Save_444Scale16_PA",
    "Save_444Scale16_NV12",
    "Save_444Scale16_PL3",
    "Save_444Scale16_P010",
];

// ── internal helpers ──

fn buffers(base: &str, range: Range<u8>) -> Vec<String> {
    range.map(|i| format!("{base}_Buf_{i}")).collect()
}

fn csc_calls(range: Range<u8>, call: &str) -> Vec<String> {
    range
        .flat_map(|i| [format!("Set_CSC_Src_Buf{i}"), call.to_string()])
        .collect()
}

/// Source slot being sampled: src0 reads the bottom layer into buffers
/// 0-3, src1 the blended layer into buffers 4-5.
#[derive(Copy, Clone, Debug)]
enum Slot {
    Src0,
    Src1,
}

impl Slot {
    fn state(self) -> ParserState {
        match self {
            Self::Src0 => ParserState::SampleLayer0,
            Self::Src1 => ParserState::SampleLayer1,
        }
    }

    fn buffers(self) -> Range<u8> {
        match self {
            Self::Src0 => 0..4,
            Self::Src1 => 4..6,
        }
    }

    fn format(self, f: FormatPattern) -> Predicate {
        match self {
            Self::Src0 => Predicate::Src0Format(f),
            Self::Src1 => Predicate::Src1Format(f),
        }
    }

    fn sampling(self, s: Sampling) -> Predicate {
        match self {
            Self::Src0 => Predicate::Src0Sampling(Pattern::Is(s)),
            Self::Src1 => Predicate::Src1Sampling(Pattern::Is(s)),
        }
    }

    fn rotation(self, r: Rotation) -> Predicate {
        match self {
            Self::Src0 => Predicate::Src0Rotation(r),
            Self::Src1 => Predicate::LayerRotation(r),
        }
    }
}

/// One rule per family and rotation, then the unrotated rule.
fn rotated_sampling(
    b: &mut TableBuilder<'_>,
    slot: Slot,
    sampling: Sampling,
    method: &str,
    next: ParserState,
) {
    for family in &FAMILIES {
        for (rotation, suffix, mirrored) in ROTATIONS {
            let mut kernels = Vec::new();
            for buf in slot.buffers() {
                kernels.push(format!("{}_{method}_Buf_{buf}{suffix}", family.prefix));
                if mirrored {
                    kernels.push(family.mirror.to_string());
                }
            }
            b.entry(RuleGroup::Default, slot.state())
                .any_of(family.formats.iter().map(|f| slot.format(*f)))
                .when(slot.sampling(sampling))
                .when(slot.rotation(rotation))
                .kernels(kernels)
                .goto(next);
        }
        b.entry(RuleGroup::Default, slot.state())
            .any_of(family.formats.iter().map(|f| slot.format(*f)))
            .when(slot.sampling(sampling))
            .kernels(slot.buffers().map(|buf| format!("{}_{method}_Buf_{buf}", family.prefix)))
            .goto(next);
    }
}

fn downscale(b: &mut TableBuilder<'_>, slot: Slot, next: ParserState) {
    for (prefix, method, formats) in DOWNSCALE {
        b.entry(RuleGroup::Default, slot.state())
            .any_of(formats.iter().map(|f| slot.format(*f)))
            .when(slot.sampling(Sampling::Scaling034x))
            .kernels(slot.buffers().map(|buf| format!("{prefix}_{method}_Buf_{buf}")))
            .goto(next);
    }
}

fn patched_coefficients<'b, 'c>(
    b: &'b mut TableBuilder<'c>,
    kind: PatchKind,
) -> &'b mut TableBuilder<'c> {
    b.kernel("Set_Patched_CSC_Coeff")
        .then(Action::PatchData(kind))
        .patch(CSC_PATCH)
}

// ── rule sets ──

fn setup(b: &mut TableBuilder<'_>) {
    use ParserState::*;

    b.entry(RuleGroup::NoOverride, SetRenderMethod)
        .when(Predicate::RenderMethod(RenderMethod::MediaObject))
        .kernel("VP_Setup")
        .goto(SetupLayer0);
    b.entry(RuleGroup::NoOverride, SetRenderMethod)
        .when(Predicate::RenderMethod(RenderMethod::MediaWalker))
        .kernel("VP_Setup_MediaWalker")
        .goto(SetupLayer0);

    b.entry(RuleGroup::NoOverride, SetupLayer0)
        .when(render_target())
        .when(Predicate::LayerNumber(0))
        .goto(SetParamsTarget);
    b.entry(RuleGroup::NoOverride, SetupLayer0)
        .when(Predicate::LayerNumber(0))
        .kernel("Set_Layer_0")
        .goto(SetParamsLayer0);

    // Bottom layer not sampled yet: go back for it.
    b.entry(RuleGroup::NoOverride, SetupLayer1)
        .when(render_target())
        .when(Predicate::Src0Sampling(Pattern::Any))
        .then(Action::NextLayer(LayerStep::Previous))
        .goto(SampleLayer0);
    b.entry(RuleGroup::NoOverride, SetupLayer1)
        .when(render_target())
        .goto(SetParamsTarget);
    for n in 1..8 {
        b.entry(RuleGroup::NoOverride, SetupLayer1)
            .when(Predicate::LayerNumber(n))
            .kernel(&format!("Set_Layer_{n}"))
            .goto(SetParamsLayer1);
    }
}

fn layer1_params(b: &mut TableBuilder<'_>) {
    b.entry(RuleGroup::NoOverride, ParserState::SetParamsLayer1)
        .then(Action::Src1Format(Operand::Source))
        .then(Action::Src1Coeff(Operand::Source))
        .then(Action::Src1Sampling(Operand::Source))
        .then(Action::Src1Rotation(Operand::Source))
        .then(Action::Src1LumaKey(Operand::Source))
        .then(Action::Src1Procamp(Operand::Source))
        .then(Action::Src1Processing(Operand::Source))
        .goto(ParserState::SampleLayer1);
}

fn sample_layer0(b: &mut TableBuilder<'_>) {
    use ParserState::{
        End, SampleLayer0, SampleLayer0Done, SampleLayer0Mix, SampleLayer0SelectCsc, SetupCsc0,
    };

    rotated_sampling(b, Slot::Src0, Sampling::Scaling, "444Scale16", SampleLayer0Done);
    downscale(b, Slot::Src0, SampleLayer0Done);

    // Single packed layer with AVS: write the target from the sampler.
    for (targets, mode) in HDC_TARGETS {
        b.entry(RuleGroup::Default, SampleLayer0)
            .when(Predicate::Src0Sampling(Pattern::Is(Sampling::ScalingAvs)))
            .when(Predicate::Src1Processing(Pattern::None))
            .when(Predicate::Src0Rotation(Rotation::Identity))
            .when(Predicate::Src0ColorFill(false))
            .when(Predicate::Src0LumaKey(false))
            .when(Predicate::Src0Procamp(Pattern::None))
            .when(Predicate::Src0Format(Packed))
            .any_of(targets.iter().map(|f| Predicate::TargetFormat(Exact(*f))))
            .kernels(buffers(&format!("PA_444AVS16_HDC_DW_{mode}"), 0..4))
            .kernel("EOT")
            .goto(End);
    }

    b.entry(RuleGroup::Default, SampleLayer0)
        .any_of(
            [
                Exact(PixelFormat::Nv12),
                Packed,
                Exact(PixelFormat::Yv12),
                Rgb,
            ]
            .map(Predicate::Src0Format),
        )
        .when(Predicate::Src0Sampling(Pattern::Is(Sampling::IScalingAvs)))
        .kernels(buffers("PA_444iAVS16", 0..4))
        .goto(SampleLayer0Mix);
    b.entry(RuleGroup::Default, SampleLayer0)
        .when(Predicate::Src0Format(Planar2))
        .when(Predicate::Src0Sampling(Pattern::Is(Sampling::IScalingAvs)))
        .kernels(buffers("PL2_444iScale16", 0..4))
        .goto(SampleLayer0Mix);

    rotated_sampling(b, Slot::Src0, Sampling::ScalingAvs, "444AVS16", SampleLayer0Done);

    for (sampling, method) in [
        (Sampling::IScaling, "444iScale16"),
        (Sampling::IScaling034x, "444iDScale16"),
    ] {
        for (formats, prefix, next) in INTERLACED {
            b.entry(RuleGroup::Default, SampleLayer0)
                .any_of(formats.iter().map(|f| Predicate::Src0Format(*f)))
                .when(Predicate::Src0Sampling(Pattern::Is(sampling)))
                .kernels(buffers(&format!("{prefix}_{method}"), 0..4))
                .goto(next);
        }
    }

    // Interlaced RGB into NV12: convert before the field mix.
    b.entry(RuleGroup::Default, SampleLayer0SelectCsc)
        .when(Predicate::TargetFormat(Exact(PixelFormat::Nv12)))
        .then(Action::NextLayer(LayerStep::ToRenderTarget))
        .then(Action::CscBeforeMix(true))
        .then(Action::Src0Coeff(Operand::Source))
        .goto(SetupCsc0);
    b.entry(RuleGroup::Default, SampleLayer0SelectCsc)
        .goto(SampleLayer0Mix);

    b.entry(RuleGroup::Default, SampleLayer0Mix)
        .when(Predicate::TargetFormat(Exact(PixelFormat::Nv12)))
        .kernels(buffers("Interlace_420_16", 0..4))
        .goto(SampleLayer0Done);
    b.entry(RuleGroup::Default, SampleLayer0Mix)
        .kernels(buffers("Interlace_444_16", 0..4))
        .goto(SampleLayer0Done);
}

fn sample_layer0_done(b: &mut TableBuilder<'_>) {
    use ParserState::{SampleLayer0Done, SampleLayer1};

    for (processing, suffix) in BLEND_FILLS {
        let fill = format!("Colorfill_444Scale16{suffix}");
        b.entry(RuleGroup::NoOverride, SampleLayer0Done)
            .when(Predicate::Src0Processing(Pattern::Is(processing)))
            .when(Predicate::Src0ColorFill(true))
            .when(Predicate::Src0LumaKey(true))
            .kernel("Compute_Lumakey_Buf0123")
            .kernel(&fill)
            .then(Action::Src0Processing(Operand::Clear))
            .then(Action::Src0ColorFill(Operand::Value(false)))
            .then(Action::Src0LumaKey(Operand::Value(false)))
            .then(Action::Src0Sampling(Operand::Clear))
            .then(Action::Src0Format(Operand::Clear))
            .goto(SampleLayer1);
        b.entry(RuleGroup::NoOverride, SampleLayer0Done)
            .when(Predicate::Src0Processing(Pattern::Is(processing)))
            .when(Predicate::Src0ColorFill(true))
            .kernel(&fill)
            .then(Action::Src0Processing(Operand::Clear))
            .then(Action::Src0ColorFill(Operand::Value(false)))
            .then(Action::Src0Sampling(Operand::Clear))
            .then(Action::Src0Format(Operand::Clear))
            .goto(SampleLayer1);
    }

    b.entry(RuleGroup::NoOverride, SampleLayer0Done)
        .when(Predicate::Src0ColorFill(true))
        .when(Predicate::Src0LumaKey(true))
        .kernel("Compute_Lumakey_Buf0123")
        .kernel("Colorfill_444Scale16")
        .then(Action::Src0ColorFill(Operand::Value(false)))
        .then(Action::Src0LumaKey(Operand::Value(false)))
        .then(Action::Src0Sampling(Operand::Clear))
        .then(Action::Src0Format(Operand::Clear))
        .goto(SampleLayer1);
    b.entry(RuleGroup::NoOverride, SampleLayer0Done)
        .when(Predicate::Src0ColorFill(true))
        .kernel("Colorfill_444Scale16")
        .then(Action::Src0ColorFill(Operand::Value(false)))
        .then(Action::Src0Sampling(Operand::Clear))
        .then(Action::Src0Format(Operand::Clear))
        .goto(SampleLayer1);
    b.entry(RuleGroup::NoOverride, SampleLayer0Done)
        .then(Action::Src0Sampling(Operand::Clear))
        .then(Action::Src0Format(Operand::Clear))
        .goto(SampleLayer1);
}

fn sample_layer1(b: &mut TableBuilder<'_>) {
    use ParserState::*;

    b.entry(RuleGroup::NoOverride, SampleLayer1)
        .when(Predicate::Src0Sampling(Pattern::Any))
        .goto(SampleLayer0);
    b.entry(RuleGroup::NoOverride, SampleLayer1)
        .when(Predicate::Src0Sampling(Pattern::None))
        .when(Predicate::Src1Sampling(Pattern::None))
        .goto(SetupCsc1);

    rotated_sampling(b, Slot::Src1, Sampling::Scaling, "444Scale16", SetupCsc1);
    downscale(b, Slot::Src1, SampleLayer1Done);
    rotated_sampling(b, Slot::Src1, Sampling::ScalingAvs, "444AVS16", SetupCsc1);

    b.entry(RuleGroup::NoOverride, SampleLayer1Done)
        .goto(SetupCsc1);
}

fn csc(b: &mut TableBuilder<'_>) {
    use ParserState::*;

    let primary = Pattern::Is(CoeffId::PRIMARY);

    b.entry(RuleGroup::NoOverride, SetupCsc0)
        .when(render_target())
        .when(Predicate::Src0Coeff(Pattern::None))
        .goto(WriteOutput);
    b.entry(RuleGroup::NoOverride, SetupCsc0)
        .when(Predicate::Src0Coeff(primary))
        .when(Predicate::CoeffMode(CscCoeffMode::Curbe))
        .kernel("Set_CURBE_CSC_Coeff")
        .goto(ExecuteCsc0);
    let set = b
        .entry(RuleGroup::NoOverride, SetupCsc0)
        .when(Predicate::Src0Coeff(primary))
        .when(Predicate::CoeffMode(CscCoeffMode::Patch));
    patched_coefficients(set, PatchKind::CscCoeffSrc0).goto(ExecuteCsc0);
    let set = b
        .entry(RuleGroup::NoOverride, SetupCsc0)
        .when(Predicate::Src0Coeff(Pattern::Any));
    patched_coefficients(set, PatchKind::CscCoeffSrc0).goto(ExecuteCsc0);

    b.entry(RuleGroup::Default, ExecuteCsc0)
        .when(Predicate::Src0Processing(Pattern::Is(Processing::PartialBlend)))
        .kernels(csc_calls(0..4, "Call_CSC_Premultiplied"))
        .goto(ExecuteCsc0Done);
    b.entry(RuleGroup::Default, ExecuteCsc0)
        .kernels(csc_calls(0..4, "Call_CSC"))
        .goto(ExecuteCsc0Done);

    b.entry(RuleGroup::NoOverride, ExecuteCsc0Done)
        .when(Predicate::Src0Sampling(Pattern::Is(Sampling::IScaling)))
        .then(Action::Src0Coeff(Operand::Clear))
        .then(Action::NextLayer(LayerStep::ToMainVideo))
        .goto(SampleLayer0Mix);
    b.entry(RuleGroup::NoOverride, ExecuteCsc0Done)
        .then(Action::Src0Coeff(Operand::Clear))
        .goto(SetupCsc1);

    b.entry(RuleGroup::NoOverride, SetupCsc1)
        .when(Predicate::Src0Coeff(Pattern::None))
        .when(Predicate::Src1Coeff(Pattern::None))
        .goto(ExecuteCsc1);
    // Bottom layer first.
    b.entry(RuleGroup::NoOverride, SetupCsc1)
        .when(Predicate::Src0Coeff(Pattern::Any))
        .goto(SetupCsc0);
    // Second half: coefficients already loaded.
    b.entry(RuleGroup::NoOverride, SetupCsc1)
        .when(Predicate::Quadrant(2))
        .goto(ExecuteCsc1);
    b.entry(RuleGroup::NoOverride, SetupCsc1)
        .when(Predicate::Src1Coeff(primary))
        .when(Predicate::CoeffMode(CscCoeffMode::Curbe))
        .kernel("Set_CURBE_CSC_Coeff")
        .goto(ExecuteCsc1);
    let set = b
        .entry(RuleGroup::NoOverride, SetupCsc1)
        .when(Predicate::Src0Coeff(primary))
        .when(Predicate::CoeffMode(CscCoeffMode::Patch));
    patched_coefficients(set, PatchKind::CscCoeffSrc1).goto(ExecuteCsc1);
    let set = b
        .entry(RuleGroup::NoOverride, SetupCsc1)
        .when(Predicate::Src1Coeff(Pattern::Any));
    patched_coefficients(set, PatchKind::CscCoeffSrc1).goto(ExecuteCsc1);

    b.entry(RuleGroup::NoOverride, ExecuteCsc1)
        .when(Predicate::Src1Coeff(Pattern::None))
        .goto(ExecuteCsc1Done);
    b.entry(RuleGroup::Default, ExecuteCsc1)
        .when(Predicate::Src1Processing(Pattern::Is(Processing::PartialBlend)))
        .kernels(csc_calls(4..6, "Call_CSC_Premultiplied"))
        .goto(ExecuteCsc1Done);
    b.entry(RuleGroup::Default, ExecuteCsc1)
        .kernels(csc_calls(4..6, "Call_CSC"))
        .goto(ExecuteCsc1Done);

    b.entry(RuleGroup::NoOverride, ExecuteCsc1Done)
        .when(Predicate::Quadrant(0))
        .goto(Lumakey);
    b.entry(RuleGroup::NoOverride, ExecuteCsc1Done)
        .when(Predicate::Quadrant(2))
        .then(Action::Src1Coeff(Operand::Clear))
        .goto(Lumakey);
}

fn lumakey(b: &mut TableBuilder<'_>) {
    use ParserState::{Lumakey, ProcessLayer, ProcessLayerDone};

    // Sampler-side luma key folded into the composite.
    for (quadrant, first, second) in QUADRANTS {
        b.entry(RuleGroup::NoOverride, Lumakey)
            .when(Predicate::Quadrant(quadrant))
            .when(Predicate::Src1LumaKey(true))
            .any_of([
                Predicate::Src1Format(Exact(PixelFormat::Yuy2)),
                Predicate::Src1Format(Exact(PixelFormat::Nv12)),
            ])
            .when(Predicate::Src1Processing(Pattern::Is(Processing::Composite)))
            .kernels([
                first,
                "Prepare_LumaKey_SampleUnorm",
                "Call_Composite",
                second,
                "Prepare_LumaKey_SampleUnorm",
                "Call_Composite",
            ])
            .goto(ProcessLayerDone);
    }
    for (quadrant, first, second) in QUADRANTS {
        b.entry(RuleGroup::NoOverride, Lumakey)
            .when(Predicate::Quadrant(quadrant))
            .when(Predicate::Src1LumaKey(true))
            .kernels([first, "Compute_Lumakey", second, "Compute_Lumakey"])
            .goto(ProcessLayer);
    }
    b.entry(RuleGroup::NoOverride, Lumakey)
        .when(Predicate::Src1LumaKey(false))
        .goto(ProcessLayer);
}

fn process_layer(b: &mut TableBuilder<'_>) {
    use ParserState::*;

    b.entry(RuleGroup::NoOverride, ProcessLayer)
        .when(render_target())
        .goto(WriteOutput);
    b.entry(RuleGroup::NoOverride, ProcessLayer)
        .when(Predicate::Src1Processing(Pattern::None))
        .goto(ProcessLayerDone);
    for (processing, call) in BLEND_CALLS {
        for (quadrant, first, second) in QUADRANTS {
            b.entry(RuleGroup::Default, ProcessLayer)
                .when(Predicate::Src1Processing(Pattern::Is(processing)))
                .when(Predicate::Quadrant(quadrant))
                .kernels([first, call, second, call])
                .goto(ProcessLayerDone);
        }
    }

    b.entry(RuleGroup::NoOverride, ProcessLayerDone)
        .when(Predicate::Src1Processing(Pattern::None))
        .then(Action::NextLayer(LayerStep::Next))
        .then(Action::Quadrant(0))
        .goto(SetupLayer1);
    b.entry(RuleGroup::NoOverride, ProcessLayerDone)
        .when(Predicate::Quadrant(0))
        .kernel("Set_Sec_Half_Buf45")
        .then(Action::Quadrant(2))
        .goto(SampleLayer1);
    b.entry(RuleGroup::NoOverride, ProcessLayerDone)
        .when(Predicate::Quadrant(2))
        .then(Action::Src1Sampling(Operand::Clear))
        .then(Action::Src1Format(Operand::Clear))
        .then(Action::Src1Processing(Operand::Clear))
        .then(Action::NextLayer(LayerStep::Next))
        .then(Action::Quadrant(0))
        .goto(SetupLayer1);
}

// ── output ──

/// A render-target save: matching formats, optional 64-byte-save and
/// constant-alpha conditions, and the kernels written before `EOT`.
struct Save {
    formats: &'static [FormatPattern],
    wide: Option<bool>,
    const_out_alpha: Option<bool>,
    kernels: &'static [&'static str],
}

const ARGB: &[FormatPattern] = &[Exact(PixelFormat::Argb8), Exact(PixelFormat::Abgr8)];
const RGB10: &[FormatPattern] = &[
    Exact(PixelFormat::R10G10B10A2),
    Exact(PixelFormat::B10G10R10A2),
];
const PACKED_422: &[FormatPattern] = &[
    Exact(PixelFormat::Yuy2),
    Exact(PixelFormat::Yuyv),
    Exact(PixelFormat::Yvyu),
    Exact(PixelFormat::Uyvy),
    Exact(PixelFormat::Vyuy),
];
const NV12: &[FormatPattern] = &[Exact(PixelFormat::Nv12)];

const fn save(formats: &'static [FormatPattern], kernels: &'static [&'static str]) -> Save {
    Save {
        formats,
        wide: None,
        const_out_alpha: None,
        kernels,
    }
}

/// Saves after a colorfill-only composition (no layers).
const COLORFILL_SAVES: [Save; 10] = [
    Save {
        wide: Some(true),
        ..save(ARGB, &["Save_444SCALE16_RGB_64Byte"])
    },
    save(ARGB, &["Save_444Scale16_RGB"]),
    Save {
        wide: Some(true),
        ..save(&[Exact(PixelFormat::Xrgb8)], &["Save_444SCALE16_RGB_64Byte"])
    },
    save(&[Exact(PixelFormat::Xrgb8)], &["Save_444Scale16_RGB"]),
    save(&[Exact(PixelFormat::Rgb565)], &["Save_444Scale16_RGB16"]),
    save(RGB10, &["Save_444Scale16_R10G10B10"]),
    save(&[Exact(PixelFormat::Ayuv)], &["Save_444Scale16_VUYA"]),
    save(
        PACKED_422,
        &["Set_Dest_Surf_Indexes_Primary", "Save_444Scale16_PA"],
    ),
    save(NV12, &["Set_Dest_Surf_Indexes_Primary", "Save_444Scale16_NV12"]),
    save(&[Planar3], &["Save_444Scale16_PL3"]),
];

const SAVES: [Save; 13] = [
    Save {
        wide: Some(true),
        const_out_alpha: Some(false),
        ..save(ARGB, &["Save_444SCALE16_ARGB_64Byte"])
    },
    Save {
        wide: Some(true),
        const_out_alpha: Some(true),
        ..save(ARGB, &["Save_444SCALE16_RGB_64Byte"])
    },
    Save {
        const_out_alpha: Some(false),
        ..save(ARGB, &["Save_444Scale16_ARGB"])
    },
    Save {
        const_out_alpha: Some(true),
        ..save(ARGB, &["Save_444Scale16_RGB"])
    },
    Save {
        wide: Some(true),
        ..save(
            &[Exact(PixelFormat::Xrgb8), Exact(PixelFormat::Xbgr8)],
            &["Save_444SCALE16_RGB_64Byte"],
        )
    },
    save(
        &[Exact(PixelFormat::Xrgb8), Exact(PixelFormat::Xbgr8)],
        &["Save_444Scale16_RGB"],
    ),
    save(&[Exact(PixelFormat::Rgb565)], &["Save_444Scale16_RGB16"]),
    Save {
        const_out_alpha: Some(false),
        ..save(RGB10, &["Save_444Scale16_R10G10B10A2"])
    },
    Save {
        const_out_alpha: Some(true),
        ..save(RGB10, &["Save_444Scale16_R10G10B10"])
    },
    Save {
        const_out_alpha: Some(false),
        ..save(&[Exact(PixelFormat::Ayuv)], &["Save_444Scale16_SrcVUYA"])
    },
    Save {
        const_out_alpha: Some(true),
        ..save(&[Exact(PixelFormat::Ayuv)], &["Save_444Scale16_VUYA"])
    },
    save(
        PACKED_422,
        &["Set_Dest_Surf_Indexes_Primary", "Save_444Scale16_PA"],
    ),
    save(NV12, &["Set_Dest_Surf_Indexes_Primary", "Save_444Scale16_NV12"]),
];

const PL3_SAVE: Save = save(&[Planar3], &["Save_444Scale16_PL3"]);
const P010_SAVE: Save = save(
    &[Exact(PixelFormat::P010)],
    &["Set_Dest_Surf_Indexes_Primary", "Save_444Scale16_P010"],
);

fn write_save(b: &mut TableBuilder<'_>, save: &Save, colorfill: bool) {
    b.entry(RuleGroup::Default, ParserState::WriteOutput)
        .when(render_target())
        .any_of(save.formats.iter().map(|f| Predicate::LayerFormat(*f)));
    if let Some(wide) = save.wide {
        b.when(Predicate::WideSaveEnabled(wide));
    }
    if let Some(alpha) = save.const_out_alpha {
        b.when(Predicate::ConstOutAlpha(alpha));
    }
    if colorfill {
        b.when(Predicate::LayerNumber(0))
            .when(Predicate::Src0ColorFill(true))
            .kernel("Set_Scale_Buf_0123_Colorfill")
            .kernel("Colorfill_444Scale16");
    }
    b.kernels(save.kernels.iter().copied()).kernel("EOT");
    if colorfill {
        b.then(Action::Src0ColorFill(Operand::Value(false)));
    }
    b.goto(ParserState::End);
}

fn write_output(b: &mut TableBuilder<'_>) {
    for save in &COLORFILL_SAVES {
        write_save(b, save, true);
    }
    for save in &SAVES {
        write_save(b, save, false);
    }
    write_save(b, &PL3_SAVE, false);
    write_save(b, &P010_SAVE, true);
    write_save(b, &P010_SAVE, false);
}
