//! Xe_XPM+ kernel library.
//!
//! Media-walker dispatch only. A single RGB or NV12 layer is sampled by the
//! data-port kernels; the walker block size (16x16, 8x8 or 4x4) follows the
//! scaling ratio and the matching CSC and save kernels use the same block.

use kdll_common::FormatPattern::{self, Exact, Planar3, Planar3Rgb, Rgb};
use kdll_common::{
    CoeffId, EngineConfig, Operand, Pattern, PixelFormat, RenderMethod, Rotation, RuleError,
    RuleGroup, Sampling, ScalingRatio,
};
use kdll_rules::{Action, KernelCatalog, LayerStep, ParserState, Predicate, Rule, TableBuilder};
use tracing::debug;

use crate::generation::{self, render_target, Generation};

#[derive(Copy, Clone, Debug, Default)]
pub struct XeXpmPlus;

impl Generation for XeXpmPlus {
    fn name(&self) -> &'static str {
        "xe_xpm_plus"
    }

    fn kernel_names(&self) -> Vec<String> {
        let mut names = vec!["EOT".to_string()];
        names.extend(BLOCKS.iter().map(|(_, block)| format!("DP_FC_Setup_Walker_{block}")));
        for (_, prefix) in PREFIXES {
            for (_, base) in RATIOS {
                names.push(format!("{prefix}_DP_{base}"));
                for (_, suffix) in ROTATIONS.iter().chain(MIRRORS.iter()) {
                    names.push(format!("{prefix}_DP_{base}{suffix}"));
                }
            }
        }
        names.extend(BLOCKS.iter().map(|(_, block)| format!("CSC_{block}")));
        for (_, save) in SAVES {
            names.extend(BLOCKS.iter().map(|(_, block)| format!("Save_{save}_{block}")));
        }
        names
    }

    fn rules(&self, catalog: &KernelCatalog) -> Result<Vec<Rule>, RuleError> {
        let mut b = TableBuilder::new(catalog);
        generation::begin(&mut b);
        setup(&mut b);
        generation::layer0_params(&mut b);
        generation::target_params(&mut b);
        sample_layer0(&mut b);
        sample_layer0_done(&mut b);
        pass_through(&mut b);
        write_output(&mut b);
        b.finish()
    }

    fn configure(&self, config: &mut EngineConfig) {
        // The data-port samplers emit pixels in order.
        if config.output_packing.shuffle {
            debug!("Sampler output shuffling disabled");
            config.output_packing.shuffle = false;
        }
    }
}

const PREFIXES: [(FormatPattern, &str); 2] =
    [(Rgb, "R8G8B8A8"), (Exact(PixelFormat::Nv12), "NV12")];

const RATIOS: [(ScalingRatio, &str); 5] = [
    (ScalingRatio::Over1, "UpScaling_16x16"),
    (ScalingRatio::B1p2To1, "DownScaling_8x8"),
    (ScalingRatio::B1p4To1p2, "DownScaling_4x4"),
    (ScalingRatio::B1p8To1p4, "DownScaling_4x4_scale_1_8th"),
    (ScalingRatio::Any, "DownScaling_4x4_scale_to_any_ratio"),
];

const ROTATIONS: [(Rotation, &str); 3] = [
    (Rotation::Rotate90, "_rot_90"),
    (Rotation::Rotate180, "_rot_180"),
    (Rotation::Rotate270, "_rot_270"),
];

const MIRRORS: [(Rotation, &str); 4] = [
    (Rotation::MirrorHorizontal, "_mirror_h"),
    (Rotation::MirrorVertical, "_mirror_v"),
    (Rotation::Rotate90MirrorHorizontal, "_rot_90_mirror_h"),
    (Rotation::Rotate90MirrorVertical, "_rot_90_mirror_v"),
];

/// Walker block size by scaling ratio.
const BLOCKS: [(&[ScalingRatio], &str); 3] = [
    (&[ScalingRatio::Over1], "16x16"),
    (&[ScalingRatio::B1p2To1], "8x8"),
    (
        &[
            ScalingRatio::B1p4To1p2,
            ScalingRatio::B1p8To1p4,
            ScalingRatio::Any,
        ],
        "4x4",
    ),
];

const SAVES: [(FormatPattern, &str); 3] = [
    (Exact(PixelFormat::Rgbp), "RGBP"),
    (Rgb, "ARGB"),
    (Exact(PixelFormat::Nv12), "NV12"),
];

fn ratio_predicates(ratios: &[ScalingRatio]) -> impl Iterator<Item = Predicate> + '_ {
    ratios.iter().map(|r| Predicate::ScalingRatio(*r))
}

/// The RGB 1/8 downscaler has no 90/270 variant; the any-ratio kernel
/// covers those.
fn sampler_base(
    prefix: &str,
    ratio: ScalingRatio,
    base: &'static str,
    rotation: Rotation,
) -> &'static str {
    let quarter_turn = matches!(rotation, Rotation::Rotate90 | Rotation::Rotate270);
    if prefix == "R8G8B8A8" && ratio == ScalingRatio::B1p8To1p4 && quarter_turn {
        "DownScaling_4x4_scale_to_any_ratio"
    } else {
        base
    }
}

fn setup(b: &mut TableBuilder<'_>) {
    use ParserState::*;

    for (ratios, block) in BLOCKS {
        b.entry(RuleGroup::NoOverride, SetRenderMethod)
            .when(Predicate::RenderMethod(RenderMethod::MediaWalker))
            .any_of(ratio_predicates(ratios))
            .kernel(&format!("DP_FC_Setup_Walker_{block}"))
            .goto(SetupLayer0);
    }

    b.entry(RuleGroup::NoOverride, SetupLayer0)
        .when(Predicate::LayerNumber(0))
        .goto(SetParamsLayer0);

    b.entry(RuleGroup::NoOverride, SetupLayer1)
        .when(render_target())
        .when(Predicate::Src0Sampling(Pattern::Any))
        .then(Action::NextLayer(LayerStep::Previous))
        .goto(SampleLayer0);
    b.entry(RuleGroup::NoOverride, SetupLayer1)
        .when(render_target())
        .goto(SetParamsTarget);
}

fn sample_layer0(b: &mut TableBuilder<'_>) {
    let mut rule = |format: FormatPattern,
                    ratio: ScalingRatio,
                    rotation: Option<Rotation>,
                    kernel: String| {
        b.entry(RuleGroup::Default, ParserState::SampleLayer0)
            .when(Predicate::Src0Format(format))
            .when(Predicate::Src0Sampling(Pattern::Is(Sampling::Scaling034x)))
            .when(Predicate::ScalingRatio(ratio));
        if let Some(rotation) = rotation {
            b.when(Predicate::Src0Rotation(rotation));
        }
        b.kernel(&kernel).goto(ParserState::SampleLayer0Done);
    };

    for (format, prefix) in PREFIXES {
        for (ratio, base) in RATIOS {
            for (rotation, suffix) in ROTATIONS {
                let base = sampler_base(prefix, ratio, base, rotation);
                rule(format, ratio, Some(rotation), format!("{prefix}_DP_{base}{suffix}"));
            }
        }
        for (ratio, base) in RATIOS {
            for (rotation, suffix) in MIRRORS {
                rule(format, ratio, Some(rotation), format!("{prefix}_DP_{base}{suffix}"));
            }
        }
        for (ratio, base) in RATIOS {
            rule(format, ratio, None, format!("{prefix}_DP_{base}"));
        }
    }
}

fn sample_layer0_done(b: &mut TableBuilder<'_>) {
    use ParserState::{SampleLayer0Done, SampleLayer1};

    let nv12 = Exact(PixelFormat::Nv12);

    // Already in the target's color model.
    b.entry(RuleGroup::NoOverride, SampleLayer0Done)
        .when(Predicate::Src0Format(Rgb))
        .any_of([
            Predicate::TargetFormat(Exact(PixelFormat::Rgbp)),
            Predicate::TargetFormat(Exact(PixelFormat::Argb8)),
        ])
        .then(Action::Src0Sampling(Operand::Clear))
        .then(Action::Src0Format(Operand::Clear))
        .goto(SampleLayer1);
    b.entry(RuleGroup::NoOverride, SampleLayer0Done)
        .when(Predicate::Src0Format(nv12))
        .when(Predicate::TargetFormat(nv12))
        .then(Action::Src0Sampling(Operand::Clear))
        .then(Action::Src0Format(Operand::Clear))
        .goto(SampleLayer1);

    for (ratios, block) in BLOCKS {
        b.entry(RuleGroup::NoOverride, SampleLayer0Done)
            .when(Predicate::Src0Format(nv12))
            .when_not(Predicate::TargetFormat(nv12))
            .any_of(ratio_predicates(ratios))
            .kernel(&format!("CSC_{block}"))
            .then(Action::Src0Sampling(Operand::Clear))
            .then(Action::Src0Format(Operand::Clear))
            .goto(SampleLayer1);
    }
    for (ratios, block) in BLOCKS {
        b.entry(RuleGroup::NoOverride, SampleLayer0Done)
            .when(Predicate::Src0Format(Rgb))
            .when(Predicate::TargetFormat(nv12))
            .any_of(ratio_predicates(ratios))
            .kernel(&format!("CSC_{block}"))
            .then(Action::Src0Sampling(Operand::Clear))
            .then(Action::Src0Format(Operand::Clear))
            .goto(SampleLayer1);
    }
}

/// Blending runs inside the sampler kernels; the remaining layer states
/// only walk the two quadrants.
fn pass_through(b: &mut TableBuilder<'_>) {
    use ParserState::*;

    b.entry(RuleGroup::NoOverride, SampleLayer1)
        .when(Predicate::Src0Sampling(Pattern::None))
        .when(Predicate::Src1Sampling(Pattern::None))
        .goto(SetupCsc1);
    b.entry(RuleGroup::Default, SampleLayer1)
        .any_of([
            Predicate::Src1Format(Planar3),
            Predicate::Src1Format(Planar3Rgb),
        ])
        .when(Predicate::Src1Sampling(Pattern::Is(Sampling::Scaling034x)))
        .goto(SetupCsc1);

    b.entry(RuleGroup::NoOverride, SetupCsc0)
        .when(render_target())
        .any_of([
            Predicate::Src0Coeff(Pattern::None),
            Predicate::Src0Coeff(Pattern::Is(CoeffId::PRIMARY)),
        ])
        .goto(WriteOutput);
    b.entry(RuleGroup::NoOverride, SetupCsc1)
        .when(Predicate::Src0Coeff(Pattern::None))
        .when(Predicate::Src1Coeff(Pattern::None))
        .goto(Lumakey);
    b.entry(RuleGroup::NoOverride, Lumakey)
        .when(Predicate::Src1Coeff(Pattern::None))
        .when(Predicate::Src1LumaKey(false))
        .goto(ProcessLayer);
    b.entry(RuleGroup::NoOverride, ProcessLayer)
        .when(Predicate::Src1Processing(Pattern::None))
        .goto(ProcessLayerDone);

    b.entry(RuleGroup::NoOverride, ProcessLayerDone)
        .when(Predicate::Quadrant(0))
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

fn write_output(b: &mut TableBuilder<'_>) {
    for (ratios, block) in BLOCKS {
        for (format, save) in SAVES {
            b.entry(RuleGroup::Default, ParserState::WriteOutput)
                .when(render_target())
                .when(Predicate::LayerFormat(format))
                .any_of(ratio_predicates(ratios))
                .kernel(&format!("Save_{save}_{block}"))
                .kernel("EOT")
                .goto(ParserState::End);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdll_rules::{RuleTable, Step};

    fn table() -> (KernelCatalog, RuleTable) {
        let catalog = XeXpmPlus.catalog();
        let rules = XeXpmPlus.rules(&catalog).unwrap();
        let table = RuleTable::compile(&rules, None).unwrap();
        (catalog, table)
    }

    fn kernels_of(
        table: &RuleTable,
        state: ParserState,
        matches: &[Predicate],
    ) -> Vec<kdll_common::KernelId> {
        let set = table
            .bucket(state)
            .iter()
            .find(|s| matches.iter().all(|m| s.matches.iter().any(|(p, _)| p == m)))
            .unwrap();
        set.actions
            .iter()
            .filter_map(|step| match step {
                Step::Set(Action::Kernel(id)) => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn rules_compile_against_catalog() {
        let (catalog, table) = table();
        assert!(catalog.id("EOT").is_some());
        assert_eq!(table.bucket(ParserState::SetRenderMethod).len(), 3);
        assert_eq!(table.bucket(ParserState::WriteOutput).len(), 9);
    }

    #[test]
    fn rgb_eighth_scale_quarter_turns_use_any_ratio_kernel() {
        let (catalog, table) = table();
        let rgb = kernels_of(
            &table,
            ParserState::SampleLayer0,
            &[
                Predicate::Src0Format(Rgb),
                Predicate::ScalingRatio(ScalingRatio::B1p8To1p4),
                Predicate::Src0Rotation(Rotation::Rotate90),
            ],
        );
        assert_eq!(
            rgb,
            vec![catalog
                .id("R8G8B8A8_DP_DownScaling_4x4_scale_to_any_ratio_rot_90")
                .unwrap()]
        );

        let half_turn = kernels_of(
            &table,
            ParserState::SampleLayer0,
            &[
                Predicate::Src0Format(Rgb),
                Predicate::ScalingRatio(ScalingRatio::B1p8To1p4),
                Predicate::Src0Rotation(Rotation::Rotate180),
            ],
        );
        assert_eq!(
            half_turn,
            vec![catalog
                .id("R8G8B8A8_DP_DownScaling_4x4_scale_1_8th_rot_180")
                .unwrap()]
        );

        let nv12 = kernels_of(
            &table,
            ParserState::SampleLayer0,
            &[
                Predicate::Src0Format(Exact(PixelFormat::Nv12)),
                Predicate::ScalingRatio(ScalingRatio::B1p8To1p4),
                Predicate::Src0Rotation(Rotation::Rotate270),
            ],
        );
        assert_eq!(
            nv12,
            vec![catalog.id("NV12_DP_DownScaling_4x4_scale_1_8th_rot_270").unwrap()]
        );
    }

    #[test]
    fn configure_disables_shuffling() {
        let mut config = EngineConfig::default();
        XeXpmPlus.configure(&mut config);
        assert!(!config.output_packing.shuffle);
    }
}
