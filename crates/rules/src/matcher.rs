//! Rule matcher.

use tracing::trace;

use crate::rule::{Logic, Predicate};
use crate::search_state::SearchState;
use crate::table::{RuleSet, RuleTable};

/// First rule set of the current state's bucket whose predicates hold.
pub fn find<'t>(table: &'t RuleTable, state: &SearchState) -> Option<&'t RuleSet> {
    let hit = table
        .bucket(state.state)
        .iter()
        .find(|set| set_matches(set, state));
    if let Some(set) = hit {
        trace!(state = %state.state, layer = state.layer, group = ?set.group, "Rule set matched");
    }
    hit
}

/// AND over the predicates, except that a run of `Or`-tagged predicates
/// together with the predicate that closes it forms one OR group.
pub fn set_matches(set: &RuleSet, state: &SearchState) -> bool {
    let mut group: Option<bool> = None;
    for (predicate, logic) in &set.matches {
        match logic {
            Logic::Or => {
                let hit = group.unwrap_or(false) || evaluate(predicate, state);
                group = Some(hit);
            }
            Logic::None | Logic::Not => {
                let hit = group.take().unwrap_or(false) || {
                    let r = evaluate(predicate, state);
                    if *logic == Logic::Not {
                        !r
                    } else {
                        r
                    }
                };
                if !hit {
                    return false;
                }
            }
        }
    }
    // An unterminated group still has to hold.
    group.unwrap_or(true)
}

/// Evaluate one predicate against the search state.
pub fn evaluate(predicate: &Predicate, s: &SearchState) -> bool {
    let layer = s.current();
    match *predicate {
        Predicate::ParserState(p) => s.state == p,
        Predicate::TargetColorSpace(p) => p.matches(s.target_color_space),
        Predicate::LayerId(p) => p.matches(Some(layer.layer)),
        Predicate::LayerFormat(p) => p.matches(Some(layer.format)),
        Predicate::RenderMethod(m) => layer.render_method == m,
        Predicate::Shuffling(m) => s.shuffling == m,
        Predicate::DualOutput(b) => layer.dual_output == b,
        Predicate::LayerRotation(r) => layer.rotation == r,
        Predicate::RtRotate(b) => s.rt_rotate == b,

        Predicate::Src0Format(p) => p.matches(s.src0.format),
        Predicate::Src0Sampling(p) => p.matches(s.src0.sampling),
        Predicate::Src0Rotation(r) => s.src0.rotation.unwrap_or_default() == r,
        Predicate::Src0ColorFill(b) => s.src0.color_fill == b,
        Predicate::Src0LumaKey(b) => s.src0.luma_key == b,
        Predicate::Src0Procamp(p) => p.matches(s.src0.procamp),
        Predicate::Src0Coeff(p) => p.matches(s.src0.coeff),
        Predicate::Src0Processing(p) => p.matches(s.src0.processing),
        Predicate::Src0ChromaSiting(p) => p.matches(s.src0.chroma_siting),

        Predicate::Src1Format(p) => p.matches(s.src1.format),
        Predicate::Src1Sampling(p) => p.matches(s.src1.sampling),
        Predicate::Src1LumaKey(b) => s.src1.luma_key == b,
        Predicate::Src1SamplerLumaKey(b) => s.src1.sampler_luma_key == b,
        Predicate::Src1Procamp(p) => p.matches(s.src1.procamp),
        Predicate::Src1Coeff(p) => p.matches(s.src1.coeff),
        Predicate::Src1Processing(p) => p.matches(s.src1.processing),
        Predicate::Src1ChromaSiting(p) => p.matches(s.src1.chroma_siting),

        Predicate::LayerNumber(n) => s.layer == n,
        Predicate::Quadrant(q) => s.quadrant == q,
        Predicate::CscBeforeMix(b) => s.csc_before_mix == b,
        Predicate::TargetFormat(p) => p.matches(Some(s.target_format)),
        Predicate::WideSaveEnabled(b) => s.wide_save == b,
        Predicate::TargetTileType(t) => s.target_tile_type == t,
        Predicate::ProcampEnabled(b) => s.procamp_enabled == b,
        Predicate::CoeffMode(m) => layer.csc_coeff_mode == m,
        Predicate::ConstOutAlpha(b) => s.const_out_alpha == b,
        Predicate::DitherNeeded(b) => s.dither_needed == b,
        Predicate::ScalingRatio(r) => s.scaling_ratio == r,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search_state::SearchFlags;
    use crate::state::ParserState;
    use crate::rule::Step;
    use kdll_common::{
        ColorSpace, FilterEntry, FormatPattern, LayerRole, Limits, OutputPackingConfig, Pattern,
        PixelFormat, RuleGroup, Sampling,
    };

    fn state() -> SearchState {
        let chain = [
            FilterEntry::layer(LayerRole::MainVideo, PixelFormat::Nv12, ColorSpace::Bt601)
                .with_sampling(Sampling::Scaling),
            FilterEntry::render_target(PixelFormat::Argb8, ColorSpace::Srgb),
        ];
        SearchState::new(
            &chain,
            SearchFlags::default(),
            &Limits::default(),
            &OutputPackingConfig::default(),
        )
        .unwrap()
    }

    fn set(matches: Vec<(Predicate, Logic)>) -> RuleSet {
        RuleSet {
            group: RuleGroup::Default,
            state: ParserState::Begin,
            matches,
            actions: vec![Step::Set(crate::rule::Action::Quadrant(0))],
        }
    }

    fn fmt(f: PixelFormat) -> Predicate {
        Predicate::LayerFormat(FormatPattern::Exact(f))
    }

    #[test]
    fn and_semantics() {
        let s = state();
        assert!(set_matches(
            &set(vec![
                (fmt(PixelFormat::Nv12), Logic::None),
                (Predicate::Quadrant(0), Logic::None),
            ]),
            &s
        ));
        assert!(!set_matches(
            &set(vec![
                (fmt(PixelFormat::Nv12), Logic::None),
                (Predicate::Quadrant(2), Logic::None),
            ]),
            &s
        ));
    }

    #[test]
    fn or_group() {
        let s = state();
        let group = |last| {
            set(vec![
                (fmt(PixelFormat::Yuy2), Logic::Or),
                (fmt(PixelFormat::Nv12), Logic::Or),
                (fmt(last), Logic::None),
                (Predicate::Quadrant(0), Logic::None),
            ])
        };
        assert!(set_matches(&group(PixelFormat::Argb8), &s));
        assert!(set_matches(&group(PixelFormat::Nv12), &s));

        let miss = set(vec![
            (fmt(PixelFormat::Yuy2), Logic::Or),
            (fmt(PixelFormat::Argb8), Logic::None),
        ]);
        assert!(!set_matches(&miss, &s));
    }

    #[test]
    fn not_inverts() {
        let s = state();
        assert!(set_matches(
            &set(vec![(Predicate::Src0Sampling(Pattern::Any), Logic::Not)]),
            &s
        ));
        assert!(!set_matches(
            &set(vec![(fmt(PixelFormat::Nv12), Logic::Not)]),
            &s
        ));
    }

    #[test]
    fn target_and_layer_predicates() {
        let mut s = state();
        assert!(evaluate(&Predicate::LayerId(Pattern::Is(LayerRole::MainVideo)), &s));
        assert!(evaluate(&Predicate::TargetFormat(FormatPattern::Rgb), &s));
        assert!(evaluate(&Predicate::LayerNumber(0), &s));
        s.layer = 1;
        assert!(evaluate(&Predicate::LayerId(Pattern::Is(LayerRole::RenderTarget)), &s));
        assert!(!evaluate(&Predicate::Src0Format(FormatPattern::Any), &s));
        assert!(evaluate(&Predicate::Src0Format(FormatPattern::None), &s));
    }
}
