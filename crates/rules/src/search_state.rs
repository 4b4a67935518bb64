//! Transient per-request search state.

use kdll_common::{
    CoeffId, ColorSpace, FilterEntry, LayerRole, Limits, OutputPackingConfig, PatchRecord,
    PixelFormat, Processing, Rotation, Sampling, ScalingRatio, SearchError, SelectedKernel,
    Shuffling, TileType,
};
use kdll_csc::CscParams;
use tracing::debug;

use crate::state::ParserState;

/// Feature flags supplied by the caller when a search starts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SearchFlags {
    /// The platform supports 64-byte save instructions.
    pub wide_instructions: bool,
}

impl SearchFlags {
    /// Canonical encoding appended to a chain's cache key.
    pub fn key_bytes(&self) -> [u8; 1] {
        [self.wide_instructions as u8]
    }
}

/// Working attributes of one source slot (src0 or src1).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceState {
    pub format: Option<PixelFormat>,
    pub sampling: Option<Sampling>,
    pub rotation: Option<Rotation>,
    pub color_fill: bool,
    pub luma_key: bool,
    pub sampler_luma_key: bool,
    pub procamp: Option<u8>,
    pub coeff: Option<CoeffId>,
    pub processing: Option<Processing>,
    pub chroma_siting: Option<u8>,
}

#[derive(Clone, Debug)]
pub struct SearchState {
    pub state: ParserState,
    /// Layer cursor into `chain`.
    pub layer: usize,
    /// Working copy of the caller's chain; the CSC planner writes the
    /// coefficient slots into it.
    pub chain: Vec<FilterEntry>,
    pub flags: SearchFlags,

    pub src0: SourceState,
    pub src1: SourceState,
    pub quadrant: u8,
    pub csc_before_mix: bool,
    pub target_color_space: Option<ColorSpace>,

    // Captured from the render target and the chain at start.
    pub target_format: PixelFormat,
    pub target_tile_type: TileType,
    pub rt_rotate: bool,
    pub const_out_alpha: bool,
    pub dither_needed: bool,
    pub wide_save: bool,
    pub shuffling: Shuffling,
    pub scaling_ratio: ScalingRatio,
    pub procamp_enabled: bool,

    pub kernels: Vec<SelectedKernel>,
    pub patches: Vec<PatchRecord>,
    pub csc: CscParams,
    pub steps: usize,
}

impl SearchState {
    /// Validate `chain` and capture the render-target derived attributes.
    pub fn new(
        chain: &[FilterEntry],
        flags: SearchFlags,
        limits: &Limits,
        packing: &OutputPackingConfig,
    ) -> Result<Self, SearchError> {
        let Some((rt, layers)) = chain.split_last() else {
            return Err(SearchError::EmptyChain);
        };
        if chain.len() > limits.max_filter_entries {
            return Err(SearchError::ChainTooLong {
                len: chain.len(),
                max: limits.max_filter_entries,
            });
        }
        if !rt.is_render_target() || layers.iter().any(|l| l.is_render_target()) {
            return Err(SearchError::RenderTargetPlacement);
        }

        let wide_save = flags.wide_instructions
            && packing.wide_save_formats.contains(&rt.format)
            && packing.wide_save_tile_types.contains(&rt.tile_type)
            && rt.rotation.is_identity();
        let shuffling = if packing.shuffle {
            shuffling(layers)
        } else {
            Shuffling::None
        };
        let scaling_ratio = layers
            .iter()
            .find(|l| l.layer == LayerRole::MainVideo)
            .or_else(|| layers.first())
            .map_or(ScalingRatio::Any, |l| l.scaling_ratio);

        debug!(
            layers = layers.len(),
            target = ?rt.format,
            wide_save,
            shuffling = ?shuffling,
            "Search started"
        );

        Ok(Self {
            state: ParserState::Begin,
            layer: 0,
            chain: chain.to_vec(),
            flags,
            src0: SourceState::default(),
            src1: SourceState::default(),
            quadrant: 0,
            csc_before_mix: false,
            target_color_space: Some(rt.color_space),
            target_format: rt.format,
            target_tile_type: rt.tile_type,
            rt_rotate: !rt.rotation.is_identity(),
            const_out_alpha: rt.const_out_alpha,
            dither_needed: rt.dither_needed,
            wide_save,
            shuffling,
            scaling_ratio,
            procamp_enabled: false,
            kernels: Vec::new(),
            patches: Vec::new(),
            csc: CscParams {
                working: rt.color_space,
                matrices: Vec::new(),
            },
            steps: 0,
        })
    }

    /// Rewind to `Begin` after CSC planning, dropping any previous result.
    pub fn reset(&mut self, csc: CscParams) {
        self.state = ParserState::Begin;
        self.layer = 0;
        self.src0 = SourceState::default();
        self.src1 = SourceState::default();
        self.quadrant = 0;
        self.csc_before_mix = false;
        self.target_color_space = Some(csc.working);
        self.procamp_enabled = self.chain.iter().any(|e| e.procamp.is_some());
        self.kernels.clear();
        self.patches.clear();
        self.csc = csc;
        self.steps = 0;
    }

    /// The entry under the layer cursor.
    pub fn current(&self) -> &FilterEntry {
        // The cursor is bounds-checked on every move and the chain is
        // never empty.
        &self.chain[self.layer.min(self.chain.len() - 1)]
    }

    pub fn is_complete(&self) -> bool {
        self.state == ParserState::End
    }

    pub fn render_target(&self) -> &FilterEntry {
        &self.chain[self.chain.len() - 1]
    }
}

/// Sampler output reordering: none without AVS layers, render-target only
/// when every sampled layer uses AVS, else all 8x8 layers.
fn shuffling(layers: &[FilterEntry]) -> Shuffling {
    let sampled = layers.iter().filter(|l| l.sampling.is_some()).count();
    let avs = layers
        .iter()
        .filter(|l| l.sampling.is_some_and(|s| s.is_avs()))
        .count();
    match avs {
        0 => Shuffling::None,
        n if n == sampled => Shuffling::RenderTarget,
        _ => Shuffling::All8x8Layer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nv12_main() -> FilterEntry {
        FilterEntry::layer(LayerRole::MainVideo, PixelFormat::Nv12, ColorSpace::Bt601)
            .with_sampling(Sampling::Scaling)
            .with_scale(0.6)
    }

    fn start(chain: &[FilterEntry], flags: SearchFlags) -> Result<SearchState, SearchError> {
        SearchState::new(
            chain,
            flags,
            &Limits::default(),
            &OutputPackingConfig::default(),
        )
    }

    #[test]
    fn validates_chain_shape() {
        assert_eq!(start(&[], SearchFlags::default()).unwrap_err(), SearchError::EmptyChain);
        let rt = FilterEntry::render_target(PixelFormat::Nv12, ColorSpace::Bt601);
        assert_eq!(
            start(&[rt, nv12_main()], SearchFlags::default()).unwrap_err(),
            SearchError::RenderTargetPlacement
        );
        assert_eq!(
            start(&[nv12_main(), rt, rt], SearchFlags::default()).unwrap_err(),
            SearchError::RenderTargetPlacement
        );
        let long = vec![nv12_main(); 10].into_iter().chain(Some(rt)).collect::<Vec<_>>();
        assert_eq!(
            start(&long, SearchFlags::default()).unwrap_err(),
            SearchError::ChainTooLong { len: 11, max: 10 }
        );
    }

    #[test]
    fn wide_save_needs_flag_format_and_tiling() {
        let rt = FilterEntry::render_target(PixelFormat::Argb8, ColorSpace::Srgb)
            .with_tile_type(TileType::TileY);
        let chain = [nv12_main(), rt];
        let on = SearchFlags {
            wide_instructions: true,
        };
        assert!(start(&chain, on).unwrap().wide_save);
        assert!(!start(&chain, SearchFlags::default()).unwrap().wide_save);

        let linear = [nv12_main(), rt.with_tile_type(TileType::Linear)];
        assert!(!start(&linear, on).unwrap().wide_save);

        let rotated = [nv12_main(), rt.with_rotation(Rotation::Rotate90)];
        let s = start(&rotated, on).unwrap();
        assert!(!s.wide_save);
        assert!(s.rt_rotate);
    }

    #[test]
    fn shuffling_modes() {
        let rt = FilterEntry::render_target(PixelFormat::Nv12, ColorSpace::Bt601);
        let avs = nv12_main().with_sampling(Sampling::ScalingAvs);
        let sub = FilterEntry::layer(LayerRole::SubPicture1, PixelFormat::Argb8, ColorSpace::Srgb)
            .with_sampling(Sampling::Scaling);

        let s = start(&[nv12_main(), rt], SearchFlags::default()).unwrap();
        assert_eq!(s.shuffling, Shuffling::None);
        let s = start(&[avs, rt], SearchFlags::default()).unwrap();
        assert_eq!(s.shuffling, Shuffling::RenderTarget);
        let s = start(&[avs, sub, rt], SearchFlags::default()).unwrap();
        assert_eq!(s.shuffling, Shuffling::All8x8Layer);

        let packing = OutputPackingConfig {
            shuffle: false,
            ..OutputPackingConfig::default()
        };
        let s = SearchState::new(&[avs, rt], SearchFlags::default(), &Limits::default(), &packing)
            .unwrap();
        assert_eq!(s.shuffling, Shuffling::None);
    }

    #[test]
    fn scaling_ratio_prefers_main_video() {
        let rt = FilterEntry::render_target(PixelFormat::Nv12, ColorSpace::Bt601);
        let bg = FilterEntry::layer(LayerRole::Background, PixelFormat::Argb8, ColorSpace::Srgb)
            .with_scale(2.0);
        let s = start(&[bg, nv12_main(), rt], SearchFlags::default()).unwrap();
        assert_eq!(s.scaling_ratio, ScalingRatio::B1p2To1);
        let s = start(&[bg, rt], SearchFlags::default()).unwrap();
        assert_eq!(s.scaling_ratio, ScalingRatio::Over1);
    }
}
