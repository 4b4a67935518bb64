//! Filter entries: the caller's per-layer description of a composition.
//!
//! A filter chain is an ordered slice of [`FilterEntry`] whose last element
//! is the render target. The chain is compared byte-for-byte (through
//! [`FilterEntry::key_bytes`]) when looking up cached kernels.

use serde::{Deserialize, Serialize};

use crate::blend::Processing;
use crate::color::{ColorSpace, PixelFormat};
use crate::layer::{
    CscCoeffMode, LayerRole, RenderMethod, Rotation, Sampling, ScalingRatio, TileType,
};
use crate::types::CoeffId;

/// Size of the canonical byte encoding of one entry.
pub const FILTER_KEY_LEN: usize = 20;

const UNSET: u8 = 0xFF;

/// Composition descriptor for one layer (or the render target).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterEntry {
    pub layer: LayerRole,
    pub format: PixelFormat,
    pub color_space: ColorSpace,
    pub sampling: Option<Sampling>,
    pub color_fill: bool,
    pub luma_key: bool,
    pub sampler_luma_key: bool,
    pub processing: Option<Processing>,
    /// Index into the procamp table.
    pub procamp: Option<u8>,
    /// CSC coefficient slot, assigned by the CSC planner.
    pub matrix: Option<CoeffId>,
    pub rotation: Rotation,
    pub tile_type: TileType,
    pub dual_output: bool,
    pub chroma_siting: Option<u8>,
    pub const_out_alpha: bool,
    pub dither_needed: bool,
    pub scaling_ratio: ScalingRatio,
    pub render_method: RenderMethod,
    pub csc_coeff_mode: CscCoeffMode,
    /// Render target only: make its colorspace the working colorspace.
    pub force_target_color_space: bool,
}

impl FilterEntry {
    /// An input layer with no sampling, processing or procamp selected yet.
    pub fn layer(layer: LayerRole, format: PixelFormat, color_space: ColorSpace) -> Self {
        Self {
            layer,
            format,
            color_space,
            sampling: None,
            color_fill: false,
            luma_key: false,
            sampler_luma_key: false,
            processing: None,
            procamp: None,
            matrix: None,
            rotation: Rotation::Identity,
            tile_type: TileType::Linear,
            dual_output: false,
            chroma_siting: None,
            const_out_alpha: false,
            dither_needed: false,
            scaling_ratio: ScalingRatio::Any,
            render_method: RenderMethod::MediaObject,
            csc_coeff_mode: CscCoeffMode::Curbe,
            force_target_color_space: false,
        }
    }

    pub fn render_target(format: PixelFormat, color_space: ColorSpace) -> Self {
        Self::layer(LayerRole::RenderTarget, format, color_space)
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = Some(sampling);
        self
    }

    pub fn with_processing(mut self, processing: Processing) -> Self {
        self.processing = Some(processing);
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_procamp(mut self, id: u8) -> Self {
        self.procamp = Some(id);
        self
    }

    pub fn with_color_fill(mut self, on: bool) -> Self {
        self.color_fill = on;
        self
    }

    pub fn with_luma_key(mut self, on: bool) -> Self {
        self.luma_key = on;
        self
    }

    pub fn with_sampler_luma_key(mut self, on: bool) -> Self {
        self.sampler_luma_key = on;
        self
    }

    pub fn with_scale(mut self, factor: f32) -> Self {
        self.scaling_ratio = ScalingRatio::from_factor(factor);
        self
    }

    pub fn with_scaling_ratio(mut self, ratio: ScalingRatio) -> Self {
        self.scaling_ratio = ratio;
        self
    }

    pub fn with_tile_type(mut self, tile_type: TileType) -> Self {
        self.tile_type = tile_type;
        self
    }

    pub fn with_render_method(mut self, method: RenderMethod) -> Self {
        self.render_method = method;
        self
    }

    pub fn with_csc_coeff_mode(mut self, mode: CscCoeffMode) -> Self {
        self.csc_coeff_mode = mode;
        self
    }

    pub fn with_const_out_alpha(mut self, on: bool) -> Self {
        self.const_out_alpha = on;
        self
    }

    pub fn with_dither(mut self, on: bool) -> Self {
        self.dither_needed = on;
        self
    }

    pub fn with_dual_output(mut self, on: bool) -> Self {
        self.dual_output = on;
        self
    }

    pub fn with_chroma_siting(mut self, siting: u8) -> Self {
        self.chroma_siting = Some(siting);
        self
    }

    pub fn forcing_target_color_space(mut self) -> Self {
        self.force_target_color_space = true;
        self
    }

    pub fn is_render_target(&self) -> bool {
        self.layer.is_render_target()
    }

    /// Canonical byte encoding: one byte per attribute, `0xFF` for unset.
    pub fn key_bytes(&self) -> [u8; FILTER_KEY_LEN] {
        [
            self.layer as u8,
            self.format as u8,
            self.color_space as u8,
            self.sampling.map_or(UNSET, |s| s as u8),
            self.color_fill as u8,
            self.luma_key as u8,
            self.sampler_luma_key as u8,
            self.processing.map_or(UNSET, |p| p as u8),
            self.procamp.unwrap_or(UNSET),
            self.matrix.map_or(UNSET, |m| m.0),
            self.rotation as u8,
            self.tile_type as u8,
            self.dual_output as u8,
            self.chroma_siting.unwrap_or(UNSET),
            self.const_out_alpha as u8,
            self.dither_needed as u8,
            self.scaling_ratio as u8,
            self.render_method as u8,
            self.csc_coeff_mode as u8,
            self.force_target_color_space as u8,
        ]
    }
}

/// Concatenated key of a whole chain.
pub fn chain_key(chain: &[FilterEntry]) -> Vec<u8> {
    let mut key = Vec::with_capacity(chain.len() * FILTER_KEY_LEN);
    for entry in chain {
        key.extend_from_slice(&entry.key_bytes());
    }
    key
}
