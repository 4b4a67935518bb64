//! Configuration: capacity limits, cache sizing and output-packing heuristics.
//!
//! Defaults reproduce the fixed bounds of the hardware kernel library.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::color::PixelFormat;
use crate::error::ConfigError;
use crate::layer::TileType;
use crate::types::CoeffId;

/// Fixed per-search / per-build bounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Layers including the render target.
    pub max_filter_entries: usize,
    pub max_kernels: usize,
    pub max_patches: usize,
    pub max_patch_blocks: usize,
    /// Bytes of patch data per record.
    pub max_patch_data: usize,
    /// Imports + exports tracked per build.
    pub max_symbols: usize,
    pub max_kernel_size: usize,
    pub max_csc_matrices: usize,
    pub max_procamps: usize,
    pub max_search_steps: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_filter_entries: 10,
            max_kernels: 256,
            max_patches: 8,
            max_patch_blocks: 8,
            max_patch_data: 64,
            max_symbols: 100,
            max_kernel_size: 160 * 1024,
            max_csc_matrices: CoeffId::SLOTS,
            max_procamps: 1,
            max_search_steps: 4096,
        }
    }
}

/// Combined-kernel cache sizing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub initial_entries: usize,
    pub grow_entries: usize,
    pub max_entries: usize,
    /// Bytes reserved per cached kernel.
    pub block_size: usize,
    /// Usage counter value at which all counters are rebased.
    pub rebase_threshold: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_entries: 4,
            grow_entries: 4,
            max_entries: 64,
            block_size: 160 * 1024,
            rebase_threshold: 0x4000_0000,
        }
    }
}

/// Output-packing heuristics applied when a search starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPackingConfig {
    /// Render-target formats eligible for 64-byte saves.
    pub wide_save_formats: Vec<PixelFormat>,
    /// Render-target tilings eligible for 64-byte saves.
    pub wide_save_tile_types: Vec<TileType>,
    /// Reorder AVS sampler output.
    pub shuffle: bool,
}

impl Default for OutputPackingConfig {
    fn default() -> Self {
        Self {
            wide_save_formats: vec![
                PixelFormat::Argb8,
                PixelFormat::Abgr8,
                PixelFormat::Xrgb8,
                PixelFormat::Xbgr8,
            ],
            wide_save_tile_types: vec![TileType::TileY],
            shuffle: true,
        }
    }
}

/// Top-level engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub limits: Limits,
    pub cache: CacheConfig,
    pub output_packing: OutputPackingConfig,
    /// Number of procamp table slots.
    pub procamp_slots: usize,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        info!(
            max_kernels = config.limits.max_kernels,
            cache_entries = config.cache.max_entries,
            procamp_slots = config.procamp_slots,
            "engine configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.limits;
        if l.max_filter_entries < 2 {
            return Err(invalid("max_filter_entries must allow a layer and a render target"));
        }
        if l.max_kernels == 0 || l.max_symbols == 0 || l.max_kernel_size == 0 {
            return Err(invalid("kernel limits must be non-zero"));
        }
        if l.max_csc_matrices > CoeffId::SLOTS {
            return Err(invalid(format!(
                "max_csc_matrices {} exceeds {} coefficient slots",
                l.max_csc_matrices,
                CoeffId::SLOTS
            )));
        }
        if l.max_patch_data > u8::MAX as usize + 1 {
            return Err(invalid("max_patch_data must fit an 8-bit source offset"));
        }
        if l.max_search_steps == 0 {
            return Err(invalid("max_search_steps must be non-zero"));
        }
        let c = &self.cache;
        if c.initial_entries == 0 || c.grow_entries == 0 {
            return Err(invalid("cache increments must be non-zero"));
        }
        if c.initial_entries > c.max_entries {
            return Err(invalid("cache initial_entries exceeds max_entries"));
        }
        if c.block_size < l.max_kernel_size {
            return Err(invalid("cache block_size smaller than max_kernel_size"));
        }
        if c.rebase_threshold == 0 {
            return Err(invalid("rebase_threshold must be non-zero"));
        }
        if self.procamp_slots < l.max_procamps {
            return Err(invalid("procamp_slots smaller than max_procamps"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            cache: CacheConfig::default(),
            output_packing: OutputPackingConfig::default(),
            procamp_slots: 1,
        }
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}
