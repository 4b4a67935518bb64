//! `kdll-common` — Shared vocabulary, records and errors for the KDLL engine.
//!
//! This crate is the foundation that all other KDLL crates depend on.
//! It defines:
//!
//! - **Types**: `KernelId`, `LabelId`, `CoeffId`, `CacheId` (newtypes for safety)
//! - **Vocabulary**: `PixelFormat`, `ColorSpace`, `LayerRole`, `Sampling`, `Rotation`, `Processing`, ...
//! - **Patterns**: `Pattern`, `FormatPattern`, `Operand` (rule literals)
//! - **Filter**: `FilterEntry` (one layer of a composition) and its canonical key
//! - **Records**: `SelectedKernel`, `RuleGroup`, `PatchRecord`, `PatchBlock`
//! - **Procamp**: `Procamp`, `ProcampTable`
//! - **Errors**: `KdllError`, `RuleError`, `SearchError`, ... with `ErrorClass` (thiserror-based)
//! - **Config**: `EngineConfig`, `Limits`, `CacheConfig`, `OutputPackingConfig`

pub mod blend;
pub mod color;
pub mod config;
pub mod error;
pub mod filter;
pub mod kernel;
pub mod layer;
pub mod patch;
pub mod pattern;
pub mod procamp;
pub mod types;

// Re-export commonly used items at crate root
pub use blend::Processing;
pub use color::{ColorSpace, FormatClass, PixelFormat, Range, YuvStandard};
pub use config::{CacheConfig, EngineConfig, Limits, OutputPackingConfig};
pub use error::{
    CacheError, ConfigError, CscError, ErrorClass, KdllError, KdllResult, LinkError, RuleError,
    SearchError,
};
pub use filter::{chain_key, FilterEntry, FILTER_KEY_LEN};
pub use kernel::{RuleGroup, SelectedKernel};
pub use layer::{
    CscCoeffMode, LayerRole, RenderMethod, Rotation, Sampling, ScalingRatio, Shuffling, TileType,
};
pub use patch::{PatchBlock, PatchKind, PatchRecord};
pub use pattern::{FormatPattern, Operand, Pattern};
pub use procamp::{Procamp, ProcampTable};
pub use types::{CacheId, CoeffId, KernelId, LabelId};
