//! Central error types for the KDLL engine (thiserror-based).
//!
//! Every failure maps onto one of three classes (see [`ErrorClass`]):
//! consistency errors between rule table and repository, capacity errors
//! that a caller can avoid by simplifying the composition, and the expected
//! "no rule matches this chain" outcome.

use thiserror::Error;

use crate::patch::PatchKind;
use crate::types::{KernelId, LabelId};

/// Coarse classification used by callers to pick a fallback policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Rule table, repository or configuration do not agree. Not recoverable
    /// for this request.
    Consistency,
    /// A fixed bound was exceeded.
    Capacity,
    /// The chain is valid but has no kernel mapping on this generation.
    NoMatch,
}

/// Top-level error.
#[derive(Error, Debug)]
pub enum KdllError {
    #[error("Rule table error: {0}")]
    Rule(#[from] RuleError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("CSC error: {0}")]
    Csc(#[from] CscError),

    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl KdllError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Rule(_) | Self::Config(_) => ErrorClass::Consistency,
            Self::Search(e) => e.class(),
            Self::Csc(e) => e.class(),
            Self::Link(e) => e.class(),
            Self::Cache(e) => e.class(),
        }
    }
}

/// Malformed rule streams, detected while compiling a table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Rule at position {index} precedes the first rule set")]
    OutsideRuleSet { index: usize },

    #[error("Rule stream is not terminated by EOF")]
    MissingEof,

    #[error("Rule set {set}: match rule after an action")]
    MatchAfterAction { set: usize },

    #[error("Rule set {set}: first match rule is not a parser-state predicate")]
    MissingStatePredicate { set: usize },

    #[error("Rule set {set}: no actions")]
    NoActions { set: usize },

    #[error("Unknown legacy opcode {id:#06x} (value {value})")]
    UnknownOpcode { id: u16, value: i32 },

    #[error("Legacy opcode {id:#06x}: invalid value {value}")]
    InvalidValue { id: u16, value: i32 },

    #[error("Legacy opcode {id:#06x}: payload truncated")]
    TruncatedPayload { id: u16 },

    #[error("Legacy rule stream of {len} bytes is not a whole number of entries")]
    MalformedLegacyStream { len: usize },

    #[error("Kernel name not in catalog: {0}")]
    UnknownKernel(String),
}

/// Failures while searching for a kernel sequence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Filter chain is empty")]
    EmptyChain,

    #[error("Filter chain has {len} entries, max {max}")]
    ChainTooLong { len: usize, max: usize },

    #[error("Filter chain must end with exactly one render target")]
    RenderTargetPlacement,

    #[error("No rule matches in parser state {state}")]
    NoMatch { state: String },

    #[error("Kernel list full (max {max})")]
    TooManyKernels { max: usize },

    #[error("Patch records full (max {max})")]
    TooManyPatches { max: usize },

    #[error("Patch blocks full (max {max})")]
    TooManyPatchBlocks { max: usize },

    #[error("Patch data too large: {size} bytes, max {max}")]
    PatchDataTooLarge { size: usize, max: usize },

    #[error("Patch data or blocks with no kernel to attach to")]
    NoPatchTarget,

    #[error("No {kind:?} patch data available")]
    MissingPatchData { kind: PatchKind },

    #[error("Patch block reads [{start}, {end}) outside {len} bytes of patch data")]
    PatchSourceOutOfRange { start: usize, end: usize, len: usize },

    #[error("Layer cursor moved to {index}, chain has {len} entries")]
    LayerOutOfRange { index: isize, len: usize },

    #[error("No main-video layer in the chain")]
    NoMainVideo,

    #[error("Search exceeded {steps} rule applications")]
    StepLimit { steps: usize },

    #[error("Search state was not started")]
    NotStarted,

    #[error("CSC planning failed: {0}")]
    Csc(#[from] CscError),
}

impl SearchError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoMatch { .. } => ErrorClass::NoMatch,
            Self::ChainTooLong { .. }
            | Self::TooManyKernels { .. }
            | Self::TooManyPatches { .. }
            | Self::TooManyPatchBlocks { .. }
            | Self::PatchDataTooLarge { .. }
            | Self::LayerOutOfRange { .. } => ErrorClass::Capacity,
            Self::Csc(e) => e.class(),
            Self::EmptyChain
            | Self::RenderTargetPlacement
            | Self::NoPatchTarget
            | Self::MissingPatchData { .. }
            | Self::PatchSourceOutOfRange { .. }
            | Self::NoMainVideo
            | Self::StepLimit { .. }
            | Self::NotStarted => ErrorClass::Consistency,
        }
    }
}

/// CSC planning and procamp errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CscError {
    #[error("Too many CSC matrices (max {max})")]
    TooManyMatrices { max: usize },

    #[error("Too many active procamps (max {max})")]
    TooManyProcamps { max: usize },

    #[error("Procamp {field} out of range: {value}")]
    ProcampOutOfRange { field: &'static str, value: f32 },

    #[error("Procamp id {id} out of range (table has {max} slots)")]
    InvalidProcampId { id: u8, max: usize },
}

impl CscError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::TooManyMatrices { .. } | Self::TooManyProcamps { .. } => ErrorClass::Capacity,
            Self::ProcampOutOfRange { .. } | Self::InvalidProcampId { .. } => {
                ErrorClass::Consistency
            }
        }
    }
}

/// Repository loading and dynamic-linking errors.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Invalid kernel id {0}")]
    InvalidKernel(KernelId),

    #[error("Kernel binary overflow: {needed} bytes needed, capacity {capacity}")]
    OutputOverflow { needed: usize, capacity: usize },

    #[error("Symbol table full (max {max})")]
    TooManySymbols { max: usize },

    #[error("Unresolved export {0}")]
    UnresolvedExport(LabelId),

    #[error("Inline dependency chain deeper than {max}")]
    InlineTooDeep { max: usize },

    #[error("Import site at byte {offset} does not fit a jump instruction")]
    BadImportSite { offset: usize },

    #[error("Patch block [{start}, {end}) outside kernel {kernel} ({size} bytes)")]
    PatchOutOfBounds {
        kernel: KernelId,
        start: usize,
        end: usize,
        size: usize,
    },

    #[error("Malformed kernel blob: {0}")]
    MalformedBlob(String),

    #[error("No custom kernel repository loaded")]
    NoCustomRepository,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::OutputOverflow { .. } | Self::TooManySymbols { .. } => ErrorClass::Capacity,
            _ => ErrorClass::Consistency,
        }
    }
}

/// Kernel cache errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache pool exhausted ({capacity} entries, nothing evictable)")]
    PoolExhausted { capacity: usize },

    #[error("Combined kernel of {size} bytes exceeds cache block size {block}")]
    EntryTooLarge { size: usize, block: usize },

    #[error("Hash entry points at empty cache slot {slot}")]
    MissingEntry { slot: usize },
}

impl CacheError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingEntry { .. } => ErrorClass::Consistency,
            _ => ErrorClass::Capacity,
        }
    }
}

/// Configuration loading/validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Convenience Result type for engine operations.
pub type KdllResult<T> = Result<T, KdllError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        let e: KdllError = SearchError::NoMatch {
            state: "SampleLayer0".into(),
        }
        .into();
        assert_eq!(e.class(), ErrorClass::NoMatch);

        let e: KdllError = SearchError::Csc(CscError::TooManyMatrices { max: 6 }).into();
        assert_eq!(e.class(), ErrorClass::Capacity);

        let e: KdllError = LinkError::UnresolvedExport(LabelId(4)).into();
        assert_eq!(e.class(), ErrorClass::Consistency);

        let e: KdllError = CacheError::PoolExhausted { capacity: 64 }.into();
        assert_eq!(e.class(), ErrorClass::Capacity);

        let e: KdllError = CacheError::MissingEntry { slot: 3 }.into();
        assert_eq!(e.class(), ErrorClass::Consistency);

        let e: KdllError = SearchError::MissingPatchData {
            kind: PatchKind::CscCoeffSrc1,
        }
        .into();
        assert_eq!(e.class(), ErrorClass::Consistency);

        let e: KdllError = RuleError::MissingEof.into();
        assert_eq!(e.class(), ErrorClass::Consistency);
    }

    #[test]
    fn messages() {
        let e = LinkError::OutputOverflow {
            needed: 10,
            capacity: 4,
        };
        assert_eq!(
            e.to_string(),
            "Kernel binary overflow: 10 bytes needed, capacity 4"
        );
    }
}
