//! `kdll-linker` — Component kernel repository and dynamic linker.
//!
//! - **Repository**: `ComponentRepository` parses the kernel blob (offset
//!   table, binaries, link file); `BlobWriter` produces one
//! - **Records**: `LinkRecord`, the packed import/export entry
//! - **Symbols**: `SymbolTable`, the relocated symbols of one build
//! - **Linker**: `KernelLinker` concatenates, resolves imports to a fixed
//!   point, relocates jumps and applies patch blocks

pub mod linker;
pub mod record;
pub mod repository;
pub mod symbols;

// Re-export commonly used items at crate root
pub use linker::{
    KernelLinker, LinkedKernel, PlacedKernel, JUMP_IMMEDIATE, JUMP_SIZE, MAX_INLINE_DEPTH,
};
pub use record::LinkRecord;
pub use repository::{BlobWriter, ComponentRepository};
pub use symbols::{Symbol, SymbolTable};
