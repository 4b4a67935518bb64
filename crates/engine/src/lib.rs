//! `kdll-engine` — Kernel dynamic linking engine facade.
//!
//! Ties the rule machine, CSC planner, linker and cache together for one
//! hardware generation:
//!
//! - **Generations**: `Generation` trait with `Gen10` and `XeXpmPlus`
//!   (component catalog, built-in rule table, config adjustments)
//! - **Engine**: `Engine` for search, build, cached lookup, procamp updates
//!   and in-place coefficient refresh
//! - **Sharing**: `SharedEngine`, a lock-protected handle for
//!   multithreaded hosts
//! - **Config**: `load_config` reads `EngineConfig` from JSON

pub mod config;
pub mod engine;
pub mod gen10;
pub mod generation;
pub mod shared;
pub mod xe_xpm_plus;

// Re-export commonly used items at crate root
pub use config::load_config;
pub use engine::Engine;
pub use gen10::Gen10;
pub use generation::Generation;
pub use shared::SharedEngine;
pub use xe_xpm_plus::XeXpmPlus;
