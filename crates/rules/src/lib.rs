//! `kdll-rules` — Declarative kernel-selection rules and the search that
//! interprets them.
//!
//! - **Model**: `Rule` (tagged union of match, set and extended rules),
//!   `Predicate`, `Action`, `ParserState`
//! - **Authoring**: `TableBuilder` over a `KernelCatalog`, `legacy::parse`
//!   and `legacy::decode` for compact opcode streams
//! - **Compiler**: `RuleTable` buckets rule sets by parser state
//! - **Search**: `SearchState`, the matcher, the state updater and the
//!   `Searcher` driver loop

pub mod builder;
pub mod catalog;
pub mod driver;
pub mod legacy;
pub mod matcher;
pub mod provider;
pub mod rule;
pub mod search_state;
pub mod state;
pub mod table;
pub mod updater;

// Re-export commonly used items at crate root
pub use builder::TableBuilder;
pub use catalog::KernelCatalog;
pub use driver::Searcher;
pub use legacy::LegacyEntry;
pub use provider::{CscPatchData, PatchDataProvider};
pub use rule::{Action, ExtendedAction, LayerStep, Logic, Predicate, Rule, Step};
pub use search_state::{SearchFlags, SearchState, SourceState};
pub use state::ParserState;
pub use table::{RuleSet, RuleTable};
