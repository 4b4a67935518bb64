//! Kernel selection records produced by the search and consumed by the linker.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::KernelId;

/// Priority group of a rule set; also tags which repository a selected
/// kernel is taken from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleGroup {
    /// Built-in rules.
    #[default]
    Default,
    /// Caller-supplied override rules (kernels from the custom repository).
    Custom,
    /// Rules that overrides can never shadow.
    NoOverride,
}

impl RuleGroup {
    /// Scan rank inside a parser-state bucket (lower is scanned first).
    pub fn rank(self) -> u8 {
        match self {
            Self::NoOverride => 0,
            Self::Custom => 1,
            Self::Default => 2,
        }
    }
}

/// One kernel chosen by the search, in link order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectedKernel {
    pub id: KernelId,
    pub group: RuleGroup,
    /// Index of the patch record attached to this kernel, if any.
    pub patch: Option<usize>,
}

impl SelectedKernel {
    pub fn new(id: KernelId, group: RuleGroup) -> Self {
        Self {
            id,
            group,
            patch: None,
        }
    }
}

impl fmt::Display for SelectedKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.group {
            RuleGroup::Custom => write!(f, "{}*", self.id),
            _ => write!(f, "{}", self.id),
        }
    }
}
