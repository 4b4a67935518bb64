//! Symbol table of one build: imports and exports relocated into the
//! combined binary.

use kdll_common::{LabelId, LinkError};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub label: LabelId,
    /// Index of the placed kernel owning the symbol.
    pub placed: usize,
    /// Byte offset in the combined binary.
    pub offset: usize,
    pub export: bool,
    pub inline: bool,
    /// Taken from the custom repository.
    pub custom: bool,
    /// Imports: byte offset of the export it binds to.
    pub target: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    max: usize,
}

impl SymbolTable {
    pub fn new(max: usize) -> Self {
        Self {
            symbols: Vec::new(),
            max,
        }
    }

    pub fn push(&mut self, symbol: Symbol) -> Result<usize, LinkError> {
        if self.symbols.len() >= self.max {
            return Err(LinkError::TooManySymbols { max: self.max });
        }
        self.symbols.push(symbol);
        Ok(self.symbols.len() - 1)
    }

    /// First placed export of `label` from the same repository.
    pub fn find_export(&self, label: LabelId, custom: bool) -> Option<&Symbol> {
        self.symbols
            .iter()
            .find(|s| s.export && s.label == label && s.custom == custom)
    }

    /// Index of the first import not bound to an export yet.
    pub fn next_unresolved(&self) -> Option<usize> {
        self.symbols
            .iter()
            .position(|s| !s.export && s.target.is_none())
    }

    pub fn bind(&mut self, index: usize, target: usize) {
        if let Some(s) = self.symbols.get_mut(index) {
            s.target = Some(target);
        }
    }

    pub fn get(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    pub fn imports(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| !s.export)
    }

    pub fn exports(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.export)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
