//! Kernel name catalog.
//!
//! Rule tables name kernels symbolically; the catalog maps those names to
//! the ids (blob indices) of a component repository.

use std::collections::HashMap;

use kdll_common::KernelId;

#[derive(Clone, Debug, Default)]
pub struct KernelCatalog {
    names: Vec<String>,
    ids: HashMap<String, KernelId>,
}

impl KernelCatalog {
    /// Build a catalog; ids follow iteration order, duplicates are skipped.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::default();
        for name in names {
            catalog.push(name.into());
        }
        catalog
    }

    fn push(&mut self, name: String) {
        if self.ids.contains_key(&name) {
            return;
        }
        let id = KernelId(self.names.len() as u16);
        self.ids.insert(name.clone(), id);
        self.names.push(name);
    }

    pub fn id(&self, name: &str) -> Option<KernelId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: KernelId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (KernelId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (KernelId(i as u16), n.as_str()))
    }
}
