//! Kernel builder / dynamic linker.
//!
//! Concatenates the selected component kernels, pulls in the kernels that
//! define their imports and relocates every jump to its export. Patch
//! records from the search are written into the selected kernels' copies.

use byteorder::{ByteOrder, LittleEndian};
use kdll_common::{KernelId, Limits, LinkError, PatchRecord, RuleGroup, SelectedKernel};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use crate::repository::ComponentRepository;
use crate::symbols::{Symbol, SymbolTable};

/// Size of a control-transfer instruction.
pub const JUMP_SIZE: usize = 16;
/// Byte offset of the jump displacement inside the instruction.
pub const JUMP_IMMEDIATE: usize = 12;
/// Deepest chain of inline dependencies followed.
pub const MAX_INLINE_DEPTH: usize = 8;

/// One component kernel copied into the combined binary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedKernel {
    pub id: KernelId,
    pub custom: bool,
    pub offset: usize,
    pub size: usize,
    /// Selected by the search (as opposed to pulled in by an import).
    pub requested: bool,
}

/// A linked combined kernel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedKernel {
    pub binary: Vec<u8>,
    pub kernels: Vec<PlacedKernel>,
    pub symbols: SymbolTable,
}

pub struct KernelLinker<'a> {
    main: &'a ComponentRepository,
    custom: Option<&'a ComponentRepository>,
    limits: &'a Limits,
}

struct Output {
    binary: Vec<u8>,
    kernels: Vec<PlacedKernel>,
    symbols: SymbolTable,
}

impl<'a> KernelLinker<'a> {
    pub fn new(
        main: &'a ComponentRepository,
        custom: Option<&'a ComponentRepository>,
        limits: &'a Limits,
    ) -> Self {
        Self {
            main,
            custom,
            limits,
        }
    }

    fn repository(&self, custom: bool) -> Result<&'a ComponentRepository, LinkError> {
        if custom {
            self.custom.ok_or(LinkError::NoCustomRepository)
        } else {
            Ok(self.main)
        }
    }

    /// Link `selection` in order. `patches` is indexed by
    /// [`SelectedKernel::patch`].
    pub fn link(
        &self,
        selection: &[SelectedKernel],
        patches: &[PatchRecord],
    ) -> Result<LinkedKernel, LinkError> {
        let mut out = Output {
            binary: Vec::new(),
            kernels: Vec::new(),
            symbols: SymbolTable::new(self.limits.max_symbols),
        };

        for selected in selection {
            let custom = selected.group == RuleGroup::Custom;
            let placed = self.append(&mut out, selected.id, custom, true, 0)?;
            if let Some(p) = selected.patch {
                match patches.get(p) {
                    Some(record) => apply_patch(&mut out, placed, record)?,
                    None => warn!(kernel = %selected.id, patch = p, "Missing patch record"),
                }
            }
        }

        self.resolve(&mut out)?;
        relocate(&mut out)?;

        debug!(
            kernels = out.kernels.len(),
            requested = selection.len(),
            symbols = out.symbols.len(),
            bytes = out.binary.len(),
            "Kernel linked"
        );
        Ok(LinkedKernel {
            binary: out.binary,
            kernels: out.kernels,
            symbols: out.symbols,
        })
    }

    /// Copy one kernel, record its symbols and inline its inline imports.
    fn append(
        &self,
        out: &mut Output,
        id: KernelId,
        custom: bool,
        requested: bool,
        depth: usize,
    ) -> Result<usize, LinkError> {
        let repo = self.repository(custom)?;
        let code = repo.kernel(id)?;
        let needed = out.binary.len() + code.len();
        if needed > self.limits.max_kernel_size {
            return Err(LinkError::OutputOverflow {
                needed,
                capacity: self.limits.max_kernel_size,
            });
        }

        let base = out.binary.len();
        out.binary.extend_from_slice(code);
        out.kernels.push(PlacedKernel {
            id,
            custom,
            offset: base,
            size: code.len(),
            requested,
        });
        let placed = out.kernels.len() - 1;
        trace!(kernel = %id, offset = base, size = code.len(), "Kernel appended");

        let mut inline_imports = Vec::new();
        for r in repo.records(id) {
            let index = out.symbols.push(Symbol {
                label: r.label,
                placed,
                offset: base + r.offset_bytes(),
                export: r.export,
                inline: r.inline,
                custom,
                target: None,
            })?;
            if !r.export && r.inline {
                inline_imports.push((index, r.label));
            }
        }

        for (index, label) in inline_imports {
            if depth >= MAX_INLINE_DEPTH {
                return Err(LinkError::InlineTooDeep {
                    max: MAX_INLINE_DEPTH,
                });
            }
            let (dep, _) = repo.exporter(label).ok_or_else(|| unresolved(label))?;
            self.append(out, dep, custom, false, depth + 1)?;
            let target = out
                .symbols
                .find_export(label, custom)
                .map(|s| s.offset)
                .ok_or_else(|| unresolved(label))?;
            out.symbols.bind(index, target);
        }
        Ok(placed)
    }

    /// Bind every import, appending defining kernels until nothing is
    /// outstanding.
    fn resolve(&self, out: &mut Output) -> Result<(), LinkError> {
        while let Some(index) = out.symbols.next_unresolved() {
            let Some(import) = out.symbols.get(index).copied() else {
                break;
            };
            if let Some(export) = out.symbols.find_export(import.label, import.custom) {
                let target = export.offset;
                out.symbols.bind(index, target);
                continue;
            }
            let repo = self.repository(import.custom)?;
            let (dep, _) = repo
                .exporter(import.label)
                .ok_or_else(|| unresolved(import.label))?;
            trace!(label = %import.label, kernel = %dep, "Import pulls in kernel");
            self.append(out, dep, import.custom, false, 0)?;
            if out
                .symbols
                .find_export(import.label, import.custom)
                .is_none()
            {
                return Err(unresolved(import.label));
            }
        }
        Ok(())
    }
}

fn unresolved(label: kdll_common::LabelId) -> LinkError {
    error!(%label, "Export not found in kernel repository");
    LinkError::UnresolvedExport(label)
}

/// Write the displacement of every non-inline import into its jump.
fn relocate(out: &mut Output) -> Result<(), LinkError> {
    for import in out.symbols.imports() {
        if import.inline {
            continue;
        }
        let Some(target) = import.target else {
            return Err(LinkError::UnresolvedExport(import.label));
        };
        let site = import.offset;
        let end = site + JUMP_SIZE;
        let kernel_end = out
            .kernels
            .get(import.placed)
            .map_or(0, |k| k.offset + k.size);
        if end > kernel_end {
            return Err(LinkError::BadImportSite { offset: site });
        }
        let displacement = target as i64 - end as i64;
        LittleEndian::write_i32(
            &mut out.binary[site + JUMP_IMMEDIATE..end],
            displacement as i32,
        );
    }
    Ok(())
}

fn apply_patch(out: &mut Output, placed: usize, record: &PatchRecord) -> Result<(), LinkError> {
    let Some(kernel) = out.kernels.get(placed).copied() else {
        return Ok(());
    };
    for block in &record.blocks {
        let out_of_bounds = LinkError::PatchOutOfBounds {
            kernel: kernel.id,
            start: block.dst as usize,
            end: block.dst_end(),
            size: kernel.size,
        };
        if block.dst_end() > kernel.size {
            return Err(out_of_bounds);
        }
        let Some(src) = record.data.get(block.src as usize..block.src_end()) else {
            return Err(out_of_bounds);
        };
        let dst = kernel.offset + block.dst as usize;
        out.binary[dst..dst + src.len()].copy_from_slice(src);
    }
    trace!(kernel = %kernel.id, blocks = record.blocks.len(), "Patch applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LinkRecord;
    use crate::repository::BlobWriter;
    use kdll_common::{LabelId, PatchBlock};

    fn selected(id: u16) -> SelectedKernel {
        SelectedKernel::new(KernelId(id), RuleGroup::Default)
    }

    fn repo(w: &BlobWriter) -> ComponentRepository {
        ComponentRepository::from_bytes(&w.finish().unwrap()).unwrap()
    }

    #[test]
    fn concatenates_in_order() {
        let mut w = BlobWriter::new();
        w.add_kernel(vec![1; 16]);
        w.add_kernel(vec![2; 32]);
        let r = repo(&w);
        let limits = Limits::default();
        let linked = KernelLinker::new(&r, None, &limits)
            .link(&[selected(1), selected(0), selected(1)], &[])
            .unwrap();
        assert_eq!(linked.binary.len(), 80);
        assert_eq!(linked.kernels[1].offset, 32);
        assert_eq!(&linked.binary[32..48], &[1; 16][..]);
        assert!(linked.kernels.iter().all(|k| k.requested));
    }

    #[test]
    fn inline_dependency_follows_importer() {
        let mut w = BlobWriter::new();
        let a = w.add_kernel(vec![0xA; 32]);
        let b = w.add_kernel(vec![0xB; 16]);
        let c = w.add_kernel(vec![0xC; 16]);
        w.add_record(LinkRecord::import(a, LabelId(1), 4).inlined());
        w.add_record(LinkRecord::export(b, LabelId(1), 0).inlined());
        let r = repo(&w);
        let limits = Limits::default();
        let linked = KernelLinker::new(&r, None, &limits)
            .link(&[selected(a.0), selected(c.0)], &[])
            .unwrap();
        let ids: Vec<_> = linked.kernels.iter().map(|k| k.id).collect();
        assert_eq!(ids, vec![a, b, c]);
        assert!(!linked.kernels[1].requested);
        // inline imports are reached by fall-through, not patched
        assert_eq!(&linked.binary[0..32], &[0xA; 32][..]);
    }

    #[test]
    fn overflow_and_invalid_ids() {
        let mut w = BlobWriter::new();
        w.add_kernel(vec![0; 64]);
        let r = repo(&w);
        let limits = Limits {
            max_kernel_size: 100,
            ..Limits::default()
        };
        let linker = KernelLinker::new(&r, None, &limits);
        assert!(matches!(
            linker.link(&[selected(0), selected(0)], &[]),
            Err(LinkError::OutputOverflow {
                needed: 128,
                capacity: 100
            })
        ));
        assert!(matches!(
            linker.link(&[selected(5)], &[]),
            Err(LinkError::InvalidKernel(KernelId(5)))
        ));
        let custom = SelectedKernel::new(KernelId(0), RuleGroup::Custom);
        assert!(matches!(
            linker.link(&[custom], &[]),
            Err(LinkError::NoCustomRepository)
        ));
    }

    #[test]
    fn unresolved_export_is_fatal() {
        let mut w = BlobWriter::new();
        let a = w.add_kernel(vec![0; 32]);
        w.add_record(LinkRecord::import(a, LabelId(9), 0));
        let r = repo(&w);
        let limits = Limits::default();
        assert!(matches!(
            KernelLinker::new(&r, None, &limits).link(&[selected(0)], &[]),
            Err(LinkError::UnresolvedExport(LabelId(9)))
        ));
    }

    #[test]
    fn patches_are_bounds_checked() {
        let mut w = BlobWriter::new();
        w.add_kernel(vec![0; 32]);
        let r = repo(&w);
        let limits = Limits::default();
        let linker = KernelLinker::new(&r, None, &limits);
        let mut k = selected(0);
        k.patch = Some(0);

        let record = PatchRecord {
            data: vec![1, 2, 3, 4],
            blocks: vec![PatchBlock::new(8, 0, 4)],
        };
        let linked = linker.link(&[k], &[record]).unwrap();
        assert_eq!(&linked.binary[8..12], &[1, 2, 3, 4]);

        let record = PatchRecord {
            data: vec![1, 2, 3, 4],
            blocks: vec![PatchBlock::new(30, 0, 4)],
        };
        assert!(matches!(
            linker.link(&[k], &[record]),
            Err(LinkError::PatchOutOfBounds {
                start: 30,
                end: 34,
                size: 32,
                ..
            })
        ));
    }

    #[test]
    fn symbol_capacity() {
        let mut w = BlobWriter::new();
        let a = w.add_kernel(vec![0; 32]);
        w.add_record(LinkRecord::export(a, LabelId(1), 0));
        w.add_record(LinkRecord::export(a, LabelId(2), 4));
        let r = repo(&w);
        let limits = Limits {
            max_symbols: 1,
            ..Limits::default()
        };
        assert!(matches!(
            KernelLinker::new(&r, None, &limits).link(&[selected(0)], &[]),
            Err(LinkError::TooManySymbols { max: 1 })
        ));
    }
}
