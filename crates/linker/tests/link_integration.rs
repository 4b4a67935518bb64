//! Integration tests for import resolution and jump relocation.
//!
//! Every test assembles a small synthetic repository with `BlobWriter`,
//! parses it back and links a selection through `KernelLinker`.

use kdll_common::{KernelId, LabelId, LinkError, Limits, RuleGroup, SelectedKernel};
use kdll_linker::{
    BlobWriter, ComponentRepository, KernelLinker, LinkRecord, JUMP_IMMEDIATE, JUMP_SIZE,
    MAX_INLINE_DEPTH,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A kernel of `dwords` dwords, each holding `tag` in its low byte.
fn kernel(tag: u8, dwords: usize) -> Vec<u8> {
    (0..dwords).flat_map(|_| [tag, 0, 0, 0]).collect()
}

fn displacement(binary: &[u8], site: usize) -> i32 {
    let at = site + JUMP_IMMEDIATE;
    i32::from_le_bytes([binary[at], binary[at + 1], binary[at + 2], binary[at + 3]])
}

fn select(ids: &[KernelId]) -> Vec<SelectedKernel> {
    ids.iter()
        .map(|id| SelectedKernel::new(*id, RuleGroup::Default))
        .collect()
}

/// `len` kernels where each one inlines the next; the last imports nothing.
fn inline_chain(len: usize) -> ComponentRepository {
    let mut w = BlobWriter::new();
    let ids: Vec<KernelId> = (0..len).map(|i| w.add_kernel(kernel(i as u8, 4))).collect();
    for pair in ids.windows(2) {
        let label = LabelId(pair[1].0);
        w.add_record(LinkRecord::import(pair[0], label, 0).inlined());
        w.add_record(LinkRecord::export(pair[1], label, 0).inlined());
    }
    ComponentRepository::from_bytes(&w.finish().unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn import_pulls_in_exporting_kernel() {
    let mut w = BlobWriter::new();
    let a = w.add_kernel(kernel(0xA, 16));
    let b = w.add_kernel(kernel(0xB, 8));
    let _unused = w.add_kernel(kernel(0xC, 8));
    // A jumps (at dword 4) to label 3, exported by B at dword 2.
    w.add_record(LinkRecord::import(a, LabelId(3), 4));
    w.add_record(LinkRecord::export(b, LabelId(3), 2));
    let repo = ComponentRepository::from_bytes(&w.finish().unwrap()).unwrap();

    let limits = Limits::default();
    let linked = KernelLinker::new(&repo, None, &limits)
        .link(&select(&[a]), &[])
        .unwrap();

    let ids: Vec<_> = linked.kernels.iter().map(|k| k.id).collect();
    assert_eq!(ids, vec![a, b]);
    assert!(linked.kernels[0].requested);
    assert!(!linked.kernels[1].requested);
    assert_eq!(linked.binary.len(), 64 + 32);

    let site = 16;
    let target = 64 + 8;
    assert_eq!(
        displacement(&linked.binary, site),
        (target - (site + JUMP_SIZE)) as i32
    );
    // Bytes outside the immediate are untouched.
    assert_eq!(&linked.binary[site..site + 4], &[0xA, 0, 0, 0]);
}

#[test]
fn backward_jump_to_selected_kernel() {
    let mut w = BlobWriter::new();
    let lib = w.add_kernel(kernel(0x1, 8));
    let caller = w.add_kernel(kernel(0x2, 8));
    w.add_record(LinkRecord::export(lib, LabelId(1), 0));
    w.add_record(LinkRecord::import(caller, LabelId(1), 0));
    let repo = ComponentRepository::from_bytes(&w.finish().unwrap()).unwrap();

    let limits = Limits::default();
    let linked = KernelLinker::new(&repo, None, &limits)
        .link(&select(&[lib, caller]), &[])
        .unwrap();

    // Already placed: no extra copy.
    assert_eq!(linked.kernels.len(), 2);
    let site = 32;
    assert_eq!(displacement(&linked.binary, site), -((site + JUMP_SIZE) as i32));
}

#[test]
fn transitive_imports_reach_fixed_point() {
    let mut w = BlobWriter::new();
    let a = w.add_kernel(kernel(0xA, 8));
    let b = w.add_kernel(kernel(0xB, 8));
    let c = w.add_kernel(kernel(0xC, 8));
    w.add_record(LinkRecord::import(a, LabelId(1), 0));
    w.add_record(LinkRecord::export(b, LabelId(1), 0));
    w.add_record(LinkRecord::import(b, LabelId(2), 4));
    w.add_record(LinkRecord::export(c, LabelId(2), 0));
    let repo = ComponentRepository::from_bytes(&w.finish().unwrap()).unwrap();

    let limits = Limits::default();
    let linked = KernelLinker::new(&repo, None, &limits)
        .link(&select(&[a, a]), &[])
        .unwrap();

    let ids: Vec<_> = linked.kernels.iter().map(|k| k.id).collect();
    assert_eq!(ids, vec![a, a, b, c]);
    // Both copies of A jump to the single copy of B.
    assert_eq!(displacement(&linked.binary, 0), (64 - 16) as i32);
    assert_eq!(displacement(&linked.binary, 32), (64 - 48) as i32);
    // B jumps to C.
    assert_eq!(displacement(&linked.binary, 64 + 16), (96 - (80 + 16)) as i32);
}

#[test]
fn import_site_must_fit_a_jump() {
    let mut w = BlobWriter::new();
    let a = w.add_kernel(kernel(0xA, 4));
    let b = w.add_kernel(kernel(0xB, 4));
    // 16-byte kernel, import at byte 4: the jump would spill into B.
    w.add_record(LinkRecord::import(a, LabelId(1), 1));
    w.add_record(LinkRecord::export(b, LabelId(1), 0));
    let repo = ComponentRepository::from_bytes(&w.finish().unwrap()).unwrap();

    let limits = Limits::default();
    let err = KernelLinker::new(&repo, None, &limits)
        .link(&select(&[a]), &[])
        .unwrap_err();
    assert!(matches!(err, kdll_common::LinkError::BadImportSite { offset: 4 }));
}

#[test]
fn custom_repository_kernels() {
    let mut main = BlobWriter::new();
    main.add_kernel(kernel(0x1, 4));
    let mut custom = BlobWriter::new();
    custom.add_kernel(kernel(0x7, 4));
    let main = ComponentRepository::from_bytes(&main.finish().unwrap()).unwrap();
    let custom = ComponentRepository::from_bytes(&custom.finish().unwrap()).unwrap();

    let limits = Limits::default();
    let selection = [
        SelectedKernel::new(KernelId(0), RuleGroup::Default),
        SelectedKernel::new(KernelId(0), RuleGroup::Custom),
    ];
    let linked = KernelLinker::new(&main, Some(&custom), &limits)
        .link(&selection, &[])
        .unwrap();
    assert_eq!(linked.binary[0], 0x1);
    assert_eq!(linked.binary[16], 0x7);
    assert!(linked.kernels[1].custom);
}

#[test]
fn inline_chain_depth_is_bounded() {
    let limits = Limits::default();

    let repo = inline_chain(MAX_INLINE_DEPTH + 1);
    let linked = KernelLinker::new(&repo, None, &limits)
        .link(&select(&[KernelId(0)]), &[])
        .unwrap();
    let ids: Vec<_> = linked.kernels.iter().map(|k| k.id.0 as usize).collect();
    assert_eq!(ids, (0..=MAX_INLINE_DEPTH).collect::<Vec<_>>());
    assert_eq!(linked.binary.len(), (MAX_INLINE_DEPTH + 1) * 16);

    let repo = inline_chain(MAX_INLINE_DEPTH + 2);
    let err = KernelLinker::new(&repo, None, &limits)
        .link(&select(&[KernelId(0)]), &[])
        .unwrap_err();
    assert!(matches!(err, LinkError::InlineTooDeep { max } if max == MAX_INLINE_DEPTH));
}
