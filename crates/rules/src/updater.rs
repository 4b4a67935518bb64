//! State updater: applies the actions of a matched rule set.

use kdll_common::{
    LayerRole, Limits, PatchBlock, PatchKind, PatchRecord, RuleGroup, SearchError, SelectedKernel,
};
use tracing::trace;

use crate::provider::PatchDataProvider;
use crate::rule::{Action, ExtendedAction, LayerStep, Step};
use crate::search_state::SearchState;
use crate::table::RuleSet;

/// Apply every action of `set` in order. Any capacity violation aborts the
/// request.
pub fn apply(
    set: &RuleSet,
    state: &mut SearchState,
    limits: &Limits,
    provider: &dyn PatchDataProvider,
) -> Result<(), SearchError> {
    for step in &set.actions {
        match step {
            Step::Set(action) => apply_action(*action, set.group, state, limits, provider)?,
            Step::Extended(ExtendedAction::Patch(blocks)) => add_blocks(blocks, state, limits)?,
        }
    }
    Ok(())
}

fn apply_action(
    action: Action,
    group: RuleGroup,
    s: &mut SearchState,
    limits: &Limits,
    provider: &dyn PatchDataProvider,
) -> Result<(), SearchError> {
    let cur = *s.current();
    match action {
        Action::TargetColorSpace(op) => s.target_color_space = op.resolve(Some(cur.color_space)),
        Action::ParserState(next) => {
            trace!(from = %s.state, to = %next, "Parser state");
            s.state = next;
        }

        Action::Src0Format(op) => {
            s.src0.format = op.resolve(Some(cur.format));
            s.src0.chroma_siting = op.resolve(Some(cur.format)).and(cur.chroma_siting);
        }
        Action::Src0Sampling(op) => s.src0.sampling = op.resolve(cur.sampling),
        Action::Src0Rotation(op) => s.src0.rotation = op.resolve(Some(cur.rotation)),
        Action::Src0ColorFill(op) => {
            s.src0.color_fill = op.resolve(Some(cur.color_fill)).unwrap_or(false)
        }
        Action::Src0LumaKey(op) => s.src0.luma_key = op.resolve(Some(cur.luma_key)).unwrap_or(false),
        Action::Src0Procamp(op) => s.src0.procamp = op.resolve(cur.procamp),
        Action::Src0Coeff(op) => s.src0.coeff = op.resolve(cur.matrix),
        Action::Src0Processing(op) => s.src0.processing = op.resolve(cur.processing),

        Action::Src1Format(op) => {
            s.src1.format = op.resolve(Some(cur.format));
            s.src1.chroma_siting = op.resolve(Some(cur.format)).and(cur.chroma_siting);
        }
        Action::Src1Sampling(op) => s.src1.sampling = op.resolve(cur.sampling),
        Action::Src1Rotation(op) => s.src1.rotation = op.resolve(Some(cur.rotation)),
        Action::Src1LumaKey(op) => s.src1.luma_key = op.resolve(Some(cur.luma_key)).unwrap_or(false),
        Action::Src1SamplerLumaKey(op) => {
            s.src1.sampler_luma_key = op.resolve(Some(cur.sampler_luma_key)).unwrap_or(false)
        }
        Action::Src1Procamp(op) => s.src1.procamp = op.resolve(cur.procamp),
        Action::Src1Coeff(op) => s.src1.coeff = op.resolve(cur.matrix),
        Action::Src1Processing(op) => s.src1.processing = op.resolve(cur.processing),

        Action::Kernel(id) => {
            if s.kernels.len() >= limits.max_kernels {
                return Err(SearchError::TooManyKernels {
                    max: limits.max_kernels,
                });
            }
            trace!(kernel = %id, group = ?group, "Kernel selected");
            s.kernels.push(SelectedKernel::new(id, group));
        }
        Action::NextLayer(step) => move_cursor(s, step)?,
        Action::PatchData(kind) => add_data(kind, s, limits, provider)?,
        Action::Quadrant(q) => s.quadrant = q,
        Action::CscBeforeMix(b) => s.csc_before_mix = b,
    }
    Ok(())
}

fn move_cursor(s: &mut SearchState, step: LayerStep) -> Result<(), SearchError> {
    let len = s.chain.len();
    let index: isize = match step {
        LayerStep::Next => s.layer as isize + 1,
        LayerStep::Previous => s.layer as isize - 1,
        LayerStep::ToRenderTarget => len as isize - 1,
        LayerStep::ToMainVideo => s
            .chain
            .iter()
            .position(|e| e.layer == LayerRole::MainVideo)
            .ok_or(SearchError::NoMainVideo)? as isize,
    };
    if index < 0 || index as usize >= len {
        return Err(SearchError::LayerOutOfRange { index, len });
    }
    s.layer = index as usize;
    Ok(())
}

/// Patch record of the most recently selected kernel, created on demand.
fn last_record<'s>(
    s: &'s mut SearchState,
    limits: &Limits,
) -> Result<&'s mut PatchRecord, SearchError> {
    let kernel = s.kernels.last_mut().ok_or(SearchError::NoPatchTarget)?;
    let index = match kernel.patch {
        Some(i) => i,
        None => {
            if s.patches.len() >= limits.max_patches {
                return Err(SearchError::TooManyPatches {
                    max: limits.max_patches,
                });
            }
            s.patches.push(PatchRecord::default());
            let i = s.patches.len() - 1;
            kernel.patch = Some(i);
            i
        }
    };
    s.patches
        .get_mut(index)
        .ok_or(SearchError::NoPatchTarget)
}

fn add_data(
    kind: PatchKind,
    s: &mut SearchState,
    limits: &Limits,
    provider: &dyn PatchDataProvider,
) -> Result<(), SearchError> {
    let data = provider
        .patch_data(kind, s)
        .ok_or(SearchError::MissingPatchData { kind })?;
    let record = last_record(s, limits)?;
    let size = record.data.len() + data.len();
    if size > limits.max_patch_data {
        return Err(SearchError::PatchDataTooLarge {
            size,
            max: limits.max_patch_data,
        });
    }
    record.data.extend_from_slice(&data);
    trace!(kind = ?kind, bytes = data.len(), "Patch data attached");
    Ok(())
}

fn add_blocks(
    blocks: &[PatchBlock],
    s: &mut SearchState,
    limits: &Limits,
) -> Result<(), SearchError> {
    let record = last_record(s, limits)?;
    if record.blocks.len() + blocks.len() > limits.max_patch_blocks {
        return Err(SearchError::TooManyPatchBlocks {
            max: limits.max_patch_blocks,
        });
    }
    for block in blocks {
        if block.src_end() > record.data.len() {
            return Err(SearchError::PatchSourceOutOfRange {
                start: block.src as usize,
                end: block.src_end(),
                len: record.data.len(),
            });
        }
    }
    record.blocks.extend_from_slice(blocks);
    Ok(())
}
