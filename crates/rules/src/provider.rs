//! Patch-data providers for `PatchData` actions.

use kdll_common::PatchKind;

use crate::search_state::SearchState;

/// Supplies the bytes fetched by a `PatchData` action.
pub trait PatchDataProvider: Send + Sync {
    /// `None` when nothing is available for `kind` in this state.
    fn patch_data(&self, kind: PatchKind, state: &SearchState) -> Option<Vec<u8>>;
}

/// CSC coefficients of the matrix currently assigned to src0 / src1.
#[derive(Copy, Clone, Debug, Default)]
pub struct CscPatchData;

impl PatchDataProvider for CscPatchData {
    fn patch_data(&self, kind: PatchKind, state: &SearchState) -> Option<Vec<u8>> {
        let coeff = match kind {
            PatchKind::CscCoeffSrc0 => state.src0.coeff,
            PatchKind::CscCoeffSrc1 => state.src1.coeff,
        }?;
        state.csc.coefficient_bytes(coeff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search_state::SearchFlags;
    use kdll_common::{
        CoeffId, ColorSpace, FilterEntry, LayerRole, Limits, OutputPackingConfig, PixelFormat,
        ProcampTable,
    };
    use kdll_csc::{CscPlanner, ShiftMapping};

    #[test]
    fn serves_assigned_matrix() {
        let mut chain = vec![
            FilterEntry::layer(LayerRole::MainVideo, PixelFormat::Nv12, ColorSpace::Bt709),
            FilterEntry::render_target(PixelFormat::Argb8, ColorSpace::Srgb)
                .forcing_target_color_space(),
        ];
        let procamps = ProcampTable::new(1);
        let mapping = ShiftMapping::default();
        let csc = CscPlanner::new(&procamps, &mapping, 6, 1)
            .plan(&mut chain)
            .unwrap();
        let mut state = SearchState::new(
            &chain,
            SearchFlags::default(),
            &Limits::default(),
            &OutputPackingConfig::default(),
        )
        .unwrap();
        state.reset(csc);

        assert_eq!(CscPatchData.patch_data(PatchKind::CscCoeffSrc0, &state), None);
        state.src0.coeff = Some(CoeffId::PRIMARY);
        let bytes = CscPatchData
            .patch_data(PatchKind::CscCoeffSrc0, &state)
            .unwrap();
        assert_eq!(bytes.len(), 24);
        assert_eq!(CscPatchData.patch_data(PatchKind::CscCoeffSrc1, &state), None);
    }
}
