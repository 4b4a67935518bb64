//! CSC planning: working colorspace selection, matrix deduplication and
//! coefficient slot assignment.
//!
//! The planner runs once per search. It writes the chosen coefficient slot
//! into each filter entry's `matrix` field and returns the [`CscParams`]
//! block whose coefficients are patched into (or uploaded for) the kernels.

use byteorder::{ByteOrder, LittleEndian};
use kdll_common::{
    CoeffId, ColorSpace, CscError, FilterEntry, LayerRole, ProcampTable,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::fixed::CoefficientMapping;
use crate::matrix::Affine;
use crate::procamp::conversion_with_procamp;
use crate::tables::conversion;

/// One deduplicated conversion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CscMatrix {
    pub coeff: CoeffId,
    pub src: ColorSpace,
    pub dst: ColorSpace,
    pub procamp: Option<u8>,
    /// Procamp version the coefficients were computed from.
    pub procamp_version: u32,
    pub coefficients: [i16; 12],
}

impl CscMatrix {
    fn key(&self) -> (ColorSpace, ColorSpace, Option<u8>) {
        (self.src, self.dst, self.procamp)
    }
}

/// Result of CSC planning for one chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CscParams {
    /// Colorspace in which layers are blended.
    pub working: ColorSpace,
    /// Matrices in slot order.
    pub matrices: Vec<CscMatrix>,
}

impl CscParams {
    pub fn matrix(&self, coeff: CoeffId) -> Option<&CscMatrix> {
        self.matrices.iter().find(|m| m.coeff == coeff)
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// The 12 coefficients of `coeff` as little-endian i16 (24 bytes).
    pub fn coefficient_bytes(&self, coeff: CoeffId) -> Option<Vec<u8>> {
        let m = self.matrix(coeff)?;
        let mut buf = vec![0u8; 24];
        LittleEndian::write_i16_into(&m.coefficients, &mut buf);
        Some(buf)
    }

    /// Recompute every procamp-bearing matrix whose recorded version is
    /// stale. Returns whether any coefficient changed.
    pub fn refresh(&mut self, procamps: &ProcampTable, mapping: &dyn CoefficientMapping) -> bool {
        let mut changed = false;
        for m in self.matrices.iter_mut() {
            let Some(id) = m.procamp else { continue };
            let Some(current) = procamps.get(id) else {
                continue;
            };
            if current.version == m.procamp_version {
                continue;
            }
            let affine = match procamps.active(id) {
                Some(p) => conversion_with_procamp(m.src, m.dst, p),
                None => conversion(m.src, m.dst),
            };
            let coefficients = mapping.map(&affine);
            m.procamp_version = current.version;
            if coefficients != m.coefficients {
                m.coefficients = coefficients;
                changed = true;
            }
        }
        debug!(changed, matrices = self.matrices.len(), "CSC coefficients refreshed");
        changed
    }
}

pub struct CscPlanner<'a> {
    pub procamps: &'a ProcampTable,
    pub mapping: &'a dyn CoefficientMapping,
    pub max_matrices: usize,
    pub max_procamps: usize,
}

impl<'a> CscPlanner<'a> {
    pub fn new(
        procamps: &'a ProcampTable,
        mapping: &'a dyn CoefficientMapping,
        max_matrices: usize,
        max_procamps: usize,
    ) -> Self {
        Self {
            procamps,
            mapping,
            max_matrices,
            max_procamps,
        }
    }

    /// Plan the conversions for `chain` (last entry is the render target).
    pub fn plan(&self, chain: &mut [FilterEntry]) -> Result<CscParams, CscError> {
        let Some((rt, layers)) = chain.split_last_mut() else {
            return Ok(CscParams {
                working: ColorSpace::Bt709,
                matrices: Vec::new(),
            });
        };

        self.normalize_procamps(layers)?;
        let working = select_working(layers, rt);

        // Conversions needed, in chain order: (entry index, key).
        let mut wants: Vec<(usize, (ColorSpace, ColorSpace, Option<u8>))> = Vec::new();
        for (i, l) in layers.iter().enumerate() {
            if l.color_space != working || l.procamp.is_some() {
                wants.push((i, (l.color_space, working, l.procamp)));
            }
        }
        let rt_index = layers.len();
        if rt.color_space != working {
            wants.push((rt_index, (working, rt.color_space, None)));
        }

        // Main video (or else the render target) owns the primary slot.
        let primary = layers
            .iter()
            .position(|l| l.layer == LayerRole::MainVideo)
            .filter(|i| wants.iter().any(|(w, _)| w == i))
            .or_else(|| wants.iter().any(|(w, _)| *w == rt_index).then_some(rt_index));

        let mut matrices: Vec<CscMatrix> = Vec::new();
        let mut assigned: Vec<(usize, CoeffId)> = Vec::new();
        if let Some(owner) = primary {
            if let Some((_, key)) = wants.iter().find(|(w, _)| *w == owner) {
                let m = self.build_matrix(CoeffId::PRIMARY, *key)?;
                matrices.push(m);
                assigned.push((owner, CoeffId::PRIMARY));
            }
        }
        let mut next_slot = 1usize;
        for (i, key) in &wants {
            if Some(*i) == primary {
                continue;
            }
            let coeff = match matrices.iter().find(|m| m.key() == *key) {
                Some(m) => m.coeff,
                None => {
                    if next_slot >= self.max_matrices {
                        return Err(CscError::TooManyMatrices {
                            max: self.max_matrices,
                        });
                    }
                    let coeff = CoeffId(next_slot as u8);
                    next_slot += 1;
                    matrices.push(self.build_matrix(coeff, *key)?);
                    coeff
                }
            };
            assigned.push((*i, coeff));
        }

        for l in layers.iter_mut() {
            l.matrix = None;
        }
        rt.matrix = None;
        for (i, coeff) in assigned {
            if i == rt_index {
                rt.matrix = Some(coeff);
            } else {
                layers[i].matrix = Some(coeff);
            }
        }
        matrices.sort_by_key(|m| m.coeff);

        debug!(
            working = ?working,
            matrices = matrices.len(),
            "CSC plan computed"
        );
        Ok(CscParams { working, matrices })
    }

    fn normalize_procamps(&self, layers: &mut [FilterEntry]) -> Result<(), CscError> {
        let mut active: Vec<u8> = Vec::new();
        for l in layers.iter_mut() {
            let Some(id) = l.procamp else { continue };
            if self.procamps.active(id).is_none() {
                l.procamp = None;
                continue;
            }
            if !active.contains(&id) {
                active.push(id);
            }
        }
        if active.len() > self.max_procamps {
            return Err(CscError::TooManyProcamps {
                max: self.max_procamps,
            });
        }
        Ok(())
    }

    fn build_matrix(
        &self,
        coeff: CoeffId,
        (src, dst, procamp): (ColorSpace, ColorSpace, Option<u8>),
    ) -> Result<CscMatrix, CscError> {
        if coeff.index() >= self.max_matrices {
            return Err(CscError::TooManyMatrices {
                max: self.max_matrices,
            });
        }
        let (affine, version): (Affine, u32) = match procamp.and_then(|id| self.procamps.active(id)) {
            Some(p) => (conversion_with_procamp(src, dst, p), p.version),
            None => (conversion(src, dst), 0),
        };
        trace!(%coeff, ?src, ?dst, ?procamp, "CSC matrix");
        Ok(CscMatrix {
            coeff,
            src,
            dst,
            procamp,
            procamp_version: version,
            coefficients: self.mapping.map(&affine),
        })
    }
}

/// Working colorspace: the render target's when forced, else the candidate
/// needing the fewest conversions, ties to the main video's colorspace,
/// then to the first one seen.
pub fn select_working(layers: &[FilterEntry], rt: &FilterEntry) -> ColorSpace {
    if rt.force_target_color_space {
        return rt.color_space;
    }
    let mut candidates: Vec<ColorSpace> = Vec::new();
    for cs in layers.iter().map(|l| l.color_space).chain(Some(rt.color_space)) {
        if !candidates.contains(&cs) {
            candidates.push(cs);
        }
    }
    let cost = |cand: ColorSpace| -> usize {
        layers.iter().filter(|l| l.color_space != cand).count() + usize::from(rt.color_space != cand)
    };
    let main = layers
        .iter()
        .find(|l| l.layer == LayerRole::MainVideo)
        .map(|l| l.color_space);

    let mut best = candidates[0];
    let mut best_cost = cost(best);
    for &cand in &candidates[1..] {
        let c = cost(cand);
        if c < best_cost || (c == best_cost && Some(cand) == main && Some(best) != main) {
            best = cand;
            best_cost = c;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::ShiftMapping;
    use kdll_common::{PixelFormat, Procamp};

    fn main_video(cs: ColorSpace) -> FilterEntry {
        FilterEntry::layer(LayerRole::MainVideo, PixelFormat::Nv12, cs)
    }

    fn sub(cs: ColorSpace) -> FilterEntry {
        FilterEntry::layer(LayerRole::SubPicture1, PixelFormat::Argb8, cs)
    }

    fn planner<'a>(procamps: &'a ProcampTable, mapping: &'a ShiftMapping) -> CscPlanner<'a> {
        CscPlanner::new(procamps, mapping, 6, 1)
    }

    #[test]
    fn shared_colorspace_needs_no_matrix() {
        let procamps = ProcampTable::new(1);
        let mapping = ShiftMapping::default();
        let mut chain = [
            main_video(ColorSpace::Bt601),
            FilterEntry::render_target(PixelFormat::Nv12, ColorSpace::Bt601),
        ];
        let params = planner(&procamps, &mapping).plan(&mut chain).unwrap();
        assert!(params.is_empty());
        assert_eq!(params.working, ColorSpace::Bt601);
        assert!(chain.iter().all(|e| e.matrix.is_none()));
    }

    #[test]
    fn main_video_takes_primary_slot() {
        let procamps = ProcampTable::new(1);
        let mapping = ShiftMapping::default();
        let mut chain = [
            sub(ColorSpace::Srgb),
            sub(ColorSpace::Srgb),
            main_video(ColorSpace::Bt709),
            FilterEntry::render_target(PixelFormat::Argb8, ColorSpace::Srgb),
        ];
        let params = planner(&procamps, &mapping).plan(&mut chain).unwrap();
        assert_eq!(params.working, ColorSpace::Srgb);
        assert_eq!(params.matrices.len(), 1);
        assert_eq!(chain[2].matrix, Some(CoeffId::PRIMARY));
        assert_eq!(chain[0].matrix, None);
        assert_eq!(chain[3].matrix, None);
    }

    #[test]
    fn tie_goes_to_main_video() {
        let procamps = ProcampTable::new(1);
        let mapping = ShiftMapping::default();
        let mut chain = [
            sub(ColorSpace::Srgb),
            main_video(ColorSpace::Bt709),
            FilterEntry::render_target(PixelFormat::Nv12, ColorSpace::Bt601),
        ];
        let params = planner(&procamps, &mapping).plan(&mut chain).unwrap();
        assert_eq!(params.working, ColorSpace::Bt709);
        // main video needs no conversion, so the render target owns slot 0
        assert_eq!(chain[1].matrix, None);
        assert_eq!(chain[2].matrix, Some(CoeffId::PRIMARY));
        assert_eq!(chain[0].matrix, Some(CoeffId(1)));
    }

    #[test]
    fn forced_target_colorspace() {
        let procamps = ProcampTable::new(1);
        let mapping = ShiftMapping::default();
        let mut chain = [
            main_video(ColorSpace::Bt709),
            sub(ColorSpace::Bt709),
            FilterEntry::render_target(PixelFormat::Argb8, ColorSpace::Srgb)
                .forcing_target_color_space(),
        ];
        let params = planner(&procamps, &mapping).plan(&mut chain).unwrap();
        assert_eq!(params.working, ColorSpace::Srgb);
        assert_eq!(chain[0].matrix, Some(CoeffId::PRIMARY));
        // identical conversion is shared
        assert_eq!(chain[1].matrix, Some(CoeffId::PRIMARY));
        assert_eq!(params.matrices.len(), 1);
    }

    #[test]
    fn duplicate_conversions_share_a_slot() {
        let procamps = ProcampTable::new(1);
        let mapping = ShiftMapping::default();
        let mut chain = [
            sub(ColorSpace::Bt601),
            sub(ColorSpace::Bt601),
            sub(ColorSpace::Srgb),
            sub(ColorSpace::Srgb),
            sub(ColorSpace::Srgb),
            FilterEntry::render_target(PixelFormat::Argb8, ColorSpace::Srgb),
        ];
        let params = planner(&procamps, &mapping).plan(&mut chain).unwrap();
        assert_eq!(params.matrices.len(), 1);
        assert_eq!(chain[0].matrix, chain[1].matrix);
    }

    #[test]
    fn too_many_matrices() {
        let procamps = ProcampTable::new(1);
        let mapping = ShiftMapping::default();
        let planner = CscPlanner::new(&procamps, &mapping, 2, 1);
        let mut chain = [
            sub(ColorSpace::Bt601),
            sub(ColorSpace::Bt709),
            sub(ColorSpace::Bt2020),
            FilterEntry::render_target(PixelFormat::Argb8, ColorSpace::Srgb),
        ];
        assert_eq!(
            planner.plan(&mut chain),
            Err(CscError::TooManyMatrices { max: 2 })
        );
    }

    #[test]
    fn procamp_forces_matrix_and_refreshes() {
        let mut procamps = ProcampTable::new(1);
        procamps.set(0, Procamp::new(10.0, 1.0, 0.0, 1.0)).unwrap();
        let mapping = ShiftMapping::default();
        let mut chain = [
            main_video(ColorSpace::Bt601).with_procamp(0),
            FilterEntry::render_target(PixelFormat::Nv12, ColorSpace::Bt601),
        ];
        let mut params = planner(&procamps, &mapping).plan(&mut chain).unwrap();
        assert_eq!(params.matrices.len(), 1);
        assert_eq!(chain[0].matrix, Some(CoeffId::PRIMARY));
        // brightness +10 in Q4
        assert_eq!(params.matrices[0].coefficients[3], 160);
        assert_eq!(params.coefficient_bytes(CoeffId::PRIMARY).unwrap().len(), 24);

        assert!(!params.refresh(&procamps, &mapping));
        procamps.set(0, Procamp::new(20.0, 1.0, 0.0, 1.0)).unwrap();
        assert!(params.refresh(&procamps, &mapping));
        assert_eq!(params.matrices[0].coefficients[3], 320);
    }

    #[test]
    fn inactive_procamp_is_dropped() {
        let procamps = ProcampTable::new(1);
        let mapping = ShiftMapping::default();
        let mut chain = [
            main_video(ColorSpace::Bt601).with_procamp(0),
            FilterEntry::render_target(PixelFormat::Nv12, ColorSpace::Bt601),
        ];
        let params = planner(&procamps, &mapping).plan(&mut chain).unwrap();
        assert!(params.is_empty());
        assert_eq!(chain[0].procamp, None);
    }

    #[test]
    fn second_procamp_is_a_capacity_error() {
        let mut procamps = ProcampTable::new(2);
        procamps.set(0, Procamp::new(10.0, 1.0, 0.0, 1.0)).unwrap();
        procamps.set(1, Procamp::new(5.0, 1.0, 0.0, 1.0)).unwrap();
        let mapping = ShiftMapping::default();
        let mut chain = [
            main_video(ColorSpace::Bt601).with_procamp(0),
            sub(ColorSpace::Bt601).with_procamp(1),
            FilterEntry::render_target(PixelFormat::Nv12, ColorSpace::Bt601),
        ];
        assert_eq!(
            planner(&procamps, &mapping).plan(&mut chain),
            Err(CscError::TooManyProcamps { max: 1 })
        );
    }
}
