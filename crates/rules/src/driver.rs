//! Search driver: runs matcher and updater from `Begin` to `End`.

use kdll_common::{
    FilterEntry, Limits, OutputPackingConfig, ProcampTable, SearchError,
};
use kdll_csc::{CoefficientMapping, CscPlanner};
use tracing::{debug, warn};

use crate::matcher;
use crate::provider::PatchDataProvider;
use crate::search_state::{SearchFlags, SearchState};
use crate::table::RuleTable;
use crate::updater;

/// Everything a search reads; borrowed from the engine for one request.
pub struct Searcher<'a> {
    pub table: &'a RuleTable,
    pub limits: &'a Limits,
    pub packing: &'a OutputPackingConfig,
    pub procamps: &'a ProcampTable,
    pub mapping: &'a dyn CoefficientMapping,
    pub provider: &'a dyn PatchDataProvider,
}

impl<'a> Searcher<'a> {
    pub fn start_search(
        &self,
        chain: &[FilterEntry],
        flags: SearchFlags,
    ) -> Result<SearchState, SearchError> {
        SearchState::new(chain, flags, self.limits, self.packing)
    }

    /// Plan CSC, then apply rule sets until `End`. On failure the state is
    /// left where the search stopped.
    pub fn search(&self, state: &mut SearchState) -> Result<(), SearchError> {
        let planner = CscPlanner::new(
            self.procamps,
            self.mapping,
            self.limits.max_csc_matrices,
            self.limits.max_procamps,
        );
        let csc = planner.plan(&mut state.chain)?;
        state.reset(csc);

        while !state.is_complete() {
            if state.steps >= self.limits.max_search_steps {
                warn!(steps = state.steps, state = %state.state, "Search step limit reached");
                return Err(SearchError::StepLimit {
                    steps: state.steps,
                });
            }
            let Some(set) = matcher::find(self.table, state) else {
                debug!(state = %state.state, layer = state.layer, "No rule matches");
                return Err(SearchError::NoMatch {
                    state: state.state.to_string(),
                });
            };
            updater::apply(set, state, self.limits, self.provider)?;
            state.steps += 1;
        }

        debug!(
            kernels = state.kernels.len(),
            patches = state.patches.len(),
            matrices = state.csc.matrices.len(),
            steps = state.steps,
            "Search complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TableBuilder;
    use crate::catalog::KernelCatalog;
    use crate::provider::CscPatchData;
    use crate::rule::{Action, LayerStep, Predicate};
    use crate::state::ParserState;
    use kdll_common::{
        ColorSpace, FormatPattern, KernelId, LayerRole, Pattern, PixelFormat, RuleGroup,
    };
    use kdll_csc::ShiftMapping;

    fn catalog() -> KernelCatalog {
        KernelCatalog::new(["Setup", "Sample", "Save_NV12", "Save_RGB", "EOT"])
    }

    fn table(catalog: &KernelCatalog) -> RuleTable {
        let mut b = TableBuilder::new(catalog);
        b.entry(RuleGroup::Default, ParserState::Begin)
            .kernel("Setup")
            .goto(ParserState::SampleLayer0);
        b.entry(RuleGroup::Default, ParserState::SampleLayer0)
            .when(Predicate::LayerId(Pattern::Is(LayerRole::RenderTarget)))
            .goto(ParserState::WriteOutput);
        b.entry(RuleGroup::Default, ParserState::SampleLayer0)
            .kernel("Sample")
            .then(Action::NextLayer(LayerStep::Next));
        b.entry(RuleGroup::Default, ParserState::WriteOutput)
            .when(Predicate::TargetFormat(FormatPattern::Exact(PixelFormat::Nv12)))
            .kernels(["Save_NV12", "EOT"])
            .goto(ParserState::End);
        b.entry(RuleGroup::Default, ParserState::WriteOutput)
            .when(Predicate::TargetFormat(FormatPattern::Rgb))
            .kernels(["Save_RGB", "EOT"])
            .goto(ParserState::End);
        RuleTable::compile(&b.finish().unwrap(), None).unwrap()
    }

    fn run(chain: &[FilterEntry], limits: &Limits) -> Result<SearchState, SearchError> {
        let catalog = catalog();
        let table = table(&catalog);
        let packing = OutputPackingConfig::default();
        let procamps = ProcampTable::new(1);
        let mapping = ShiftMapping::default();
        let searcher = Searcher {
            table: &table,
            limits,
            packing: &packing,
            procamps: &procamps,
            mapping: &mapping,
            provider: &CscPatchData,
        };
        let mut state = searcher.start_search(chain, SearchFlags::default())?;
        searcher.search(&mut state)?;
        Ok(state)
    }

    fn main_video() -> FilterEntry {
        FilterEntry::layer(LayerRole::MainVideo, PixelFormat::Nv12, ColorSpace::Bt601)
    }

    #[test]
    fn walks_layers_to_end() {
        let chain = [
            main_video(),
            main_video(),
            FilterEntry::render_target(PixelFormat::Nv12, ColorSpace::Bt601),
        ];
        let state = run(&chain, &Limits::default()).unwrap();
        let ids: Vec<_> = state.kernels.iter().map(|k| k.id).collect();
        assert_eq!(
            ids,
            vec![KernelId(0), KernelId(1), KernelId(1), KernelId(2), KernelId(4)]
        );
        assert!(state.is_complete());
        assert!(state.csc.is_empty());
    }

    #[test]
    fn unsupported_target_is_no_match() {
        let chain = [
            main_video(),
            FilterEntry::render_target(PixelFormat::Yv12, ColorSpace::Bt601),
        ];
        assert_eq!(
            run(&chain, &Limits::default()).unwrap_err(),
            SearchError::NoMatch {
                state: "WriteOutput".to_string()
            }
        );
    }

    #[test]
    fn step_guard() {
        let chain = [
            main_video(),
            main_video(),
            FilterEntry::render_target(PixelFormat::Nv12, ColorSpace::Bt601),
        ];
        let limits = Limits {
            max_search_steps: 3,
            ..Limits::default()
        };
        assert_eq!(
            run(&chain, &limits).unwrap_err(),
            SearchError::StepLimit { steps: 3 }
        );
    }

    #[test]
    fn deterministic() {
        let chain = [
            main_video(),
            FilterEntry::render_target(PixelFormat::Argb8, ColorSpace::Srgb),
        ];
        let a = run(&chain, &Limits::default()).unwrap();
        let b = run(&chain, &Limits::default()).unwrap();
        assert_eq!(a.kernels, b.kernels);
        assert_eq!(a.csc, b.csc);
        assert_eq!(a.kernels.last().map(|k| k.id), Some(KernelId(4)));
    }
}
