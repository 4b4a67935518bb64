//! Per-generation kernel library description.
//!
//! A generation names the kernels of its component repository (in blob
//! order) and writes the built-in rule table against those names.

use kdll_common::{
    EngineConfig, LayerRole, Operand, Pattern, RuleError, RuleGroup,
};
use kdll_csc::{CoefficientMapping, ShiftMapping};
use kdll_rules::{Action, KernelCatalog, LayerStep, ParserState, Predicate, Rule, TableBuilder};

/// One hardware generation's kernel library.
///
/// Implementations must be `Send + Sync` so an engine can be shared across
/// threads behind a lock.
pub trait Generation: Send + Sync {
    /// Short identifier used in logs (e.g. `"gen10"`).
    fn name(&self) -> &'static str;

    /// Kernel names in repository order: name `i` is blob component `i`.
    fn kernel_names(&self) -> Vec<String>;

    /// Catalog built from [`kernel_names`](Self::kernel_names).
    fn catalog(&self) -> KernelCatalog {
        KernelCatalog::new(self.kernel_names())
    }

    /// The built-in rule stream, terminated by `Eof`.
    fn rules(&self, catalog: &KernelCatalog) -> Result<Vec<Rule>, RuleError>;

    /// Adjust the caller's configuration to what this generation supports.
    fn configure(&self, _config: &mut EngineConfig) {}

    /// Float-to-fixed mapping for CSC coefficients.
    fn coefficient_mapping(&self) -> Box<dyn CoefficientMapping> {
        Box::new(ShiftMapping::default())
    }
}

// ── rule sets shared by every generation ──

pub(crate) fn render_target() -> Predicate {
    Predicate::LayerId(Pattern::Is(LayerRole::RenderTarget))
}

pub(crate) fn begin(b: &mut TableBuilder<'_>) {
    b.entry(RuleGroup::NoOverride, ParserState::Begin)
        .goto(ParserState::SetRenderMethod);
}

/// Load src0 from the layer under the cursor, then step to the next layer.
pub(crate) fn layer0_params(b: &mut TableBuilder<'_>) {
    b.entry(RuleGroup::NoOverride, ParserState::SetParamsLayer0)
        .then(Action::Src0Format(Operand::Source))
        .then(Action::Src0Coeff(Operand::Source))
        .then(Action::Src0Sampling(Operand::Source))
        .then(Action::Src0Rotation(Operand::Source))
        .then(Action::Src0ColorFill(Operand::Source))
        .then(Action::Src0LumaKey(Operand::Source))
        .then(Action::Src0Procamp(Operand::Source))
        .then(Action::Src0Processing(Operand::Source))
        .then(Action::NextLayer(LayerStep::Next))
        .goto(ParserState::SetupLayer1);
}

pub(crate) fn target_params(b: &mut TableBuilder<'_>) {
    // Render target only: colorfill straight to the output.
    b.entry(RuleGroup::NoOverride, ParserState::SetParamsTarget)
        .when(render_target())
        .when(Predicate::LayerNumber(0))
        .then(Action::Src0ColorFill(Operand::Source))
        .then(Action::Src0Format(Operand::Source))
        .goto(ParserState::WriteOutput);
    b.entry(RuleGroup::NoOverride, ParserState::SetParamsTarget)
        .when(Predicate::CscBeforeMix(true))
        .then(Action::TargetColorSpace(Operand::Source))
        .goto(ParserState::SetupCsc1);
    b.entry(RuleGroup::NoOverride, ParserState::SetParamsTarget)
        .then(Action::Src0Format(Operand::Source))
        .then(Action::Src0Coeff(Operand::Source))
        .then(Action::TargetColorSpace(Operand::Source))
        .goto(ParserState::SetupCsc0);
}
