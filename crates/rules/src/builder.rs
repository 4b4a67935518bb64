//! Builder for rule streams.
//!
//! ```ignore
//! let mut b = TableBuilder::new(&catalog);
//! b.entry(RuleGroup::Default, ParserState::Begin)
//!     .when(Predicate::RenderMethod(RenderMethod::MediaObject))
//!     .kernel("VP_Setup")
//!     .goto(ParserState::SetupLayer0);
//! let rules = b.finish()?;
//! ```
//!
//! Kernel names are resolved against a [`KernelCatalog`]; the first unknown
//! name is reported by [`TableBuilder::finish`].

use kdll_common::{PatchBlock, RuleError, RuleGroup};

use crate::catalog::KernelCatalog;
use crate::rule::{Action, ExtendedAction, Logic, Predicate, Rule};
use crate::state::ParserState;

pub struct TableBuilder<'a> {
    catalog: &'a KernelCatalog,
    rules: Vec<Rule>,
    error: Option<RuleError>,
}

impl<'a> TableBuilder<'a> {
    pub fn new(catalog: &'a KernelCatalog) -> Self {
        Self {
            catalog,
            rules: Vec::new(),
            error: None,
        }
    }

    /// Start a rule set matching in `state`.
    pub fn entry(&mut self, group: RuleGroup, state: ParserState) -> &mut Self {
        self.rules.push(Rule::NewEntry(group));
        self.rules
            .push(Rule::Match(Predicate::ParserState(state), Logic::None));
        self
    }

    pub fn when(&mut self, predicate: Predicate) -> &mut Self {
        self.rules.push(Rule::Match(predicate, Logic::None));
        self
    }

    pub fn when_not(&mut self, predicate: Predicate) -> &mut Self {
        self.rules.push(Rule::Match(predicate, Logic::Not));
        self
    }

    /// OR group: succeeds if any of `predicates` holds.
    pub fn any_of(&mut self, predicates: impl IntoIterator<Item = Predicate>) -> &mut Self {
        let start = self.rules.len();
        for p in predicates {
            self.rules.push(Rule::Match(p, Logic::Or));
        }
        // The last member closes the group.
        if self.rules.len() > start {
            if let Some(Rule::Match(_, logic)) = self.rules.last_mut() {
                *logic = Logic::None;
            }
        }
        self
    }

    pub fn then(&mut self, action: Action) -> &mut Self {
        self.rules.push(Rule::Set(action));
        self
    }

    pub fn kernel(&mut self, name: &str) -> &mut Self {
        match self.catalog.id(name) {
            Some(id) => self.rules.push(Rule::Set(Action::Kernel(id))),
            None => {
                if self.error.is_none() {
                    self.error = Some(RuleError::UnknownKernel(name.to_string()));
                }
            }
        }
        self
    }

    pub fn kernels<S: AsRef<str>>(&mut self, names: impl IntoIterator<Item = S>) -> &mut Self {
        for name in names {
            self.kernel(name.as_ref());
        }
        self
    }

    pub fn goto(&mut self, state: ParserState) -> &mut Self {
        self.then(Action::ParserState(state))
    }

    pub fn patch(&mut self, blocks: impl IntoIterator<Item = PatchBlock>) -> &mut Self {
        self.rules.push(Rule::Extended(ExtendedAction::Patch(
            blocks.into_iter().collect(),
        )));
        self
    }

    /// Append an already-formed rule.
    pub fn push(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Terminate the stream with `Eof`.
    pub fn finish(mut self) -> Result<Vec<Rule>, RuleError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.rules.push(Rule::Eof);
        Ok(self.rules)
    }
}
