//! Rule table compiler.
//!
//! Splits rule streams into rule sets, validates their shape and lays them
//! out in one array sorted by parser state. Within a state the order is
//! `NoOverride`, `Custom`, `Default`; declaration order is kept inside each
//! group.

use std::ops::Range;

use kdll_common::{RuleError, RuleGroup};
use tracing::{error, info};

use crate::rule::{Logic, Predicate, Rule, Step};
use crate::state::ParserState;

/// One compiled rule set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSet {
    pub group: RuleGroup,
    pub state: ParserState,
    /// Match rules after the leading parser-state predicate.
    pub matches: Vec<(Predicate, Logic)>,
    pub actions: Vec<Step>,
}

#[derive(Clone, Debug, Default)]
pub struct RuleTable {
    sets: Vec<RuleSet>,
    buckets: Vec<Range<usize>>,
}

impl RuleTable {
    /// Compile the built-in stream and an optional override stream.
    pub fn compile(builtin: &[Rule], custom: Option<&[Rule]>) -> Result<Self, RuleError> {
        let mut sets = parse_sets(builtin).map_err(log_error)?;
        let builtin_sets = sets.len();
        if let Some(custom) = custom {
            sets.extend(parse_sets(custom).map_err(log_error)?);
        }
        // Stable: declaration order survives within a (state, group) run.
        sets.sort_by_key(|s| (s.state.index(), s.group.rank()));

        let mut buckets = vec![0..0; ParserState::COUNT];
        let mut start = 0;
        for (state, bucket) in ParserState::ALL.iter().zip(buckets.iter_mut()) {
            let len = sets[start..]
                .iter()
                .take_while(|s| s.state == *state)
                .count();
            *bucket = start..start + len;
            start += len;
        }

        info!(
            sets = sets.len(),
            builtin = builtin_sets,
            custom = sets.len() - builtin_sets,
            "Compiled rule table"
        );
        Ok(Self { sets, buckets })
    }

    /// Rule sets for `state`, in scan order.
    pub fn bucket(&self, state: ParserState) -> &[RuleSet] {
        match self.buckets.get(state.index()) {
            Some(range) => &self.sets[range.clone()],
            None => &[],
        }
    }

    pub fn sets(&self) -> &[RuleSet] {
        &self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

fn log_error(e: RuleError) -> RuleError {
    error!(error = %e, "Malformed rule table");
    e
}

struct Pending {
    group: RuleGroup,
    matches: Vec<(Predicate, Logic)>,
    actions: Vec<Step>,
}

impl Pending {
    fn finish(self, set: usize) -> Result<RuleSet, RuleError> {
        let mut matches = self.matches.into_iter();
        let state = match matches.next() {
            Some((Predicate::ParserState(state), Logic::None)) => state,
            _ => return Err(RuleError::MissingStatePredicate { set }),
        };
        if self.actions.is_empty() {
            return Err(RuleError::NoActions { set });
        }
        Ok(RuleSet {
            group: self.group,
            state,
            matches: matches.collect(),
            actions: self.actions,
        })
    }
}

/// Split a stream into validated rule sets.
pub fn parse_sets(rules: &[Rule]) -> Result<Vec<RuleSet>, RuleError> {
    let mut sets = Vec::new();
    let mut pending: Option<Pending> = None;

    for (index, rule) in rules.iter().enumerate() {
        match rule {
            Rule::Eof => {
                if let Some(p) = pending.take() {
                    sets.push(p.finish(sets.len())?);
                }
                return Ok(sets);
            }
            Rule::NewEntry(group) => {
                if let Some(p) = pending.take() {
                    sets.push(p.finish(sets.len())?);
                }
                pending = Some(Pending {
                    group: *group,
                    matches: Vec::new(),
                    actions: Vec::new(),
                });
            }
            Rule::Match(predicate, logic) => {
                let p = pending
                    .as_mut()
                    .ok_or(RuleError::OutsideRuleSet { index })?;
                if !p.actions.is_empty() {
                    return Err(RuleError::MatchAfterAction { set: sets.len() });
                }
                p.matches.push((*predicate, *logic));
            }
            Rule::Set(action) => {
                let p = pending
                    .as_mut()
                    .ok_or(RuleError::OutsideRuleSet { index })?;
                p.actions.push(Step::Set(*action));
            }
            Rule::Extended(ext) => {
                let p = pending
                    .as_mut()
                    .ok_or(RuleError::OutsideRuleSet { index })?;
                p.actions.push(Step::Extended(ext.clone()));
            }
        }
    }
    Err(RuleError::MissingEof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Action;
    use kdll_common::KernelId;

    fn set(group: RuleGroup, state: ParserState, kernel: u16) -> Vec<Rule> {
        vec![
            Rule::NewEntry(group),
            Rule::Match(Predicate::ParserState(state), Logic::None),
            Rule::Set(Action::Kernel(KernelId(kernel))),
        ]
    }

    fn stream(sets: &[Vec<Rule>]) -> Vec<Rule> {
        let mut rules: Vec<Rule> = sets.iter().flatten().cloned().collect();
        rules.push(Rule::Eof);
        rules
    }

    fn kernel_of(s: &RuleSet) -> KernelId {
        match s.actions[0] {
            Step::Set(Action::Kernel(k)) => k,
            _ => panic!("not a kernel action"),
        }
    }

    #[test]
    fn buckets_are_sorted_by_state_then_group() {
        let builtin = stream(&[
            set(RuleGroup::Default, ParserState::WriteOutput, 1),
            set(RuleGroup::Default, ParserState::Begin, 2),
            set(RuleGroup::NoOverride, ParserState::Begin, 3),
            set(RuleGroup::Default, ParserState::Begin, 4),
        ]);
        let custom = stream(&[set(RuleGroup::Custom, ParserState::Begin, 5)]);
        let table = RuleTable::compile(&builtin, Some(&custom)).unwrap();

        assert_eq!(table.len(), 5);
        let begin: Vec<_> = table.bucket(ParserState::Begin).iter().map(kernel_of).collect();
        assert_eq!(begin, vec![KernelId(3), KernelId(5), KernelId(2), KernelId(4)]);
        assert_eq!(table.bucket(ParserState::WriteOutput).len(), 1);
        assert!(table.bucket(ParserState::End).is_empty());
    }

    #[test]
    fn rejects_missing_state_predicate() {
        let rules = vec![
            Rule::NewEntry(RuleGroup::Default),
            Rule::Match(Predicate::Quadrant(0), Logic::None),
            Rule::Set(Action::Quadrant(2)),
            Rule::Eof,
        ];
        assert_eq!(
            RuleTable::compile(&rules, None).unwrap_err(),
            RuleError::MissingStatePredicate { set: 0 }
        );
    }

    #[test]
    fn rejects_empty_actions_and_bad_layout() {
        let rules = vec![
            Rule::NewEntry(RuleGroup::Default),
            Rule::Match(Predicate::ParserState(ParserState::Begin), Logic::None),
            Rule::Eof,
        ];
        assert_eq!(parse_sets(&rules), Err(RuleError::NoActions { set: 0 }));

        let rules = vec![Rule::Set(Action::Quadrant(0)), Rule::Eof];
        assert_eq!(parse_sets(&rules), Err(RuleError::OutsideRuleSet { index: 0 }));

        let mut rules = set(RuleGroup::Default, ParserState::Begin, 0);
        rules.push(Rule::Match(Predicate::Quadrant(0), Logic::None));
        rules.push(Rule::Eof);
        assert_eq!(parse_sets(&rules), Err(RuleError::MatchAfterAction { set: 0 }));

        let rules = set(RuleGroup::Default, ParserState::Begin, 0);
        assert_eq!(parse_sets(&rules), Err(RuleError::MissingEof));
    }

    #[test]
    fn empty_stream_compiles() {
        let table = RuleTable::compile(&[Rule::Eof], None).unwrap();
        assert!(table.is_empty());
        assert!(table.bucket(ParserState::Begin).is_empty());
    }
}
