//! Rule actions and the per-classification match state.

use crate::compile::{compile, Compiled};
use crate::{AgentNode, Expression, Lookups, PathIndex, PathKey, RuleError, WalkResult};
use std::borrow::Cow;
use std::fmt;

/// Position of an action in its rule set; also its slot in a [`MatchState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(usize);

impl ActionId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Role of an action within its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Must match for the rule to fire.
    Require,
    /// Produces the rule's output value.
    Extract,
    /// Resolves a node that other actions of the rule start from.
    Variable,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Require => "require",
            Self::Extract => "extract",
            Self::Variable => "variable",
        })
    }
}

/// Result of evaluating one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The expression compiled to a constant.
    Fixed(String),
    NotMatched,
    Matched(String),
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::NotMatched)
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Fixed(value) | Self::Matched(value) => Some(value),
            Self::NotMatched => None,
        }
    }
}

/// One compiled expression of a rule.
///
/// Immutable once the rule set is built. Everything that changes during a
/// classification lives in [`MatchState`].
#[derive(Debug, Clone)]
pub struct RuleAction {
    id: ActionId,
    rule: usize,
    kind: ActionKind,
    expression: Expression,
    compiled: Compiled,
    must_have_matches: bool,
    informs: usize,
    verbose: bool,
}

impl RuleAction {
    /// Compile `expression` for the given role.
    ///
    /// Requirements drop trailing steps that cannot fail. The action is not
    /// reachable until [`register`](Self::register) is called.
    ///
    /// # Errors
    ///
    /// Whatever [`compile`] reports for the expression.
    pub fn new(
        id: ActionId,
        rule: usize,
        kind: ActionKind,
        expression: Expression,
        lookups: &Lookups,
    ) -> Result<Self, RuleError> {
        let compiled = compile(&expression, lookups, kind == ActionKind::Require)?;
        Ok(Self {
            id,
            rule,
            kind,
            expression,
            compiled,
            must_have_matches: false,
            informs: 0,
            verbose: false,
        })
    }

    /// Log every evaluation of this action at `debug`.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Register this action in `index`.
    ///
    /// Fixes the inform count and `must_have_matches`: an action that can be
    /// reached by traversal and is not an `IsNull` check needs a candidate to
    /// succeed. Variable references are reported through `on_variable`.
    pub fn register(&mut self, index: &mut PathIndex, on_variable: &mut dyn FnMut(&str)) -> usize {
        self.informs = index.register(self.id, self.expression.root(), on_variable);
        self.must_have_matches = self.informs > 0 && !self.expression.uses_is_null();
        self.informs
    }

    #[must_use]
    pub fn id(&self) -> ActionId {
        self.id
    }

    /// Index of the owning rule.
    #[must_use]
    pub fn rule(&self) -> usize {
        self.rule
    }

    #[must_use]
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    #[must_use]
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    #[must_use]
    pub fn compiled(&self) -> &Compiled {
        &self.compiled
    }

    #[must_use]
    pub fn fixed_value(&self) -> Option<&str> {
        self.compiled.fixed_value()
    }

    #[must_use]
    pub fn must_have_matches(&self) -> bool {
        self.must_have_matches
    }

    /// Terminal registrations made in the path index.
    #[must_use]
    pub fn informs(&self) -> usize {
        self.informs
    }

    /// Candidates kept per classification: 0 for constants, else 1.
    #[must_use]
    pub fn capacity(&self) -> usize {
        match self.compiled {
            Compiled::Fixed(_) => 0,
            Compiled::Program(_) => 1,
        }
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// `true` when the action needs a candidate and got none.
    #[must_use]
    pub fn cannot_be_valid(&self, state: &MatchState<'_>) -> bool {
        self.must_have_matches && state.candidate(self.id).is_none()
    }

    /// Evaluate against the candidate buffered in `state`.
    ///
    /// Constants never look at the buffer. Pruned actions never run a step.
    /// Evaluation only reads `state` and may be repeated.
    #[must_use]
    pub fn evaluate(&self, state: &MatchState<'_>) -> Outcome {
        let outcome = match &self.compiled {
            Compiled::Fixed(value) => Outcome::Fixed(value.clone()),
            Compiled::Program(program) => match state.candidate(self.id) {
                None if self.must_have_matches => Outcome::NotMatched,
                None if program.uses_is_null() => Outcome::Matched("true".to_owned()),
                None => Outcome::NotMatched,
                Some(candidate) => {
                    let result = program.run(candidate.node, candidate.value.clone());
                    match (result, program.uses_is_null()) {
                        (Some(result), false) => Outcome::Matched(result.value.into_owned()),
                        (None, true) => Outcome::Matched("true".to_owned()),
                        _ => Outcome::NotMatched,
                    }
                }
            },
        };

        if self.verbose {
            tracing::debug!(
                action = %self.id,
                kind = %self.kind,
                expression = %self.expression,
                candidate = ?state.candidate(self.id).map(|c| c.path.as_str()),
                ?outcome,
                "evaluated rule action"
            );
        }
        outcome
    }

    /// Run the program and keep the node it ended on. Used for variables,
    /// whose listeners continue from that node.
    #[must_use]
    pub fn resolve<'t>(&self, state: &MatchState<'t>) -> Option<WalkResult<'t>> {
        let Compiled::Program(program) = &self.compiled else {
            return None;
        };
        if program.uses_is_null() {
            return None;
        }
        let candidate = state.candidate(self.id)?;
        program.run(candidate.node, candidate.value.clone())
    }
}

/// A candidate delivered to an action during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'t> {
    pub node: &'t AgentNode,
    pub path: PathKey,
    pub value: Cow<'t, str>,
}

/// Per-classification buffers, owned by the caller.
///
/// One single-slot buffer per action plus, per rule, the number of must-have
/// actions that received a candidate. Reuse across inputs with
/// [`reset`](Self::reset).
#[derive(Debug, Clone, Default)]
pub struct MatchState<'t> {
    slots: Vec<Option<Candidate<'t>>>,
    received: Vec<usize>,
    informs: usize,
    accepted: usize,
}

impl<'t> MatchState<'t> {
    /// Buffers for `actions` actions spread over `rules` rules.
    #[must_use]
    pub fn new(actions: usize, rules: usize) -> Self {
        Self {
            slots: vec![None; actions],
            received: vec![0; rules],
            informs: 0,
            accepted: 0,
        }
    }

    /// Clear every buffer and counter.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.received.iter_mut().for_each(|n| *n = 0);
        self.informs = 0;
        self.accepted = 0;
    }

    /// Offer a candidate to `action`. The first candidate is kept; later ones
    /// and candidates for constant actions are dropped. Returns whether the
    /// candidate was kept.
    pub fn inform(
        &mut self,
        action: &RuleAction,
        path: &PathKey,
        node: &'t AgentNode,
        value: &Cow<'t, str>,
    ) -> bool {
        self.informs += 1;
        if action.capacity() == 0 {
            return false;
        }
        let Some(slot) = self.slots.get_mut(action.id.index()) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(Candidate {
            node,
            path: path.clone(),
            value: value.clone(),
        });
        self.accepted += 1;
        if action.must_have_matches {
            if let Some(received) = self.received.get_mut(action.rule) {
                *received += 1;
            }
        }
        true
    }

    #[must_use]
    pub fn candidate(&self, action: ActionId) -> Option<&Candidate<'t>> {
        self.slots.get(action.index())?.as_ref()
    }

    /// Must-have actions of `rule` that received a candidate.
    #[must_use]
    pub fn received(&self, rule: usize) -> usize {
        self.received.get(rule).copied().unwrap_or(0)
    }

    /// Inform calls made, kept or not.
    #[must_use]
    pub fn informs(&self) -> usize {
        self.informs
    }

    /// Candidates kept.
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.accepted
    }
}
