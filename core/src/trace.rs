//! Evaluation trace types for debugging rule behavior.
//!
//! Trace types mirror the runtime types ([`RuleSet`](crate::RuleSet),
//! [`Rule`](crate::Rule), [`RuleAction`](crate::RuleAction)) but capture
//! what happened during one classification instead of configuration. Use
//! [`RuleSet::classify_with_trace`](crate::RuleSet::classify_with_trace) to
//! see why a field did or did not get its value.
//!
//! # Three Levels of Trace
//!
//! - [`ActionTrace`]: which candidate an action buffered and what came out
//! - [`RuleTrace`]: whether a rule passed the input gate and whether it fired
//! - [`ClassifyTrace`]: all rules of one classification plus traversal counters
//!
//! # Example
//!
//! ```
//! use agentwalk::{AgentNode, Fragment, RuleDefinition, RuleSet};
//!
//! let rules = RuleSet::builder()
//!     .rule(RuleDefinition::new("name", "AgentName", 1, "agent.(0)product.(0)name"))
//!     .build()
//!     .unwrap();
//! let tree = AgentNode::agent("Foo/1").with_child(
//!     AgentNode::new(Fragment::Product, "Foo/1").with_child(AgentNode::new(Fragment::Name, "Foo")),
//! );
//!
//! let (fields, trace) = rules.classify_with_trace(&tree);
//! assert_eq!(fields, rules.classify(&tree));
//! for rule in &trace.rules {
//!     println!("{}: gate={} fired={}", rule.rule, rule.passed_gate, rule.emission.is_some());
//! }
//! ```

use crate::{ActionId, ActionKind, Emission, MatchState, Outcome, RuleAction};
use std::fmt;

/// Trace of one action's evaluation.
pub struct ActionTrace {
    pub id: ActionId,
    pub kind: ActionKind,
    /// Source text of the expression.
    pub expression: String,
    /// Path key of the buffered candidate, if any.
    pub path: Option<String>,
    /// Value of the buffered candidate, if any.
    pub value: Option<String>,
    /// Same result as [`RuleAction::evaluate`].
    pub outcome: Outcome,
}

impl ActionTrace {
    pub(crate) fn capture(action: &RuleAction, state: &MatchState<'_>) -> Self {
        let candidate = state.candidate(action.id());
        Self {
            id: action.id(),
            kind: action.kind(),
            expression: action.expression().text().to_owned(),
            path: candidate.map(|c| c.path.to_string()),
            value: candidate.map(|c| c.value.to_string()),
            outcome: action.evaluate(state),
        }
    }
}

impl fmt::Debug for ActionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTrace")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("expression", &self.expression)
            .field("path", &self.path)
            .field("value", &self.value)
            .field("outcome", &self.outcome)
            .finish()
    }
}

/// Trace of one rule.
///
/// Rules that do not pass the gate carry no action traces.
pub struct RuleTrace {
    pub rule: String,
    /// Whether enough must-have actions received a candidate.
    pub passed_gate: bool,
    pub received: usize,
    pub required_inputs: usize,
    /// Every action in id order, all evaluated.
    pub actions: Vec<ActionTrace>,
    pub emission: Option<Emission>,
}

impl fmt::Debug for RuleTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleTrace")
            .field("rule", &self.rule)
            .field("passed_gate", &self.passed_gate)
            .field("received", &self.received)
            .field("required_inputs", &self.required_inputs)
            .field("actions", &self.actions)
            .field("emission", &self.emission)
            .finish()
    }
}

/// Trace of a full classification.
///
/// # INV: fields == `classify()` result
///
/// The classification returned next to this trace always equals what
/// [`RuleSet::classify`](crate::RuleSet::classify) returns for the same tree.
pub struct ClassifyTrace {
    /// Inform calls made during traversal, kept or not.
    pub informs: usize,
    /// Candidates kept in action buffers.
    pub accepted: usize,
    pub rules: Vec<RuleTrace>,
}

impl ClassifyTrace {
    /// Rules that produced an emission.
    pub fn fired(&self) -> impl Iterator<Item = &RuleTrace> {
        self.rules.iter().filter(|r| r.emission.is_some())
    }
}

impl fmt::Debug for ClassifyTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifyTrace")
            .field("informs", &self.informs)
            .field("accepted", &self.accepted)
            .field("rules", &self.rules)
            .finish()
    }
}
