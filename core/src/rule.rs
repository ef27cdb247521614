//! Rules: requirements, variables and one extraction deciding one field.

use crate::trace::{ActionTrace, RuleTrace};
use crate::{
    ActionId, ActionKind, Expression, Lookups, MatchState, PathIndex, PathKey, RuleAction,
    RuleError,
};

/// Source form of a rule, before compilation.
///
/// ```
/// use agentwalk::RuleDefinition;
///
/// let rule = RuleDefinition::new("firefox", "AgentName", 100, r#""Firefox""#)
///     .variable("Product", "agent.(0-3)product")
///     .require(r#"@Product.(0)name="Firefox""#);
/// assert_eq!(rule.require.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct RuleDefinition {
    pub name: String,
    /// Named expressions other expressions of the rule can start from with `@Name`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub variables: Vec<VariableDefinition>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub require: Vec<String>,
    pub extract: ExtractDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct VariableDefinition {
    pub name: String,
    pub expression: String,
}

/// The field a rule sets, how strongly, and from which expression.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct ExtractDefinition {
    pub field: String,
    pub confidence: i64,
    pub expression: String,
}

impl RuleDefinition {
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        confidence: i64,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            require: Vec::new(),
            extract: ExtractDefinition {
                field: field.into(),
                confidence,
                expression: expression.into(),
            },
        }
    }

    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.variables.push(VariableDefinition {
            name: name.into(),
            expression: expression.into(),
        });
        self
    }

    #[must_use]
    pub fn require(mut self, expression: impl Into<String>) -> Self {
        self.require.push(expression.into());
        self
    }

    /// Number of actions this rule compiles to.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.variables.len() + self.require.len() + 1
    }
}

/// A field value produced by a rule that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub field: String,
    pub value: String,
    pub confidence: i64,
    pub rule: String,
}

/// A compiled rule.
///
/// Owns its actions. Action ids are contiguous from the first variable,
/// through the requirements, to the extraction.
#[derive(Debug, Clone)]
pub struct Rule {
    index: usize,
    name: String,
    field: String,
    confidence: i64,
    variables: Vec<(String, RuleAction)>,
    requires: Vec<RuleAction>,
    extract: RuleAction,
    /// Per variable, the actions that start from it.
    listeners: Vec<Vec<ActionId>>,
    required_inputs: usize,
}

impl Rule {
    /// Compile `definition` and register its actions in `index`.
    ///
    /// # Errors
    ///
    /// [`RuleError::Rule`] wrapping the first failure: a bad expression, a
    /// reference to a variable that is not declared (variables may only use
    /// earlier variables), a duplicate variable name, or a variable that
    /// compiles to a fixed value.
    pub(crate) fn build(
        index: usize,
        definition: &RuleDefinition,
        first: ActionId,
        lookups: &Lookups,
        verbose: bool,
        path_index: &mut PathIndex,
    ) -> Result<Self, RuleError> {
        Self::try_build(index, definition, first, lookups, verbose, path_index).map_err(|source| {
            RuleError::Rule {
                rule: definition.name.clone(),
                source: Box::new(source),
            }
        })
    }

    fn try_build(
        index: usize,
        definition: &RuleDefinition,
        first: ActionId,
        lookups: &Lookups,
        verbose: bool,
        path_index: &mut PathIndex,
    ) -> Result<Self, RuleError> {
        let mut next_id = first.index();
        let mut action = |kind: ActionKind, text: &str| -> Result<RuleAction, RuleError> {
            let id = ActionId::new(next_id);
            next_id += 1;
            let expression = Expression::parse(text)?;
            Ok(RuleAction::new(id, index, kind, expression, lookups)?.with_verbose(verbose))
        };

        let mut variables: Vec<(String, RuleAction)> = Vec::with_capacity(definition.variables.len());
        for variable in &definition.variables {
            if variables.iter().any(|(name, _)| *name == variable.name) {
                return Err(RuleError::InvalidExpression {
                    expression: variable.expression.clone(),
                    message: format!("variable @{} is declared twice", variable.name),
                });
            }
            let compiled = action(ActionKind::Variable, &variable.expression)?;
            if compiled.fixed_value().is_some() {
                return Err(RuleError::InvalidExpression {
                    expression: variable.expression.clone(),
                    message: format!("variable @{} has a fixed value", variable.name),
                });
            }
            variables.push((variable.name.clone(), compiled));
        }
        let requires = definition
            .require
            .iter()
            .map(|text| action(ActionKind::Require, text))
            .collect::<Result<Vec<_>, _>>()?;
        let extract = action(ActionKind::Extract, &definition.extract.expression)?;

        let mut rule = Self {
            index,
            name: definition.name.clone(),
            field: definition.extract.field.clone(),
            confidence: definition.extract.confidence,
            listeners: vec![Vec::new(); variables.len()],
            variables,
            requires,
            extract,
            required_inputs: 0,
        };
        rule.register(path_index)?;
        Ok(rule)
    }

    fn register(&mut self, path_index: &mut PathIndex) -> Result<(), RuleError> {
        let names: Vec<String> = self.variables.iter().map(|(n, _)| n.clone()).collect();
        let mut position = 0;
        let mut listeners = vec![Vec::new(); names.len()];

        for action in self.actions_mut() {
            let mut referenced = None;
            action.register(path_index, &mut |name| referenced = Some(name.to_owned()));

            if let Some(variable) = referenced {
                // A variable may only start from one declared before it.
                let visible = match action.kind() {
                    ActionKind::Variable => &names[..position],
                    ActionKind::Require | ActionKind::Extract => &names[..],
                };
                let Some(target) = visible.iter().position(|n| *n == variable) else {
                    return Err(RuleError::UnknownVariable {
                        variable,
                        expression: action.expression().text().to_owned(),
                    });
                };
                listeners[target].push(action.id());
            }
            if action.kind() == ActionKind::Variable {
                position += 1;
            }
        }

        self.listeners = listeners;
        self.required_inputs = self.actions().filter(|a| a.must_have_matches()).count();
        Ok(())
    }

    /// Evaluate the rule on the candidates in `state`.
    ///
    /// Variables are resolved first, in declaration order, and their results
    /// delivered to the actions that start from them under `@Name`. The rule
    /// fires only if every requirement and the extraction succeed.
    pub fn evaluate(&self, state: &mut MatchState<'_>) -> Option<Emission> {
        self.deliver_variables(state);

        if !self.requires.iter().all(|r| r.evaluate(state).is_success()) {
            return None;
        }
        let outcome = self.extract.evaluate(state);
        outcome.value().map(|value| self.emission(value))
    }

    /// [`evaluate`](Self::evaluate), recording every action's candidate and
    /// outcome. No action is skipped.
    pub fn evaluate_with_trace(&self, state: &mut MatchState<'_>) -> RuleTrace {
        self.deliver_variables(state);

        let actions: Vec<ActionTrace> = self
            .actions()
            .map(|action| ActionTrace::capture(action, state))
            .collect();
        let fired = actions
            .iter()
            .filter(|a| a.kind != ActionKind::Variable)
            .all(|a| a.outcome.is_success());
        let emission = if fired {
            actions
                .last()
                .and_then(|extract| extract.outcome.value())
                .map(|value| self.emission(value))
        } else {
            None
        };

        RuleTrace {
            rule: self.name.clone(),
            passed_gate: true,
            received: state.received(self.index),
            required_inputs: self.required_inputs,
            actions,
            emission,
        }
    }

    fn deliver_variables(&self, state: &mut MatchState<'_>) {
        for ((name, variable), listeners) in self.variables.iter().zip(&self.listeners) {
            let Some(result) = variable.resolve(state) else {
                continue;
            };
            let path = PathKey::variable(name);
            for listener in listeners.iter().filter_map(|&id| self.action(id)) {
                state.inform(listener, &path, result.node, &result.value);
            }
        }
    }

    fn emission(&self, value: &str) -> Emission {
        Emission {
            field: self.field.clone(),
            value: value.to_owned(),
            confidence: self.confidence,
            rule: self.name.clone(),
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn confidence(&self) -> i64 {
        self.confidence
    }

    /// Must-have actions that need a candidate before the rule is worth
    /// evaluating.
    #[must_use]
    pub fn required_inputs(&self) -> usize {
        self.required_inputs
    }

    #[must_use]
    pub fn extract(&self) -> &RuleAction {
        &self.extract
    }

    /// Every action, in id order.
    pub fn actions(&self) -> impl Iterator<Item = &RuleAction> {
        self.variables
            .iter()
            .map(|(_, a)| a)
            .chain(&self.requires)
            .chain(std::iter::once(&self.extract))
    }

    fn actions_mut(&mut self) -> impl Iterator<Item = &mut RuleAction> {
        self.variables
            .iter_mut()
            .map(|(_, a)| a)
            .chain(&mut self.requires)
            .chain(std::iter::once(&mut self.extract))
    }

    /// The action with id `id`, if this rule owns it.
    #[must_use]
    pub fn action(&self, id: ActionId) -> Option<&RuleAction> {
        let first = self.actions().next()?.id().index();
        let offset = id.index().checked_sub(first)?;
        let variables = self.variables.len();
        let requires = self.requires.len();
        if offset < variables {
            self.variables.get(offset).map(|(_, a)| a)
        } else if offset < variables + requires {
            self.requires.get(offset - variables)
        } else if offset == variables + requires {
            Some(&self.extract)
        } else {
            None
        }
    }
}
