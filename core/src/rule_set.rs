//! `RuleSet`: compiled rules plus the path index they share.

use crate::trace::{ClassifyTrace, RuleTrace};
use crate::{
    ActionId, AgentNode, Emission, LookupTable, Lookups, MatchState, PathIndex, Rule, RuleAction,
    RuleDefinition, RuleError,
};
use std::collections::BTreeMap;

/// The winning value of one output field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub value: String,
    pub confidence: i64,
    /// Name of the rule that set it.
    pub rule: String,
}

/// Output of one classification: field name → winning value.
///
/// A field keeps the value of the highest-confidence rule that fired; on a
/// tie the rule declared first wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    fields: BTreeMap<String, FieldValue>,
}

impl Classification {
    /// Offer an emission. Returns whether it became the field's value.
    pub fn offer(&mut self, emission: Emission) -> bool {
        let Emission {
            field,
            value,
            confidence,
            rule,
        } = emission;
        if self
            .fields
            .get(&field)
            .is_some_and(|current| current.confidence >= confidence)
        {
            return false;
        }
        self.fields.insert(
            field,
            FieldValue {
                value,
                confidence,
                rule,
            },
        );
        true
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// The value of `field`, if any rule set it.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|f| f.value.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// An immutable, shareable rule set.
///
/// Built once; classifications only read it, so one instance can serve any
/// number of threads, each with its own [`MatchState`].
///
/// # Example
///
/// ```
/// use agentwalk::{AgentNode, Fragment, RuleDefinition, RuleSet};
///
/// let rules = RuleSet::builder()
///     .rule(
///         RuleDefinition::new("firefox", "AgentName", 100, r#""Firefox""#)
///             .require(r#"agent.(0-3)product.(0)name="Firefox""#),
///     )
///     .rule(RuleDefinition::new(
///         "firefox-version",
///         "AgentVersion",
///         100,
///         "agent.(1)product.(0)version",
///     ))
///     .build()
///     .unwrap();
///
/// let tree = AgentNode::agent("Mozilla/5.0 Firefox/53.0")
///     .with_child(AgentNode::new(Fragment::Product, "Mozilla/5.0"))
///     .with_child(
///         AgentNode::new(Fragment::Product, "Firefox/53.0")
///             .with_child(AgentNode::new(Fragment::Name, "Firefox"))
///             .with_child(AgentNode::new(Fragment::Version, "53.0")),
///     );
///
/// let fields = rules.classify(&tree);
/// assert_eq!(fields.value("AgentName"), Some("Firefox"));
/// ```
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
    index: PathIndex,
    /// Action id → owning rule.
    owners: Vec<usize>,
}

/// Builder for [`RuleSet`].
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    lookups: Lookups,
    verbose: bool,
    definitions: Vec<RuleDefinition>,
}

impl RuleSetBuilder {
    /// Replace the available lookup tables.
    #[must_use]
    pub fn lookups(mut self, lookups: Lookups) -> Self {
        self.lookups = lookups;
        self
    }

    /// Add one lookup table.
    #[must_use]
    pub fn lookup(mut self, table: LookupTable) -> Self {
        self.lookups.insert(table);
        self
    }

    /// Log every action evaluation at `debug`.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn rule(mut self, definition: RuleDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    #[must_use]
    pub fn rules(mut self, definitions: impl IntoIterator<Item = RuleDefinition>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// Compile every rule and build the shared path index.
    ///
    /// # Errors
    ///
    /// The first rule that fails to compile, as [`RuleError::Rule`]. Nothing
    /// is activated when any rule fails.
    pub fn build(self) -> Result<RuleSet, RuleError> {
        let mut index = PathIndex::new();
        let mut rules = Vec::with_capacity(self.definitions.len());
        let mut owners = Vec::new();

        for (position, definition) in self.definitions.iter().enumerate() {
            let first = ActionId::new(owners.len());
            let rule = Rule::build(
                position,
                definition,
                first,
                &self.lookups,
                self.verbose,
                &mut index,
            )?;
            owners.extend(std::iter::repeat(position).take(definition.action_count()));
            rules.push(rule);
        }

        tracing::debug!(
            rules = rules.len(),
            actions = owners.len(),
            lookups = self.lookups.len(),
            index_nodes = index.node_count(),
            registrations = index.registrations(),
            "built rule set"
        );

        Ok(RuleSet {
            rules,
            index,
            owners,
        })
    }
}

impl RuleSet {
    #[must_use]
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    /// Fresh buffers sized for this rule set.
    #[must_use]
    pub fn new_state<'t>(&self) -> MatchState<'t> {
        MatchState::new(self.owners.len(), self.rules.len())
    }

    /// Classify one tree.
    #[must_use]
    pub fn classify(&self, tree: &AgentNode) -> Classification {
        let mut state = self.new_state();
        self.classify_with(tree, &mut state)
    }

    /// Classify one tree reusing `state`'s buffers. `state` is reset first.
    pub fn classify_with<'t>(&self, tree: &'t AgentNode, state: &mut MatchState<'t>) -> Classification {
        state.reset();
        self.walk(tree, state);

        let mut fields = Classification::default();
        for rule in &self.rules {
            if state.received(rule.index()) < rule.required_inputs() {
                tracing::trace!(rule = rule.name(), "skipped, missing inputs");
                continue;
            }
            if let Some(emission) = rule.evaluate(state) {
                tracing::trace!(
                    rule = rule.name(),
                    field = %emission.field,
                    value = %emission.value,
                    "rule fired"
                );
                fields.offer(emission);
            }
        }
        fields
    }

    /// [`classify`](Self::classify) plus a trace of every rule.
    #[must_use]
    pub fn classify_with_trace(&self, tree: &AgentNode) -> (Classification, ClassifyTrace) {
        let mut state = self.new_state();
        self.walk(tree, &mut state);
        let informs = state.informs();
        let accepted = state.accepted();

        let mut fields = Classification::default();
        let mut traces = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let received = state.received(rule.index());
            if received < rule.required_inputs() {
                traces.push(RuleTrace {
                    rule: rule.name().to_owned(),
                    passed_gate: false,
                    received,
                    required_inputs: rule.required_inputs(),
                    actions: Vec::new(),
                    emission: None,
                });
                continue;
            }
            let trace = rule.evaluate_with_trace(&mut state);
            if let Some(emission) = &trace.emission {
                fields.offer(emission.clone());
            }
            traces.push(trace);
        }

        (
            fields,
            ClassifyTrace {
                informs,
                accepted,
                rules: traces,
            },
        )
    }

    fn walk<'t>(&self, tree: &'t AgentNode, state: &mut MatchState<'t>) {
        self.index.walk(tree, |id, path, node, value| {
            if let Some(action) = self.action(id) {
                state.inform(action, path, node, value);
            }
        });
    }

    /// The action with id `id`.
    #[must_use]
    pub fn action(&self, id: ActionId) -> Option<&RuleAction> {
        let rule = self.owners.get(id.index())?;
        self.rules.get(*rule)?.action(id)
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn index(&self) -> &PathIndex {
        &self.index
    }

    #[must_use]
    pub fn action_count(&self) -> usize {
        self.owners.len()
    }
}
