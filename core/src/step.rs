//! Compiled step programs.
//!
//! A program is the part of an expression the path index cannot answer on its
//! own: whatever follows the indexed prefix, plus the function wrappers. It
//! runs against the single candidate an action buffered during traversal.

use crate::normalize::{clean_version, normalize_brand};
use crate::{AgentNode, Fragment, LookupTable, NumberRange, WordRange};
use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Shared handle to a lookup table, compared by name.
#[derive(Clone)]
pub struct TableRef(Arc<LookupTable>);

impl TableRef {
    pub(crate) fn new(table: Arc<LookupTable>) -> Self {
        Self(table)
    }
}

impl Deref for TableRef {
    type Target = LookupTable;

    fn deref(&self) -> &LookupTable {
        &self.0
    }
}

impl PartialEq for TableRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name() == other.0.name()
    }
}

impl Eq for TableRef {}

impl fmt::Debug for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableRef({})", self.0.name())
    }
}

/// What one step does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// Descend to the first child of `fragment` within `range` for which the
    /// rest of the program succeeds.
    Down {
        fragment: Fragment,
        range: NumberRange,
    },
    Equals(String),
    NotEquals(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    WordRange(WordRange),
    Concat {
        prefix: Option<String>,
        postfix: Option<String>,
    },
    /// Exact lookup. `default` already folds in the table default.
    Lookup {
        table: TableRef,
        default: Option<String>,
    },
    LookupPrefix {
        table: TableRef,
        default: Option<String>,
    },
    /// Passes the value through unchanged when some table key prefixes it.
    IsInLookupPrefix {
        table: TableRef,
    },
    NormalizeBrand,
    CleanVersion,
}

impl StepKind {
    /// `false` if this step produces a value for every input.
    #[must_use]
    pub fn can_fail(&self) -> bool {
        match self {
            Self::Concat { .. } | Self::NormalizeBrand | Self::CleanVersion => false,
            Self::Lookup { default, .. } | Self::LookupPrefix { default, .. } => default.is_none(),
            Self::Down { .. }
            | Self::Equals(_)
            | Self::NotEquals(_)
            | Self::StartsWith(_)
            | Self::EndsWith(_)
            | Self::Contains(_)
            | Self::WordRange(_)
            | Self::IsInLookupPrefix { .. } => true,
        }
    }

    /// Apply a value-only step. `Down` needs a node and always yields `None` here.
    pub(crate) fn transform<'v>(&self, value: Cow<'v, str>) -> Option<Cow<'v, str>> {
        match self {
            Self::Down { .. } => None,
            Self::Equals(expected) => (value.as_ref() == expected.as_str()).then_some(value),
            Self::NotEquals(rejected) => (value.as_ref() != rejected.as_str()).then_some(value),
            Self::StartsWith(prefix) => value.starts_with(prefix.as_str()).then_some(value),
            Self::EndsWith(suffix) => value.ends_with(suffix.as_str()).then_some(value),
            Self::Contains(needle) => value.contains(needle.as_str()).then_some(value),
            Self::WordRange(range) => range.extract(&value).map(Cow::Owned),
            Self::Concat { prefix, postfix } => Some(Cow::Owned(format!(
                "{}{}{}",
                prefix.as_deref().unwrap_or_default(),
                value,
                postfix.as_deref().unwrap_or_default()
            ))),
            Self::Lookup { table, default } => table
                .get(&value)
                .or(default.as_deref())
                .map(|v| Cow::Owned(v.to_owned())),
            Self::LookupPrefix { table, default } => table
                .get_prefix(&value)
                .or(default.as_deref())
                .map(|v| Cow::Owned(v.to_owned())),
            Self::IsInLookupPrefix { table } => table.contains_prefix(&value).then_some(value),
            Self::NormalizeBrand => Some(Cow::Owned(normalize_brand(&value))),
            Self::CleanVersion => Some(Cow::Owned(clean_version(&value))),
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down { fragment, range } => write!(f, ".({range}){fragment}"),
            Self::Equals(v) => write!(f, "={v:?}"),
            Self::NotEquals(v) => write!(f, "!={v:?}"),
            Self::StartsWith(v) => write!(f, "{{{v:?}"),
            Self::EndsWith(v) => write!(f, "}}{v:?}"),
            Self::Contains(v) => write!(f, "~{v:?}"),
            Self::WordRange(range) => write!(f, "[{range}]"),
            Self::Concat { prefix, postfix } => write!(
                f,
                "Concat[{:?};{:?}]",
                prefix.as_deref().unwrap_or_default(),
                postfix.as_deref().unwrap_or_default()
            ),
            Self::Lookup { table, .. } => write!(f, "LookUp[{}]", table.name()),
            Self::LookupPrefix { table, .. } => write!(f, "LookUpPrefix[{}]", table.name()),
            Self::IsInLookupPrefix { table } => write!(f, "IsInLookUpPrefix[{}]", table.name()),
            Self::NormalizeBrand => f.write_str("NormalizeBrand"),
            Self::CleanVersion => f.write_str("CleanVersion"),
        }
    }
}

/// One step, linked to the rest of the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    kind: StepKind,
    next: Option<Box<Step>>,
}

/// Where a successful run ended: the node reached and the value carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkResult<'t> {
    pub node: &'t AgentNode,
    pub value: Cow<'t, str>,
}

impl Step {
    #[must_use]
    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    #[must_use]
    pub fn next(&self) -> Option<&Step> {
        self.next.as_deref()
    }

    fn walk<'t>(&self, node: &'t AgentNode, value: Cow<'t, str>) -> Option<WalkResult<'t>> {
        #[cfg(test)]
        counter::bump();

        if let StepKind::Down { fragment, range } = &self.kind {
            return node
                .children()
                .iter()
                .filter(|c| c.fragment() == *fragment && range.iter().contains(&c.index()))
                .find_map(|child| self.proceed(child, Cow::Borrowed(child.value())));
        }
        let value = self.kind.transform(value)?;
        self.proceed(node, value)
    }

    fn proceed<'t>(&self, node: &'t AgentNode, value: Cow<'t, str>) -> Option<WalkResult<'t>> {
        match &self.next {
            Some(next) => next.walk(node, value),
            None => Some(WalkResult { node, value }),
        }
    }
}

/// A compiled, tree-dependent expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepProgram {
    first: Option<Box<Step>>,
    uses_is_null: bool,
}

impl StepProgram {
    /// Link `kinds` in order into a program.
    pub(crate) fn new(kinds: Vec<StepKind>, uses_is_null: bool) -> Self {
        let first = kinds
            .into_iter()
            .rev()
            .fold(None, |next, kind| Some(Box::new(Step { kind, next })));
        Self {
            first,
            uses_is_null,
        }
    }

    #[must_use]
    pub fn first(&self) -> Option<&Step> {
        self.first.as_deref()
    }

    /// `true` if the expression was wrapped in `IsNull[...]`.
    #[must_use]
    pub fn uses_is_null(&self) -> bool {
        self.uses_is_null
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepKind> {
        std::iter::successors(self.first(), |s| s.next()).map(Step::kind)
    }

    /// Run the program from a candidate. An empty program accepts the
    /// candidate as is.
    pub fn run<'t>(&self, node: &'t AgentNode, value: Cow<'t, str>) -> Option<WalkResult<'t>> {
        match &self.first {
            Some(step) => step.walk(node, value),
            None => Some(WalkResult { node, value }),
        }
    }
}

impl fmt::Display for StepProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.uses_is_null {
            f.write_str("IsNull ")?;
        }
        if self.is_empty() {
            return f.write_str("<candidate>");
        }
        for (i, kind) in self.steps().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            write!(f, "{kind}")?;
        }
        Ok(())
    }
}
