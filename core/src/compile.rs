//! Expression → step program compilation.

use crate::expr::{Matcher, Path, PathStep};
use crate::step::{StepKind, StepProgram, TableRef};
use crate::{Expression, Lookups, RuleError};
use std::borrow::Cow;

/// Result of compiling one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compiled {
    /// The expression never reads the input.
    Fixed(String),
    /// Steps to run on the buffered candidate.
    Program(StepProgram),
}

impl Compiled {
    #[must_use]
    pub fn fixed_value(&self) -> Option<&str> {
        match self {
            Self::Fixed(value) => Some(value),
            Self::Program(_) => None,
        }
    }

    #[must_use]
    pub fn program(&self) -> Option<&StepProgram> {
        match self {
            Self::Fixed(_) => None,
            Self::Program(program) => Some(program),
        }
    }
}

/// Compile an expression.
///
/// Wrappers over a literal are folded into a [`Compiled::Fixed`] value. For a
/// tree walk, the program keeps only what follows the prefix the path index
/// answers (see [`unindexed`]). With `prune_trailing`, trailing steps that can
/// never fail are dropped; requirements only care that a value exists.
///
/// # Errors
///
/// - [`RuleError::UnknownLookup`] when a lookup names a missing table
/// - [`RuleError::InvalidExpression`] when a fold over a literal produces no
///   value, or when `IsNull` wraps a literal
pub fn compile(
    expression: &Expression,
    lookups: &Lookups,
    prune_trailing: bool,
) -> Result<Compiled, RuleError> {
    let (uses_is_null, matcher) = match expression.root() {
        Matcher::IsNull(inner) => (true, inner.as_ref()),
        other => (false, other),
    };

    let mut wrappers = Vec::new();
    let path = peel(matcher, expression, lookups, &mut wrappers)?;
    // Peeling collects outermost first; the program applies innermost first.
    wrappers.reverse();

    let mut kinds = match path {
        Path::Fixed(value) => {
            if uses_is_null {
                return Err(invalid(expression, "IsNull over a fixed value"));
            }
            return fold(value, &wrappers, expression).map(Compiled::Fixed);
        }
        Path::Walk(step) => path_kinds(unindexed(step)),
        Path::Variable { next, .. } => path_kinds(next.as_deref()),
    };
    kinds.extend(wrappers);

    if prune_trailing {
        while kinds.last().is_some_and(|kind| !kind.can_fail()) {
            kinds.pop();
        }
    }

    Ok(Compiled::Program(StepProgram::new(kinds, uses_is_null)))
}

/// The steps of a walk the path index does not cover.
///
/// The index follows leading descents, then stops after one equals or
/// starts-with, or after a word range optionally followed by one equals or
/// starts-with.
pub(crate) fn unindexed(step: &PathStep) -> Option<&PathStep> {
    let mut current = Some(step);
    while let Some(PathStep::Down { next, .. }) = current {
        current = next.as_deref();
    }
    match current? {
        PathStep::Equals { next, .. } | PathStep::StartsWith { next, .. } => next.as_deref(),
        PathStep::WordRange { next, .. } => match next.as_deref() {
            Some(PathStep::Equals { next, .. } | PathStep::StartsWith { next, .. }) => {
                next.as_deref()
            }
            other => other,
        },
        other => Some(other),
    }
}

/// Strip function wrappers down to the path, recording each as a step.
fn peel<'e>(
    matcher: &'e Matcher,
    expression: &Expression,
    lookups: &Lookups,
    wrappers: &mut Vec<StepKind>,
) -> Result<&'e Path, RuleError> {
    let table = |name: &str| {
        lookups
            .get(name)
            .cloned()
            .map(TableRef::new)
            .ok_or_else(|| RuleError::UnknownLookup {
                table: name.to_owned(),
                expression: expression.text().to_owned(),
            })
    };

    let (kind, inner) = match matcher {
        Matcher::Path(path) => return Ok(path),
        Matcher::IsNull(_) => {
            return Err(invalid(expression, "IsNull is only allowed at the top level"))
        }
        Matcher::Concat {
            prefix,
            inner,
            postfix,
        } => (
            StepKind::Concat {
                prefix: prefix.clone(),
                postfix: postfix.clone(),
            },
            inner,
        ),
        Matcher::NormalizeBrand(inner) => (StepKind::NormalizeBrand, inner),
        Matcher::CleanVersion(inner) => (StepKind::CleanVersion, inner),
        Matcher::Lookup {
            table: name,
            inner,
            default,
        } => {
            let table = table(name.as_str())?;
            let default = default
                .clone()
                .or_else(|| table.default_value().map(str::to_owned));
            (StepKind::Lookup { table, default }, inner)
        }
        Matcher::LookupPrefix {
            table: name,
            inner,
            default,
        } => {
            let table = table(name.as_str())?;
            let default = default
                .clone()
                .or_else(|| table.default_value().map(str::to_owned));
            (StepKind::LookupPrefix { table, default }, inner)
        }
        Matcher::IsInLookupPrefix { table: name, inner } => (
            StepKind::IsInLookupPrefix {
                table: table(name.as_str())?,
            },
            inner,
        ),
        Matcher::WordRange { inner, range } => (StepKind::WordRange(*range), inner),
    };
    wrappers.push(kind);
    peel(inner, expression, lookups, wrappers)
}

fn fold(value: &str, wrappers: &[StepKind], expression: &Expression) -> Result<String, RuleError> {
    let mut current = Cow::Borrowed(value);
    for kind in wrappers {
        current = kind.transform(current).ok_or_else(|| {
            invalid(
                expression,
                &format!("{kind} produces no value from the fixed value \"{value}\""),
            )
        })?;
    }
    Ok(current.into_owned())
}

fn path_kinds(mut step: Option<&PathStep>) -> Vec<StepKind> {
    let mut kinds = Vec::new();
    while let Some(current) = step {
        kinds.push(match current {
            PathStep::Down {
                fragment, range, ..
            } => StepKind::Down {
                fragment: *fragment,
                range: *range,
            },
            PathStep::Equals { value, .. } => StepKind::Equals(value.clone()),
            PathStep::NotEquals { value, .. } => StepKind::NotEquals(value.clone()),
            PathStep::StartsWith { value, .. } => StepKind::StartsWith(value.clone()),
            PathStep::EndsWith { value, .. } => StepKind::EndsWith(value.clone()),
            PathStep::Contains { value, .. } => StepKind::Contains(value.clone()),
            PathStep::WordRange { range, .. } => StepKind::WordRange(*range),
        });
        step = current.next();
    }
    kinds
}

fn invalid(expression: &Expression, message: &str) -> RuleError {
    RuleError::InvalidExpression {
        expression: expression.text().to_owned(),
        message: message.to_owned(),
    }
}
