//! Rule expression syntax tree.
//!
//! Closed enums over every expression shape. The compiler and the path index
//! both match on these exhaustively, so adding a variant is a compile error
//! until every consumer handles it.

use crate::{Fragment, NumberRange, WordRange};
use std::fmt;

/// A parsed rule expression together with its source text.
///
/// Two expressions parsed from the same text are structurally equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression {
    text: String,
    root: Matcher,
}

impl Expression {
    pub(crate) fn new(text: impl Into<String>, root: Matcher) -> Self {
        Self {
            text: text.into(),
            root,
        }
    }

    /// The source text this expression was parsed from.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn root(&self) -> &Matcher {
        &self.root
    }

    /// `true` if the expression is wrapped in `IsNull[...]`.
    #[must_use]
    pub fn uses_is_null(&self) -> bool {
        matches!(self.root, Matcher::IsNull(_))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Value-producing layer of an expression: a path, or a function over one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Matcher {
    Path(Path),
    /// Succeeds only when the inner matcher yields nothing. Top level only.
    IsNull(Box<Matcher>),
    Concat {
        prefix: Option<String>,
        inner: Box<Matcher>,
        postfix: Option<String>,
    },
    NormalizeBrand(Box<Matcher>),
    CleanVersion(Box<Matcher>),
    Lookup {
        table: String,
        inner: Box<Matcher>,
        default: Option<String>,
    },
    LookupPrefix {
        table: String,
        inner: Box<Matcher>,
        default: Option<String>,
    },
    IsInLookupPrefix {
        table: String,
        inner: Box<Matcher>,
    },
    /// Words of the inner result.
    WordRange {
        inner: Box<Matcher>,
        range: WordRange,
    },
}

/// Where a value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Path {
    /// A literal; never touches the input.
    Fixed(String),
    /// A walk from the tree root. The first step always descends to `agent`.
    Walk(PathStep),
    /// A walk from the node a rule variable resolved to.
    Variable {
        name: String,
        next: Option<Box<PathStep>>,
    },
}

/// One segment of a path, linked to the rest of the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    Down {
        fragment: Fragment,
        range: NumberRange,
        next: Option<Box<PathStep>>,
    },
    Equals {
        value: String,
        next: Option<Box<PathStep>>,
    },
    NotEquals {
        value: String,
        next: Option<Box<PathStep>>,
    },
    StartsWith {
        value: String,
        next: Option<Box<PathStep>>,
    },
    EndsWith {
        value: String,
        next: Option<Box<PathStep>>,
    },
    Contains {
        value: String,
        next: Option<Box<PathStep>>,
    },
    WordRange {
        range: WordRange,
        next: Option<Box<PathStep>>,
    },
}

impl PathStep {
    /// The segment following this one.
    #[must_use]
    pub fn next(&self) -> Option<&PathStep> {
        match self {
            Self::Down { next, .. }
            | Self::Equals { next, .. }
            | Self::NotEquals { next, .. }
            | Self::StartsWith { next, .. }
            | Self::EndsWith { next, .. }
            | Self::Contains { next, .. }
            | Self::WordRange { next, .. } => next.as_deref(),
        }
    }

    pub(crate) fn next_mut(&mut self) -> &mut Option<Box<PathStep>> {
        match self {
            Self::Down { next, .. }
            | Self::Equals { next, .. }
            | Self::NotEquals { next, .. }
            | Self::StartsWith { next, .. }
            | Self::EndsWith { next, .. }
            | Self::Contains { next, .. }
            | Self::WordRange { next, .. } => next,
        }
    }

    /// Literal operand of a comparison step.
    fn literal_mut(&mut self) -> Option<&mut String> {
        match self {
            Self::Equals { value, .. }
            | Self::NotEquals { value, .. }
            | Self::StartsWith { value, .. }
            | Self::EndsWith { value, .. }
            | Self::Contains { value, .. } => Some(value),
            Self::Down { .. } | Self::WordRange { .. } => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Unquoting
// ═══════════════════════════════════════════════════════════════════════════════

// The parser keeps literal tokens exactly as written (quotes included) so that
// literal boundaries stay unambiguous while the rest of the expression is
// still being read. Quotes and escapes are removed in one pass afterwards.

impl Matcher {
    pub(crate) fn unquote(&mut self) {
        match self {
            Self::Path(path) => path.unquote(),
            Self::Concat {
                prefix,
                inner,
                postfix,
            } => {
                prefix.iter_mut().for_each(unquote_in_place);
                postfix.iter_mut().for_each(unquote_in_place);
                inner.unquote();
            }
            Self::Lookup { inner, default, .. } | Self::LookupPrefix { inner, default, .. } => {
                default.iter_mut().for_each(unquote_in_place);
                inner.unquote();
            }
            Self::IsNull(inner)
            | Self::NormalizeBrand(inner)
            | Self::CleanVersion(inner)
            | Self::IsInLookupPrefix { inner, .. }
            | Self::WordRange { inner, .. } => inner.unquote(),
        }
    }
}

impl Path {
    fn unquote(&mut self) {
        match self {
            Self::Fixed(value) => unquote_in_place(value),
            Self::Walk(step) => step.unquote(),
            Self::Variable { next, .. } => {
                if let Some(step) = next {
                    step.unquote();
                }
            }
        }
    }
}

impl PathStep {
    fn unquote(&mut self) {
        let mut current = Some(self);
        while let Some(step) = current {
            if let Some(value) = step.literal_mut() {
                unquote_in_place(value);
            }
            current = step.next_mut().as_deref_mut();
        }
    }
}

fn unquote_in_place(literal: &mut String) {
    *literal = unquote(literal);
}

/// Strip the surrounding quotes of a literal token and resolve `\"` and `\\`.
pub(crate) fn unquote(token: &str) -> String {
    let inner = token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped @ ('"' | '\\')) => out.push(escaped),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
