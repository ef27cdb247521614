//! `PathIndex`: the shared trie of structural paths every rule listens on.
//!
//! Built once from all rule expressions. A classification walks the input
//! tree and the index in lockstep, so each tree node is looked at once no
//! matter how many rules care about it.

use crate::expr::{Matcher, Path, PathStep};
use crate::{ActionId, AgentNode, Fragment, RadixTree, WordRange};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Rendered structural path of an index node, such as
/// `agent.(0)product.(0)name="Chrome"`. Variable deliveries use `@Name`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(Arc<str>);

impl PathKey {
    pub(crate) fn new(path: impl Into<Arc<str>>) -> Self {
        Self(path.into())
    }

    /// Key under which a variable's result is delivered to its listeners.
    #[must_use]
    pub fn variable(name: &str) -> Self {
        Self::new(format!("@{name}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathKey({})", self.0)
    }
}

/// The shared path index.
///
/// # Example
///
/// ```
/// use agentwalk::{ActionId, AgentNode, Expression, Fragment, PathIndex};
///
/// let mut index = PathIndex::new();
/// let expr = Expression::parse(r#"agent.(0)product.(0)name="Chrome""#).unwrap();
/// let informs = index.register(ActionId::new(0), expr.root(), &mut |_| {});
/// assert_eq!(informs, 1);
///
/// let tree = AgentNode::agent("Chrome/99").with_child(
///     AgentNode::new(Fragment::Product, "Chrome/99")
///         .with_child(AgentNode::new(Fragment::Name, "Chrome")),
/// );
///
/// let mut seen = Vec::new();
/// index.walk(&tree, |action, path, _node, value| {
///     seen.push((action, path.to_string(), value.to_string()));
/// });
/// assert_eq!(
///     seen,
///     vec![(ActionId::new(0), r#"agent.(0)product.(0)name="Chrome""#.to_string(), "Chrome".to_string())]
/// );
/// ```
#[derive(Debug, Default)]
pub struct PathIndex {
    root: IndexNode,
    registrations: usize,
}

#[derive(Debug, Default)]
struct IndexNode {
    path: PathKey,
    actions: Vec<ActionId>,
    children: HashMap<(Fragment, usize), IndexNode>,
    equals: HashMap<String, IndexNode>,
    starts_with: RadixTree<IndexNode>,
    word_ranges: Vec<(WordRange, IndexNode)>,
}

impl Default for PathKey {
    fn default() -> Self {
        Self::new("")
    }
}

impl PathIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` at every path `matcher` can be satisfied from.
    ///
    /// Returns the number of terminal registrations made (the action's
    /// inform count). Descents fan out over their range. Literal and
    /// variable-rooted expressions register nothing and return 0; a variable
    /// reference is reported through `on_variable` instead.
    pub fn register(
        &mut self,
        action: ActionId,
        matcher: &Matcher,
        on_variable: &mut dyn FnMut(&str),
    ) -> usize {
        let informs = match path_of(matcher) {
            Path::Fixed(_) => 0,
            Path::Variable { name, .. } => {
                on_variable(name);
                0
            }
            Path::Walk(step) => self.root.register(Some(step), action),
        };
        self.registrations += informs;
        informs
    }

    /// Walk `tree`, calling `inform` for every action registered at every
    /// index node the tree reaches.
    ///
    /// Nodes are visited depth first, parents before children, children in
    /// sibling order. Index branches the tree does not have are never looked at.
    pub fn walk<'t, F>(&self, tree: &'t AgentNode, mut inform: F)
    where
        F: FnMut(ActionId, &PathKey, &'t AgentNode, &Cow<'t, str>),
    {
        if let Some(index) = self.root.children.get(&(tree.fragment(), tree.index())) {
            index.visit(tree, &mut inform);
        }
    }

    /// Total terminal registrations across all actions.
    #[must_use]
    pub fn registrations(&self) -> usize {
        self.registrations
    }

    /// Number of index nodes below the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.root.count() - 1
    }

    /// Every path with at least one registered action, sorted.
    #[must_use]
    pub fn registered_paths(&self) -> Vec<(PathKey, Vec<ActionId>)> {
        let mut out = Vec::new();
        self.root.collect(&mut out);
        out.sort();
        out
    }
}

/// The path under any function wrappers.
fn path_of(mut matcher: &Matcher) -> &Path {
    loop {
        matcher = match matcher {
            Matcher::Path(path) => return path,
            Matcher::IsNull(inner)
            | Matcher::Concat { inner, .. }
            | Matcher::NormalizeBrand(inner)
            | Matcher::CleanVersion(inner)
            | Matcher::Lookup { inner, .. }
            | Matcher::LookupPrefix { inner, .. }
            | Matcher::IsInLookupPrefix { inner, .. }
            | Matcher::WordRange { inner, .. } => inner,
        };
    }
}

impl IndexNode {
    fn new(path: String) -> Self {
        Self {
            path: PathKey::new(path),
            ..Self::default()
        }
    }

    fn register(&mut self, step: Option<&PathStep>, action: ActionId) -> usize {
        match step {
            None
            | Some(
                PathStep::NotEquals { .. } | PathStep::EndsWith { .. } | PathStep::Contains { .. },
            ) => {
                self.actions.push(action);
                1
            }
            Some(PathStep::Down {
                fragment,
                range,
                next,
            }) => range
                .iter()
                .map(|index| {
                    self.down(*fragment, index)
                        .register(next.as_deref(), action)
                })
                .sum(),
            Some(terminal @ (PathStep::Equals { .. } | PathStep::StartsWith { .. })) => {
                self.terminal(terminal).actions.push(action);
                1
            }
            Some(PathStep::WordRange { range, next }) => {
                let words = self.word_range(*range);
                match next.as_deref() {
                    Some(terminal @ (PathStep::Equals { .. } | PathStep::StartsWith { .. })) => {
                        words.terminal(terminal).actions.push(action);
                    }
                    _ => words.actions.push(action),
                }
                1
            }
        }
    }

    fn down(&mut self, fragment: Fragment, index: usize) -> &mut IndexNode {
        let parent = &self.path;
        self.children.entry((fragment, index)).or_insert_with(|| {
            IndexNode::new(if parent.as_str().is_empty() {
                fragment.to_string()
            } else {
                format!("{parent}.({index}){fragment}")
            })
        })
    }

    /// The child for an equals or starts-with step. Other steps land on `self`.
    fn terminal(&mut self, step: &PathStep) -> &mut IndexNode {
        let parent = &self.path;
        match step {
            PathStep::Equals { value, .. } => self
                .equals
                .entry(value.clone())
                .or_insert_with(|| IndexNode::new(format!("{parent}={value:?}"))),
            PathStep::StartsWith { value, .. } => self
                .starts_with
                .get_or_insert_with(value, || IndexNode::new(format!("{parent}{{{value:?}"))),
            _ => self,
        }
    }

    fn word_range(&mut self, range: WordRange) -> &mut IndexNode {
        let at = match self.word_ranges.iter().position(|(r, _)| *r == range) {
            Some(at) => at,
            None => {
                let node = IndexNode::new(format!("{}[{range}]", self.path));
                self.word_ranges.push((range, node));
                self.word_ranges.len() - 1
            }
        };
        &mut self.word_ranges[at].1
    }

    fn visit<'t, F>(&self, node: &'t AgentNode, inform: &mut F)
    where
        F: FnMut(ActionId, &PathKey, &'t AgentNode, &Cow<'t, str>),
    {
        self.deliver(node, &Cow::Borrowed(node.value()), inform);
        for child in node.children() {
            if let Some(index) = self.children.get(&(child.fragment(), child.index())) {
                index.visit(child, inform);
            }
        }
    }

    fn deliver<'t, F>(&self, node: &'t AgentNode, value: &Cow<'t, str>, inform: &mut F)
    where
        F: FnMut(ActionId, &PathKey, &'t AgentNode, &Cow<'t, str>),
    {
        for &action in &self.actions {
            inform(action, &self.path, node, value);
        }
        if let Some(equals) = self.equals.get(value.as_ref()) {
            equals.deliver(node, value, inform);
        }
        for prefixed in self.starts_with.find_all_prefixes(value) {
            prefixed.deliver(node, value, inform);
        }
        for (range, words) in &self.word_ranges {
            if let Some(extracted) = range.extract(value) {
                words.deliver(node, &Cow::Owned(extracted), inform);
            }
        }
    }

    fn count(&self) -> usize {
        1 + self.children.values().map(IndexNode::count).sum::<usize>()
            + self.equals.values().map(IndexNode::count).sum::<usize>()
            + self
                .starts_with
                .entries()
                .into_iter()
                .map(|(_, node)| node.count())
                .sum::<usize>()
            + self
                .word_ranges
                .iter()
                .map(|(_, node)| node.count())
                .sum::<usize>()
    }

    fn collect(&self, out: &mut Vec<(PathKey, Vec<ActionId>)>) {
        if !self.actions.is_empty() {
            out.push((self.path.clone(), self.actions.clone()));
        }
        self.children.values().for_each(|c| c.collect(out));
        self.equals.values().for_each(|c| c.collect(out));
        for (_, c) in self.starts_with.entries() {
            c.collect(out);
        }
        self.word_ranges.iter().for_each(|(_, c)| c.collect(out));
    }
}
