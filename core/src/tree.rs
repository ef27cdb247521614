//! Input tree: the structural parse of one identification string.
//!
//! The engine never builds these from raw text; an external parser does. This
//! module only defines the node shape the engine walks and a small builder
//! so drivers and tests can assemble trees by hand.

use std::fmt;
use std::str::FromStr;

/// Structural category of an [`AgentNode`].
///
/// The set is closed: rule expressions can only descend into these kinds, so
/// the path index keys on them directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Fragment {
    /// The whole identification string (tree root).
    Agent,
    /// `Name/Version (comments)` group.
    Product,
    /// Product name.
    Name,
    /// Product version.
    Version,
    /// Parenthesised comment block.
    Comments,
    /// One `;`-separated entry inside comments.
    Entry,
    /// Free text.
    Text,
    /// URL.
    Url,
    /// Email address.
    Email,
    /// Base64 blob.
    Base64,
    /// UUID.
    Uuid,
    /// `key=value` pair.
    KeyValue,
    /// Key of a pair.
    Key,
    /// Value of a pair.
    Value,
}

impl Fragment {
    /// Every fragment kind, in declaration order.
    pub const ALL: [Fragment; 14] = [
        Self::Agent,
        Self::Product,
        Self::Name,
        Self::Version,
        Self::Comments,
        Self::Entry,
        Self::Text,
        Self::Url,
        Self::Email,
        Self::Base64,
        Self::Uuid,
        Self::KeyValue,
        Self::Key,
        Self::Value,
    ];

    /// Name used in rule expressions (`product`, `keyvalue`, ...).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Product => "product",
            Self::Name => "name",
            Self::Version => "version",
            Self::Comments => "comments",
            Self::Entry => "entry",
            Self::Text => "text",
            Self::Url => "url",
            Self::Email => "email",
            Self::Base64 => "base64",
            Self::Uuid => "uuid",
            Self::KeyValue => "keyvalue",
            Self::Key => "key",
            Self::Value => "value",
        }
    }

    /// Look up a fragment by its expression name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// Number of same-kind siblings an expression may address when it does
    /// not give an explicit range.
    #[must_use]
    pub fn max_range(self) -> usize {
        match self {
            Self::Agent | Self::Name | Self::Text | Self::Key => 1,
            Self::Product => 10,
            Self::Version => 5,
            Self::Comments | Self::Url | Self::Email | Self::Base64 | Self::Value => 2,
            Self::Entry => 20,
            Self::Uuid => 4,
            Self::KeyValue => 3,
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Fragment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown fragment \"{s}\""))
    }
}

/// One node of a parsed identification string.
///
/// `index` is the 0-based position among siblings of the same [`Fragment`],
/// assigned by [`push`](Self::push). The matching engine only ever borrows
/// nodes.
///
/// # Example
///
/// ```
/// use agentwalk::{AgentNode, Fragment};
///
/// let tree = AgentNode::agent("Mozilla/5.0 Firefox/53.0").with_child(
///     AgentNode::new(Fragment::Product, "Firefox/53.0")
///         .with_child(AgentNode::new(Fragment::Name, "Firefox"))
///         .with_child(AgentNode::new(Fragment::Version, "53.0")),
/// );
///
/// let product = tree.child(Fragment::Product, 0).unwrap();
/// assert_eq!(product.child(Fragment::Version, 0).unwrap().value(), "53.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentNode {
    fragment: Fragment,
    index: usize,
    value: String,
    children: Vec<AgentNode>,
}

impl AgentNode {
    /// Create a detached node. Its index is fixed when it is pushed under a parent.
    pub fn new(fragment: Fragment, value: impl Into<String>) -> Self {
        Self {
            fragment,
            index: 0,
            value: value.into(),
            children: Vec::new(),
        }
    }

    /// Create a tree root.
    pub fn agent(value: impl Into<String>) -> Self {
        Self::new(Fragment::Agent, value)
    }

    /// Append a child, assigning its same-kind sibling index.
    pub fn push(&mut self, mut child: AgentNode) {
        child.index = self
            .children
            .iter()
            .filter(|c| c.fragment == child.fragment)
            .count();
        self.children.push(child);
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with_child(mut self, child: AgentNode) -> Self {
        self.push(child);
        self
    }

    #[must_use]
    pub fn fragment(&self) -> Fragment {
        self.fragment
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn children(&self) -> &[AgentNode] {
        &self.children
    }

    /// The `index`-th child of kind `fragment`, if the tree has one.
    #[must_use]
    pub fn child(&self, fragment: Fragment, index: usize) -> Option<&AgentNode> {
        self.children
            .iter()
            .find(|c| c.fragment == fragment && c.index == index)
    }

    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(AgentNode::size).sum::<usize>()
    }
}
