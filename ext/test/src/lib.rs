//! agentwalk-test: tree builders and conformance fixtures
//!
//! Provides small builders for hand-assembled input trees, plus a YAML
//! description of trees ([`NodeSpec`]) used by the conformance fixtures.
//!
//! # Example
//!
//! ```
//! use agentwalk_test::prelude::*;
//!
//! let tree = agent([
//!     product("Mozilla", "5.0").with_child(comments(&["Linux", "Android 9"])),
//!     product("Chrome", "99.0"),
//! ]);
//! // Product values are fixed by `product`; attached comments do not change them.
//! assert_eq!(tree.value(), "Mozilla/5.0 Chrome/99.0");
//! assert_eq!(tree.child(Fragment::Product, 1).map(AgentNode::value), Some("Chrome/99.0"));
//! let mozilla = tree.child(Fragment::Product, 0).and_then(|p| p.child(Fragment::Comments, 0));
//! assert_eq!(mozilla.map(AgentNode::value), Some("(Linux; Android 9)"));
//! ```

use agentwalk::{AgentNode, Fragment};

#[cfg(feature = "fixtures")]
pub mod fixture;

/// Root node over `children`; its value is the children's values joined by spaces.
#[must_use]
pub fn agent(children: impl IntoIterator<Item = AgentNode>) -> AgentNode {
    let children: Vec<AgentNode> = children.into_iter().collect();
    let value = children
        .iter()
        .map(AgentNode::value)
        .collect::<Vec<_>>()
        .join(" ");
    children
        .into_iter()
        .fold(AgentNode::agent(value), AgentNode::with_child)
}

/// `Name/Version` product with a name and a version child.
#[must_use]
pub fn product(name: &str, version: &str) -> AgentNode {
    AgentNode::new(Fragment::Product, format!("{name}/{version}"))
        .with_child(AgentNode::new(Fragment::Name, name))
        .with_child(AgentNode::new(Fragment::Version, version))
}

/// `(a; b; c)` comment block with one entry per item.
#[must_use]
pub fn comments(entries: &[&str]) -> AgentNode {
    let block = AgentNode::new(Fragment::Comments, format!("({})", entries.join("; ")));
    entries
        .iter()
        .fold(block, |block, entry| block.with_child(AgentNode::new(Fragment::Entry, *entry)))
}

/// Declarative tree node.
///
/// ```yaml
/// value: "Chrome/99.0"
/// children:
///   - kind: product
///     value: Chrome/99.0
///     children:
///       - { kind: name, value: Chrome }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "fixtures", derive(serde::Deserialize))]
pub struct NodeSpec {
    /// Defaults to `agent`, the root kind.
    #[cfg_attr(feature = "fixtures", serde(default = "root_kind"))]
    pub kind: Fragment,
    pub value: String,
    #[cfg_attr(feature = "fixtures", serde(default))]
    pub children: Vec<NodeSpec>,
}

#[cfg(feature = "fixtures")]
fn root_kind() -> Fragment {
    Fragment::Agent
}

impl NodeSpec {
    /// Build the [`AgentNode`] this spec describes. Sibling indices are
    /// assigned in list order.
    #[must_use]
    pub fn build(&self) -> AgentNode {
        let node = AgentNode::new(self.kind, self.value.clone());
        self.children
            .iter()
            .fold(node, |node, child| node.with_child(child.build()))
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{agent, comments, product, NodeSpec};
    pub use agentwalk::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_joins_child_values() {
        let tree = agent([product("A", "1"), product("B", "2")]);
        assert_eq!(tree.fragment(), Fragment::Agent);
        assert_eq!(tree.value(), "A/1 B/2");
        assert_eq!(tree.children().len(), 2);
    }

    #[test]
    fn comments_index_entries_in_order() {
        let block = comments(&["Linux", "Android 9"]);
        assert_eq!(block.value(), "(Linux; Android 9)");
        assert_eq!(block.child(Fragment::Entry, 1).map(AgentNode::value), Some("Android 9"));
    }

    #[test]
    fn product_value_ignores_attached_comments() {
        let tree = agent([
            product("Mozilla", "5.0").with_child(comments(&["Linux"])),
            product("Chrome", "99.0"),
        ]);
        assert_eq!(tree.value(), "Mozilla/5.0 Chrome/99.0");
        let mozilla = tree.child(Fragment::Product, 0).unwrap();
        assert_eq!(mozilla.child(Fragment::Comments, 0).map(AgentNode::value), Some("(Linux)"));
    }

    #[test]
    fn node_spec_builds_nested_tree() {
        let spec = NodeSpec {
            kind: Fragment::Agent,
            value: "x".into(),
            children: vec![
                NodeSpec {
                    kind: Fragment::Product,
                    value: "a".into(),
                    children: Vec::new(),
                },
                NodeSpec {
                    kind: Fragment::Product,
                    value: "b".into(),
                    children: vec![NodeSpec {
                        kind: Fragment::Name,
                        value: "B".into(),
                        children: Vec::new(),
                    }],
                },
            ],
        };
        let tree = spec.build();
        assert_eq!(tree.size(), 4);
        let b = tree.child(Fragment::Product, 1).unwrap();
        assert_eq!(b.child(Fragment::Name, 0).map(AgentNode::value), Some("B"));
    }
}
