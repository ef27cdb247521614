//! agentwalk - path-indexed rule matching over parsed user agent trees
//!
//! Rules describe where in a parsed identification string a value lives
//! (`agent.(0-3)product.(0)name="Chrome"`) and what to do with it. Every
//! rule expression is compiled once; the parts that only depend on the tree
//! shape are merged into one shared [`PathIndex`], so a single walk over the
//! input tree informs every interested action at once.
//!
//! # Architecture
//!
//! - [`Expression`]: Parsed rule expression: a path plus function wrappers
//! - [`StepProgram`]: Compiled remainder of an expression, run per candidate
//! - [`PathIndex`]: Shared trie of walk paths, range descents fanned out
//! - [`RuleAction`]: One expression of a rule with its single-slot buffer
//! - [`Rule`]: Variables, requirements and one extraction deciding a field
//! - [`RuleSet`]: Immutable set of rules plus the index they share
//! - [`MatchState`]: Per-classification buffers, owned by the caller
//!
//! # Key Design Insights
//!
//! 1. **One walk, many rules**: rules that share a path prefix share index
//!    nodes. The tree is visited once per classification no matter how many
//!    rules there are.
//!
//! 2. **First match wins**: each action keeps only the first candidate it is
//!    offered. Range descents (`(0-3)`) deliver candidates in index order.
//!
//! 3. **Cheap rejection**: a rule whose must-have actions did not all receive a
//!    candidate is skipped without evaluating anything.
//!
//! # Example
//!
//! ```
//! use agentwalk::prelude::*;
//!
//! let rules = RuleSet::builder()
//!     .lookup(LookupTable::new("Os").with_entry("android", "Android"))
//!     .rule(RuleDefinition::new(
//!         "os",
//!         "OperatingSystemName",
//!         10,
//!         "LookUpPrefix[Os;agent.(0)product.(0)comments.(0-3)entry]",
//!     ))
//!     .rule(
//!         RuleDefinition::new("chrome", "AgentVersion", 100, "agent.(1)product.(0)version")
//!             .require(r#"agent.(1)product.(0)name="Chrome""#),
//!     )
//!     .build()?;
//!
//! let tree = AgentNode::agent("Mozilla/5.0 (Android 9) Chrome/99.0")
//!     .with_child(
//!         AgentNode::new(Fragment::Product, "Mozilla/5.0 (Android 9)").with_child(
//!             AgentNode::new(Fragment::Comments, "(Android 9)")
//!                 .with_child(AgentNode::new(Fragment::Entry, "Android 9")),
//!         ),
//!     )
//!     .with_child(
//!         AgentNode::new(Fragment::Product, "Chrome/99.0")
//!             .with_child(AgentNode::new(Fragment::Name, "Chrome"))
//!             .with_child(AgentNode::new(Fragment::Version, "99.0")),
//!     );
//!
//! let fields = rules.classify(&tree);
//! assert_eq!(fields.value("OperatingSystemName"), Some("Android"));
//! assert_eq!(fields.value("AgentVersion"), Some("99.0"));
//! # Ok::<(), agentwalk::RuleError>(())
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod action;
mod compile;
mod expr;
mod lookup;
mod normalize;
mod parser;
mod path_index;
mod radix_tree;
mod range;
mod rule;
mod rule_set;
mod step;
mod trace;
mod tree;

#[cfg(feature = "config")]
mod config;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Input tree
pub use tree::{AgentNode, Fragment};

// Expressions
pub use expr::{Expression, Matcher, Path, PathStep};
pub use range::{NumberRange, WordRange};

// Compilation
pub use compile::{compile, Compiled};
pub use step::{Step, StepKind, StepProgram, TableRef, WalkResult};

// Index and evaluation
pub use action::{ActionId, ActionKind, Candidate, MatchState, Outcome, RuleAction};
pub use path_index::{PathIndex, PathKey};
pub use rule::{Emission, ExtractDefinition, Rule, RuleDefinition, VariableDefinition};
pub use rule_set::{Classification, FieldValue, RuleSet, RuleSetBuilder};

// Support
pub use lookup::{LookupTable, Lookups};
pub use normalize::{clean_version, normalize_brand};
pub use radix_tree::RadixTree;

// Config (feature-gated)
#[cfg(feature = "config")]
pub use config::{LookupConfig, RuleSetConfig};

// Trace types
pub use trace::{ActionTrace, ClassifyTrace, RuleTrace};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use agentwalk::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Input tree
        AgentNode,
        // Results
        Classification,
        ClassifyTrace,
        Fragment,
        // Lookups
        LookupTable,
        Lookups,
        MatchState,
        // Rules
        RuleDefinition,
        // Errors
        RuleError,
        RuleSet,
        RuleSetBuilder,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Child indices in a range descent must stay below this.
///
/// Each index in a range becomes its own index branch, so this also bounds
/// the fan-out of a single step.
pub const MAX_CHILD_INDEX: usize = 64;

/// Maximum length of one rule expression, in bytes.
pub const MAX_EXPRESSION_LENGTH: usize = 8192;

/// Maximum nesting of function wrappers in one expression.
///
/// The parser is recursive; this limit protects against stack overflow.
pub const MAX_NESTING: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from rule compilation and rule-set construction.
///
/// These errors are caught when the rule set is built, never during
/// classification. Fix the rule and rebuild.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The expression text does not parse.
    #[error("syntax error in \"{expression}\": {message}")]
    Syntax { expression: String, message: String },

    /// The expression parses but cannot be compiled.
    #[error("invalid expression \"{expression}\": {message}")]
    InvalidExpression { expression: String, message: String },

    /// A child index range or word range is malformed or out of bounds.
    #[error("invalid {kind} range \"{text}\": {reason}")]
    InvalidRange {
        /// `"number"` or `"word"`.
        kind: &'static str,
        text: String,
        reason: String,
    },

    /// A lookup function names a table that was not provided.
    #[error("unknown lookup table \"{table}\" in \"{expression}\"")]
    UnknownLookup { table: String, expression: String },

    /// `@Name` refers to a variable the rule does not declare before use.
    #[error("unknown variable \"@{variable}\" in \"{expression}\"")]
    UnknownVariable { variable: String, expression: String },

    /// One rule failed; `source` says why.
    #[error("rule \"{rule}\": {source}")]
    Rule {
        rule: String,
        #[source]
        source: Box<RuleError>,
    },

    /// Configuration text could not be deserialized.
    #[cfg(feature = "config")]
    #[error("invalid config: {0}")]
    Config(String),
}
