//! Serde-deserializable rule-set configuration.
//!
//! These types mirror the builder API of [`RuleSet`]: lookup tables plus
//! rule definitions, loaded from YAML or JSON text and compiled with
//! [`RuleSetConfig::build`].
//!
//! ```yaml
//! verbose: false
//! lookups:
//!   OperatingSystems:
//!     default: Unknown
//!     entries:
//!       android: Android
//!       windows nt: Windows NT
//! rules:
//!   - name: chrome-version
//!     require:
//!       - 'agent.(0-3)product.(0)name="Chrome"'
//!     extract:
//!       field: AgentVersion
//!       confidence: 100
//!       expression: 'agent.(0-3)product.(0)version'
//! ```

use crate::{LookupTable, Lookups, RuleDefinition, RuleError, RuleSet};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Configuration for a [`RuleSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuleSetConfig {
    /// Log every action evaluation at `debug`.
    #[serde(default)]
    pub verbose: bool,

    /// Lookup tables by name.
    #[serde(default)]
    pub lookups: BTreeMap<String, LookupConfig>,

    /// Rules in declaration order. Order breaks confidence ties.
    pub rules: Vec<RuleDefinition>,
}

/// Configuration for one [`LookupTable`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LookupConfig {
    /// Value for keys the table does not hold.
    #[serde(default)]
    pub default: Option<String>,

    /// Key → value. Keys match case-insensitively.
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

impl LookupConfig {
    fn into_table(self, name: String) -> LookupTable {
        let mut table = LookupTable::new(name);
        if let Some(default) = self.default {
            table = table.with_default(default);
        }
        for (key, value) in self.entries {
            table.insert(&key, value);
        }
        table
    }
}

impl RuleSetConfig {
    /// Parse YAML text.
    ///
    /// # Errors
    ///
    /// [`RuleError::Config`] if the text is not a valid configuration.
    pub fn from_yaml(text: &str) -> Result<Self, RuleError> {
        serde_yaml::from_str(text).map_err(|e| RuleError::Config(e.to_string()))
    }

    /// Parse JSON text.
    ///
    /// # Errors
    ///
    /// [`RuleError::Config`] if the text is not a valid configuration.
    pub fn from_json(text: &str) -> Result<Self, RuleError> {
        serde_json::from_str(text).map_err(|e| RuleError::Config(e.to_string()))
    }

    /// Compile into a [`RuleSet`].
    ///
    /// # Errors
    ///
    /// The first rule that fails to compile.
    pub fn build(self) -> Result<RuleSet, RuleError> {
        let lookups: Lookups = self
            .lookups
            .into_iter()
            .map(|(name, table)| table.into_table(name))
            .collect();
        RuleSet::builder()
            .lookups(lookups)
            .verbose(self.verbose)
            .rules(self.rules)
            .build()
    }
}
