//! Named lookup tables consulted by `LookUp`, `LookUpPrefix` and
//! `IsInLookUpPrefix` expressions.
//!
//! Keys are matched case-insensitively; values are returned as stored.

use crate::RadixTree;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A read-only key → value mapping with an optional default.
#[derive(Clone)]
pub struct LookupTable {
    name: String,
    exact: HashMap<String, String>,
    prefixes: RadixTree<String>,
    default: Option<String>,
}

impl LookupTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exact: HashMap::new(),
            prefixes: RadixTree::new(),
            default: None,
        }
    }

    /// Value returned by `LookUp` and `LookUpPrefix` on a miss when the
    /// expression does not name its own default.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn with_entry(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let key = key.to_lowercase();
        let value = value.into();
        self.prefixes.insert(&key, value.clone());
        self.exact.insert(key, value);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    /// Exact (case-insensitive) lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.exact.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Value of the longest key that is a prefix of `key`.
    ///
    /// ```
    /// use agentwalk::LookupTable;
    ///
    /// let table = LookupTable::new("Os")
    ///     .with_entry("Windows", "Windows")
    ///     .with_entry("Windows NT 10", "Windows 10");
    ///
    /// assert_eq!(table.get_prefix("windows nt 10.0"), Some("Windows 10"));
    /// assert_eq!(table.get_prefix("Windows 98"), Some("Windows"));
    /// assert_eq!(table.get_prefix("Linux"), None);
    /// ```
    #[must_use]
    pub fn get_prefix(&self, key: &str) -> Option<&str> {
        self.prefixes
            .find_longest_prefix(&key.to_lowercase())
            .map(String::as_str)
    }

    /// `true` if some key is a prefix of `key`.
    #[must_use]
    pub fn contains_prefix(&self, key: &str) -> bool {
        self.get_prefix(key).is_some()
    }
}

impl fmt::Debug for LookupTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupTable")
            .field("name", &self.name)
            .field("entries", &self.exact.len())
            .field("default", &self.default)
            .finish()
    }
}

/// The lookup tables available to a rule set, by name.
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    tables: HashMap<String, Arc<LookupTable>>,
}

impl Lookups {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, replacing any table of the same name.
    pub fn insert(&mut self, table: LookupTable) {
        self.tables
            .insert(table.name().to_owned(), Arc::new(table));
    }

    #[must_use]
    pub fn with_table(mut self, table: LookupTable) -> Self {
        self.insert(table);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<LookupTable>> {
        self.tables.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<LookupTable> for Lookups {
    fn from_iter<I: IntoIterator<Item = LookupTable>>(iter: I) -> Self {
        let mut lookups = Self::new();
        for table in iter {
            lookups.insert(table);
        }
        lookups
    }
}
