//! Radix tree for prefix lookups.
//!
//! Backs both the starts-with branches of the path index and prefix lookup
//! tables. Children are keyed by their first `char`, so splits never land
//! inside a multi-byte sequence.

use std::collections::HashMap;

/// A radix tree (compressed trie).
///
/// # Performance
///
/// - Insert: O(k) where k is key length
/// - Lookup: O(k) where k is key length
/// - Child access: O(1) via hash map
#[derive(Debug, Clone)]
pub struct RadixTree<V> {
    /// Boxed so `V` may itself contain a `RadixTree<V>`.
    root: Box<Node<V>>,
    len: usize,
}

#[derive(Debug, Clone)]
struct Node<V> {
    /// The prefix edge leading to this node.
    prefix: String,
    value: Option<V>,
    /// Children indexed by the first character of their prefix.
    children: HashMap<char, Node<V>>,
}

impl<V> Default for RadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RadixTree<V> {
    /// Create an empty radix tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Box::new(Node::new(String::new())),
            len: 0,
        }
    }

    /// Insert a key-value pair.
    ///
    /// If the key already exists, the value is replaced and the old value returned.
    pub fn insert(&mut self, key: &str, value: V) -> Option<V> {
        let slot = self.root.slot(key);
        let old = slot.replace(value);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    /// The value stored under `key`, inserting `make()` first if absent.
    pub fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let slot = self.root.slot(key);
        if slot.is_none() {
            self.len += 1;
        }
        slot.get_or_insert_with(make)
    }

    /// Find the value for an exact key match.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.root.get(key)
    }

    /// Find the value with the longest key that is a prefix of the input.
    ///
    /// # Example
    ///
    /// ```
    /// use agentwalk::RadixTree;
    ///
    /// let mut tree = RadixTree::new();
    /// tree.insert("mozilla", "generic");
    /// tree.insert("mozilla/5", "modern");
    ///
    /// assert_eq!(tree.find_longest_prefix("mozilla/5.0 (x11)"), Some(&"modern"));
    /// assert_eq!(tree.find_longest_prefix("mozilla/4.0"), Some(&"generic"));
    /// assert_eq!(tree.find_longest_prefix("opera"), None);
    /// ```
    #[must_use]
    pub fn find_longest_prefix(&self, key: &str) -> Option<&V> {
        self.prefixes_of(key).last()
    }

    /// Find all values whose keys are prefixes of the input, shortest first.
    #[must_use]
    pub fn find_all_prefixes(&self, key: &str) -> Vec<&V> {
        self.prefixes_of(key).collect()
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every `(key, value)` pair, in no particular order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, &V)> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect(&mut String::new(), &mut out);
        out
    }

    fn prefixes_of<'a, 'k>(&'a self, key: &'k str) -> Prefixes<'a, 'k, V> {
        Prefixes {
            current: Some(&*self.root),
            remaining: key,
        }
    }
}

/// Walks down the tree along `remaining`, yielding every stored value passed.
struct Prefixes<'a, 'k, V> {
    current: Option<&'a Node<V>>,
    remaining: &'k str,
}

impl<'a, V> Iterator for Prefixes<'a, '_, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        while let Some(node) = self.current.take() {
            self.current = self.remaining.chars().next().and_then(|first| {
                let child = node.children.get(&first)?;
                let rest = self.remaining.strip_prefix(child.prefix.as_str())?;
                self.remaining = rest;
                Some(child)
            });
            if let Some(value) = &node.value {
                return Some(value);
            }
        }
        None
    }
}

impl<V> Node<V> {
    fn new(prefix: String) -> Self {
        Self {
            prefix,
            value: None,
            children: HashMap::new(),
        }
    }

    /// The value slot for `key`, creating and splitting nodes as needed.
    fn slot(&mut self, key: &str) -> &mut Option<V> {
        let Some(first) = key.chars().next() else {
            return &mut self.value;
        };

        let common = match self.children.get(&first) {
            Some(child) => common_prefix_len(key, &child.prefix),
            None => {
                let leaf = self
                    .children
                    .entry(first)
                    .or_insert_with(|| Node::new(key.to_owned()));
                return &mut leaf.value;
            }
        };

        let needs_split = self
            .children
            .get(&first)
            .is_some_and(|child| common < child.prefix.len());
        if needs_split {
            if let Some(mut old) = self.children.remove(&first) {
                let tail = old.prefix.split_off(common);
                old.prefix = tail;
                let mut split = Node::new(key[..common].to_owned());
                if let Some(tail_first) = old.prefix.chars().next() {
                    split.children.insert(tail_first, old);
                }
                self.children.insert(first, split);
            }
        }

        match self.children.get_mut(&first) {
            Some(child) => child.slot(&key[common..]),
            // The child for `first` was present above and is only ever replaced.
            None => &mut self.value,
        }
    }

    fn get(&self, key: &str) -> Option<&V> {
        let Some(first) = key.chars().next() else {
            return self.value.as_ref();
        };
        let child = self.children.get(&first)?;
        child.get(key.strip_prefix(child.prefix.as_str())?)
    }

    fn collect<'a>(&'a self, path: &mut String, out: &mut Vec<(String, &'a V)>) {
        let mark = path.len();
        path.push_str(&self.prefix);
        if let Some(value) = &self.value {
            out.push((path.clone(), value));
        }
        for child in self.children.values() {
            child.collect(path, out);
        }
        path.truncate(mark);
    }
}

/// Length in bytes of the common prefix of two strings, on a char boundary.
#[inline]
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut tree = RadixTree::new();
        tree.insert("hello", 1);
        tree.insert("world", 2);
        tree.insert("help", 3);

        assert_eq!(tree.get("hello"), Some(&1));
        assert_eq!(tree.get("world"), Some(&2));
        assert_eq!(tree.get("help"), Some(&3));
        assert_eq!(tree.get("hell"), None);
        assert_eq!(tree.get("helper"), None);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_prefix_splitting() {
        let mut tree = RadixTree::new();
        tree.insert("Chrome", 1);
        tree.insert("ChromeOS", 2);
        tree.insert("Chromium", 3);

        assert_eq!(tree.get("Chrome"), Some(&1));
        assert_eq!(tree.get("ChromeOS"), Some(&2));
        assert_eq!(tree.get("Chromium"), Some(&3));
        assert_eq!(tree.get("Chrom"), None);
    }

    #[test]
    fn test_find_all_prefixes_shortest_first() {
        let mut tree = RadixTree::new();
        tree.insert("M", 1);
        tree.insert("Mozilla", 2);
        tree.insert("Mozilla/5", 3);

        assert_eq!(tree.find_all_prefixes("Mozilla/5.0"), vec![&1, &2, &3]);
        assert_eq!(tree.find_all_prefixes("Mozilla/4.0"), vec![&1, &2]);
        assert_eq!(tree.find_longest_prefix("Mozilla/4.0"), Some(&2));
        assert!(tree.find_all_prefixes("Opera").is_empty());
    }

    #[test]
    fn test_overwrite() {
        let mut tree = RadixTree::new();
        assert_eq!(tree.insert("key", 1), None);
        assert_eq!(tree.insert("key", 2), Some(1));
        assert_eq!(tree.get("key"), Some(&2));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_empty_key() {
        let mut tree = RadixTree::new();
        tree.insert("", "root");
        assert_eq!(tree.get(""), Some(&"root"));
        assert_eq!(tree.find_longest_prefix("anything"), Some(&"root"));
    }

    #[test]
    fn test_multibyte_keys_split_on_char_boundaries() {
        let mut tree = RadixTree::new();
        tree.insert("é1", 1);
        tree.insert("è2", 2);
        tree.insert("éa", 3);

        assert_eq!(tree.get("é1"), Some(&1));
        assert_eq!(tree.get("è2"), Some(&2));
        assert_eq!(tree.get("éa"), Some(&3));
        assert_eq!(tree.find_longest_prefix("éab"), Some(&3));
    }

    #[test]
    fn test_get_or_insert_with_reuses_slot() {
        let mut tree: RadixTree<Vec<u32>> = RadixTree::new();
        tree.get_or_insert_with("Win", Vec::new).push(1);
        tree.get_or_insert_with("Win", Vec::new).push(2);
        tree.get_or_insert_with("Windows", Vec::new).push(3);

        assert_eq!(tree.get("Win"), Some(&vec![1, 2]));
        assert_eq!(tree.get("Windows"), Some(&vec![3]));
        assert_eq!(tree.len(), 2);

        let mut keys: Vec<String> = tree.entries().into_iter().map(|(k, _)| k).collect();
        keys.sort();
        assert_eq!(keys, vec!["Win", "Windows"]);
    }

    #[test]
    fn test_prefix_result_outlives_key() {
        let mut tree = RadixTree::new();
        tree.insert("android", "Android");
        let found = {
            let key = String::from("android 9");
            tree.find_longest_prefix(&key)
        };
        assert_eq!(found, Some(&"Android"));
    }

    #[derive(Debug, Default)]
    struct Nested {
        children: RadixTree<Nested>,
    }

    #[test]
    fn test_value_may_hold_a_tree_of_itself() {
        let mut outer: RadixTree<Nested> = RadixTree::new();
        outer
            .get_or_insert_with("Mozilla", Nested::default)
            .children
            .insert("Mozilla/5", Nested::default());

        let inner = outer.find_longest_prefix("Mozilla/5.0").map(|n| &n.children);
        assert_eq!(inner.map(RadixTree::len), Some(1));
        assert!(inner.and_then(|t| t.get("Mozilla/5")).is_some());
    }
}
