//! Ordered key domains.
//!
//! A domain is the full set of group or series keys an aligned result
//! must cover, whether or not any value was observed for them.

use std::collections::BTreeSet;

/// An ordered set of keys, ascending by `Ord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDomain<K: Ord> {
    keys: BTreeSet<K>,
}

impl<K: Ord> Default for KeyDomain<K> {
    fn default() -> Self {
        Self { keys: BTreeSet::new() }
    }
}

impl<K: Ord + Clone> KeyDomain<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: K) -> bool {
        self.keys.insert(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.keys.iter()
    }

    /// Keys of both domains.
    pub fn union(&self, other: &KeyDomain<K>) -> KeyDomain<K> {
        self.keys.union(&other.keys).cloned().collect()
    }

    /// Keys in ascending order.
    pub fn to_vec(&self) -> Vec<K> {
        self.keys.iter().cloned().collect()
    }
}

impl<K: Ord> Extend<K> for KeyDomain<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.keys.extend(iter);
    }
}

impl<K: Ord> FromIterator<K> for KeyDomain<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self { keys: iter.into_iter().collect() }
    }
}

/// Position of `key` in an ascending slice, as produced by
/// [`KeyDomain::to_vec`].
pub fn position_of<K: Ord>(sorted: &[K], key: &K) -> Option<usize> {
    sorted.binary_search(key).ok()
}
