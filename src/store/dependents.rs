//! Base-to-dependent multimaps

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

/// Links from a base entry to its aliases or shortcuts
///
/// A base never appears with an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependentMap {
    links: BTreeMap<Uuid, BTreeSet<Uuid>>,
}

impl DependentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the pair was already present
    pub fn insert(&mut self, base: &Uuid, dependent: &Uuid) -> bool {
        self.links.entry(*base).or_default().insert(*dependent)
    }

    /// Returns false if the pair was not present
    pub fn remove(&mut self, base: &Uuid, dependent: &Uuid) -> bool {
        let Some(set) = self.links.get_mut(base) else {
            return false;
        };
        let removed = set.remove(dependent);
        if set.is_empty() {
            self.links.remove(base);
        }
        removed
    }

    /// Drop a base and return its dependents
    pub fn remove_base(&mut self, base: &Uuid) -> Vec<Uuid> {
        self.links
            .remove(base)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, base: &Uuid) -> Vec<Uuid> {
        self.links
            .get(base)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, base: &Uuid, dependent: &Uuid) -> bool {
        self.links.get(base).is_some_and(|set| set.contains(dependent))
    }

    pub fn is_base(&self, base: &Uuid) -> bool {
        self.links.contains_key(base)
    }

    /// Number of dependents of `base`
    pub fn count(&self, base: &Uuid) -> usize {
        self.links.get(base).map_or(0, BTreeSet::len)
    }

    /// The base a dependent is linked to
    pub fn base_of(&self, dependent: &Uuid) -> Option<Uuid> {
        self.links
            .iter()
            .find(|(_, set)| set.contains(dependent))
            .map(|(base, _)| *base)
    }

    /// Number of bases
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Total number of links
    pub fn num_links(&self) -> usize {
        self.links.values().map(BTreeSet::len).sum()
    }

    pub fn clear(&mut self) {
        self.links.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &BTreeSet<Uuid>)> {
        self.links.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let mut map = DependentMap::new();
        let base = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(map.insert(&base, &a));
        assert!(!map.insert(&base, &a));
        assert!(map.insert(&base, &b));
        assert_eq!(map.count(&base), 2);
        assert_eq!(map.base_of(&b), Some(base));

        assert!(map.remove(&base, &a));
        assert!(!map.remove(&base, &a));
        assert!(map.remove(&base, &b));
        assert!(!map.is_base(&base));
        assert!(map.is_empty());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut map = DependentMap::new();
        assert!(!map.remove(&Uuid::new_v4(), &Uuid::new_v4()));
        assert!(map.remove_base(&Uuid::new_v4()).is_empty());
    }

    #[test]
    fn test_remove_base() {
        let mut map = DependentMap::new();
        let base = Uuid::new_v4();
        for _ in 0..3 {
            map.insert(&base, &Uuid::new_v4());
        }
        assert_eq!(map.num_links(), 3);
        assert_eq!(map.remove_base(&base).len(), 3);
        assert_eq!(map.num_links(), 0);
    }
}
