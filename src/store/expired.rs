//! Password expiry index

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::item::Entry;
use crate::utils::SECONDS_PER_DAY;

/// Expiry times of entries that own one
///
/// Dependents are never indexed: an alias reads its expiry from its base and
/// a shortcut has none of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpiredList {
    entries: BTreeMap<Uuid, i64>,
}

impl ExpiredList {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `entry` belongs in the index
    pub fn tracks(entry: &Entry) -> bool {
        !entry.is_dependent() && entry.xtime() != 0
    }

    pub fn add(&mut self, entry: &Entry) {
        if Self::tracks(entry) {
            self.entries.insert(entry.uuid(), entry.xtime());
        }
    }

    /// Re-index after the entry's expiry or type may have changed
    pub fn update(&mut self, entry: &Entry) {
        self.entries.remove(&entry.uuid());
        self.add(entry);
    }

    pub fn remove(&mut self, uuid: &Uuid) -> bool {
        self.entries.remove(uuid).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, uuid: &Uuid) -> Option<i64> {
        self.entries.get(uuid).copied()
    }

    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.entries.contains_key(uuid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &i64)> {
        self.entries.iter()
    }

    /// Entries whose expiry time has passed
    pub fn expired(&self, now: i64) -> Vec<Uuid> {
        self.entries
            .iter()
            .filter(|(_, xtime)| **xtime <= now)
            .map(|(uuid, _)| *uuid)
            .collect()
    }

    /// Entries expiring within `days` days, including already expired ones
    pub fn expiring(&self, days: i64, now: i64) -> Vec<Uuid> {
        let limit = now + days * SECONDS_PER_DAY;
        self.entries
            .iter()
            .filter(|(_, xtime)| **xtime < limit)
            .map(|(uuid, _)| *uuid)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::DependentKind;

    fn with_xtime(xtime: i64) -> Entry {
        let mut e = Entry::new();
        e.set_xtime(xtime);
        e
    }

    #[test]
    fn test_add_only_tracked() {
        let mut list = ExpiredList::new();
        list.add(&Entry::new());
        assert!(list.is_empty());

        let mut alias = with_xtime(100);
        alias.make_dependent(DependentKind::Alias, &Uuid::new_v4());
        list.add(&alias);
        assert!(list.is_empty());

        let e = with_xtime(100);
        list.add(&e);
        assert_eq!(list.get(&e.uuid()), Some(100));
    }

    #[test]
    fn test_update_and_remove() {
        let mut list = ExpiredList::new();
        let mut e = with_xtime(100);
        list.add(&e);
        e.set_xtime(0);
        list.update(&e);
        assert!(!list.contains(&e.uuid()));
        assert!(!list.remove(&e.uuid()));
    }

    #[test]
    fn test_expired_and_expiring() {
        let mut list = ExpiredList::new();
        let past = with_xtime(50);
        let soon = with_xtime(100 + SECONDS_PER_DAY / 2);
        let later = with_xtime(100 + 10 * SECONDS_PER_DAY);
        for e in [&past, &soon, &later] {
            list.add(e);
        }
        assert_eq!(list.expired(100), vec![past.uuid()]);
        let mut expiring = list.expiring(1, 100);
        expiring.sort();
        let mut expected = vec![past.uuid(), soon.uuid()];
        expected.sort();
        assert_eq!(expiring, expected);
    }
}
