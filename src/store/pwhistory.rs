//! Database-wide password history changes

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::item::{Entry, PwhAction};

use super::store::Store;

impl Store {
    /// Apply `action` to the history of every entry that owns one
    ///
    /// Dependents are skipped since aliases share their base's history and
    /// shortcuts have none. Each entry is saved into `saved` before its
    /// first change. Returns the number of entries changed.
    pub(crate) fn apply_history_action(
        &mut self,
        action: PwhAction,
        new_max: usize,
        saved: &mut BTreeMap<Uuid, Entry>,
    ) -> usize {
        let mut changed = 0;
        for (uuid, entry) in self.entries.iter_mut() {
            if entry.is_dependent() {
                continue;
            }
            let mut history = match entry.pw_history() {
                Ok(h) => h,
                Err(e) => {
                    log::warn!("Skipping unreadable password history of {}: {}", uuid, e);
                    continue;
                }
            };
            if !history.apply(action, new_max) {
                continue;
            }

            saved.entry(*uuid).or_insert_with(|| entry.clone());
            entry.set_pw_history(&history);
            entry.touch_status();
            changed += 1;
        }

        if changed > 0 {
            self.db_changed = true;
        }
        log::info!("Password history {:?} applied to {} entries", action, changed);
        changed
    }

    /// Put back entries saved by [`apply_history_action`](Self::apply_history_action)
    pub(crate) fn restore_histories(&mut self, saved: &BTreeMap<Uuid, Entry>) {
        for (uuid, entry) in saved {
            if let Some(slot) = self.entries.get_mut(uuid) {
                *slot = entry.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FieldType;
    use crate::store::store::tests::{add_plain, test_store};

    #[test]
    fn test_start_and_restore() {
        let mut store = test_store();
        let a = add_plain(&mut store, "", "a", "", "pw");
        let b = add_plain(&mut store, "", "b", "", "pw");
        let before = store.content_snapshot();

        let mut saved = BTreeMap::new();
        assert_eq!(store.apply_history_action(PwhAction::Start, 5, &mut saved), 2);
        let history = store.get(&a).unwrap().pw_history().unwrap();
        assert!(history.enabled);
        assert_eq!(history.max, 5);
        assert!(saved.contains_key(&b));

        store.restore_histories(&saved);
        let mut after = store.content_snapshot();
        after.db_changed = before.db_changed;
        assert_eq!(after, before);
    }

    #[test]
    fn test_stop_skips_entries_without_history() {
        let mut store = test_store();
        add_plain(&mut store, "", "a", "", "pw");
        let mut saved = BTreeMap::new();
        assert_eq!(store.apply_history_action(PwhAction::Stop, 0, &mut saved), 0);
        assert!(saved.is_empty());
        assert!(!store.is_db_changed());
    }

    #[test]
    fn test_clear_keeps_status() {
        let mut store = test_store();
        let a = add_plain(&mut store, "", "a", "", "pw");
        if let Some(e) = store.entries.get_mut(&a) {
            e.set_field(FieldType::PwHistory, "10301499602d00003abc");
        }
        let mut saved = BTreeMap::new();
        assert_eq!(store.apply_history_action(PwhAction::Clear, 0, &mut saved), 1);
        let history = store.get(&a).unwrap().pw_history().unwrap();
        assert!(history.enabled);
        assert_eq!(history.max, 3);
        assert!(history.entries.is_empty());
    }
}
