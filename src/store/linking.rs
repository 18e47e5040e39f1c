//! Bulk linking of dependents to their bases

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::item::{Attachment, DependentKind, Entry, EntryType};
use crate::report::{self, Reporter};

use super::alias::{BaseEntryError, ResolveBy};
use super::dependents::DependentMap;
use super::expired::ExpiredList;
use super::rue::RueList;
use super::interface::CommandInterface;
use super::store::Store;

/// State needed to reverse a bulk link
#[derive(Debug, Clone, Default)]
pub struct DependentsUndo {
    /// Entries as they were before being changed, by UUID
    pub(crate) saved_entries: BTreeMap<Uuid, Entry>,
    /// Entries removed because they could not be linked
    pub(crate) deleted: Vec<(Entry, Option<Attachment>)>,
    pub(crate) saved_aliases: DependentMap,
    pub(crate) saved_shortcuts: DependentMap,
    pub(crate) saved_expired: ExpiredList,
    pub(crate) saved_rue: RueList,
}

impl DependentsUndo {
    /// Entries removed because their base could not be resolved
    pub fn deleted(&self) -> impl Iterator<Item = &Entry> {
        self.deleted.iter().map(|(e, _)| e)
    }
}

/// Outcome of a bulk link
#[derive(Debug, Clone, Default)]
pub struct DependentsResult {
    /// Number of dependents linked
    pub linked: usize,
    pub undo: DependentsUndo,
}

impl Store {
    fn save_entry(&self, saved: &mut BTreeMap<Uuid, Entry>, uuid: &Uuid) {
        if saved.contains_key(uuid) {
            return;
        }
        if let Some(entry) = self.entries.get(uuid) {
            saved.insert(*uuid, entry.clone());
        }
    }

    /// Turn each candidate whose password names a base into a dependent
    ///
    /// Candidates that are not base references are left alone. An alias
    /// whose base cannot be resolved stays a normal entry; a shortcut in the
    /// same situation is deleted. A candidate that is already a base, or
    /// became one earlier in the batch, is left as it is. Every failure is
    /// reported.
    pub(crate) fn link_dependents(
        &mut self,
        uuids: &[Uuid],
        reporter: Option<&mut dyn Reporter>,
        kind: DependentKind,
        via: ResolveBy,
    ) -> DependentsResult {
        let mut reporter = reporter;
        let mut undo = DependentsUndo {
            saved_entries: BTreeMap::new(),
            deleted: Vec::new(),
            saved_aliases: self.aliases.clone(),
            saved_shortcuts: self.shortcuts.clone(),
            saved_expired: self.expired.clone(),
            saved_rue: self.rue.clone(),
        };
        let mut linked = 0;

        for uuid in uuids {
            let Some(entry) = self.entries.get(uuid) else {
                continue;
            };
            let password = entry.password();
            let label = entry.group_title();

            match self.resolve_base(&password, uuid, kind, via) {
                Ok(None) => {}
                Ok(Some(base)) => {
                    self.save_entry(&mut undo.saved_entries, uuid);
                    self.save_entry(&mut undo.saved_entries, &base);

                    if let Some(entry) = self.entries.get_mut(uuid) {
                        entry.make_dependent(kind, &base);
                    }
                    if let Some(base_entry) = self.entries.get_mut(&base) {
                        if base_entry.entry_type() == EntryType::Normal {
                            base_entry.set_entry_type(kind.base_type());
                        }
                    }
                    self.dependent_links_mut(kind).insert(&base, uuid);
                    self.expired.remove(uuid);
                    linked += 1;
                }
                Err(e) => {
                    let message = format!("{} '{}': {}", kind.name(), label, e);
                    report::report(&mut reporter, &message);
                    if kind == DependentKind::Shortcut && e != BaseEntryError::DependentIsBase {
                        if let Some(removed) = self.do_delete_entry(uuid) {
                            undo.deleted.push(removed);
                        }
                    }
                }
            }
        }

        if linked > 0 || !undo.deleted.is_empty() {
            self.db_changed = true;
        }
        log::info!("Linked {} {} entries, removed {}", linked, kind.name(), undo.deleted.len());
        DependentsResult { linked, undo }
    }

    /// Put back everything a bulk link changed
    pub(crate) fn restore_dependents(&mut self, undo: DependentsUndo) {
        for (entry, attachment) in undo.deleted.into_iter().rev() {
            self.do_add_entry(entry, attachment);
        }
        for (uuid, entry) in undo.saved_entries {
            self.entries.insert(uuid, entry);
        }
        self.aliases = undo.saved_aliases;
        self.shortcuts = undo.saved_shortcuts;
        self.expired = undo.saved_expired;
        self.rue = undo.saved_rue;
    }

    /// Repoint every dependent of `from` at `to`
    pub(crate) fn move_dependents(&mut self, from: &Uuid, to: &Uuid, kind: DependentKind) -> bool {
        if from == to || !self.entries.get(to).is_some_and(|e| !e.is_dependent()) {
            return false;
        }
        let moving = self.dependent_links_mut(kind).remove_base(from);
        if moving.is_empty() {
            return false;
        }

        for dep in &moving {
            if let Some(entry) = self.entries.get_mut(dep) {
                entry.set_base_uuid(to);
            }
            self.dependent_links_mut(kind).insert(to, dep);
        }
        if let Some(old_base) = self.entries.get_mut(from) {
            if old_base.entry_type() == kind.base_type() {
                old_base.set_entry_type(EntryType::Normal);
            }
        }
        if let Some(new_base) = self.entries.get_mut(to) {
            if new_base.entry_type() == EntryType::Normal {
                new_base.set_entry_type(kind.base_type());
            }
        }
        self.db_changed = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FieldType;
    use crate::store::store::tests::{add_plain, test_store};

    #[test]
    fn test_link_by_gtu() {
        let mut store = test_store();
        let base = add_plain(&mut store, "G", "Base", "", "secret");
        let alias = add_plain(&mut store, "G", "Alias", "", "[G:Base]");
        let plain = add_plain(&mut store, "G", "Plain", "", "not a ref");

        let result = store.link_dependents(&[alias, plain], None, DependentKind::Alias, ResolveBy::Gtu);
        assert_eq!(result.linked, 1);
        assert!(store.get(&alias).unwrap().is_alias());
        assert_eq!(store.get(&alias).unwrap().base_uuid(), Some(base));
        assert!(store.get(&base).unwrap().is_alias_base());
        assert!(store.get(&plain).unwrap().is_normal());
        assert_eq!(result.undo.saved_entries.len(), 2);
    }

    #[test]
    fn test_failed_alias_stays_normal_and_reports() {
        let mut store = test_store();
        let alias = add_plain(&mut store, "G", "Alias", "", "[Nowhere]");
        let mut messages: Vec<String> = Vec::new();

        let result = store.link_dependents(&[alias], Some(&mut messages), DependentKind::Alias, ResolveBy::Gtu);
        assert_eq!(result.linked, 0);
        assert!(store.get(&alias).unwrap().is_normal());
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("G.Alias"));
    }

    #[test]
    fn test_failed_shortcut_is_deleted_and_restored() {
        let mut store = test_store();
        let missing = Uuid::new_v4();
        let sc = add_plain(&mut store, "G", "Sc", "", &format!("[~{}~]", missing.simple()));
        let before = store.content_snapshot();

        let result = store.link_dependents(&[sc], None, DependentKind::Shortcut, ResolveBy::Uuid);
        assert!(store.get(&sc).is_none());
        assert_eq!(result.undo.deleted().count(), 1);

        store.restore_dependents(result.undo);
        let mut after = store.content_snapshot();
        after.modified_nodes = before.modified_nodes.clone();
        after.db_changed = before.db_changed;
        assert_eq!(after, before);
    }

    #[test]
    fn test_batch_never_chains_aliases() {
        let mut store = test_store();
        let a = add_plain(&mut store, "", "A", "", "[B]");
        let b = add_plain(&mut store, "", "B", "", "[C]");
        let c = add_plain(&mut store, "", "C", "", "pwC");
        let mut messages: Vec<String> = Vec::new();

        let result = store.link_dependents(&[a, b], Some(&mut messages), DependentKind::Alias, ResolveBy::Gtu);
        assert_eq!(result.linked, 1);
        assert_eq!(store.get(&a).unwrap().base_uuid(), Some(b));
        assert!(store.get(&b).unwrap().is_alias_base());
        assert!(store.get(&c).unwrap().is_normal());
        assert_eq!(store.effective_field_value(&a, FieldType::Password).as_deref(), Some("[C]"));
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("already the base"));
    }

    #[test]
    fn test_base_shortcut_candidate_is_kept() {
        let mut store = test_store();
        let target = add_plain(&mut store, "", "Target", "", "pw");
        let base = add_plain(&mut store, "", "Base", "", "[Target]");
        let sc = add_plain(&mut store, "", "Sc", "", "[Base]");

        store.link_dependents(&[sc], None, DependentKind::Shortcut, ResolveBy::Gtu);
        let result = store.link_dependents(&[base], None, DependentKind::Shortcut, ResolveBy::Gtu);
        assert_eq!(result.linked, 0);
        assert!(result.undo.deleted.is_empty());
        assert!(store.get(&base).unwrap().is_shortcut_base());
        assert!(store.get(&target).unwrap().is_normal());
        assert_eq!(store.get(&sc).unwrap().base_uuid(), Some(base));
    }

    #[test]
    fn test_move_dependents_to_dependent_refused() {
        let mut store = test_store();
        let from = add_plain(&mut store, "", "from", "", "pw");
        let other = add_plain(&mut store, "", "other", "", "pw");
        let dep = add_plain(&mut store, "", "dep", "", "[from]");
        let dep2 = add_plain(&mut store, "", "dep2", "", "[other]");
        store.link_dependents(&[dep, dep2], None, DependentKind::Alias, ResolveBy::Gtu);

        assert!(!store.move_dependents(&from, &dep2, DependentKind::Alias));
        assert_eq!(store.get(&dep).unwrap().base_uuid(), Some(from));
    }

    #[test]
    fn test_move_dependents() {
        let mut store = test_store();
        let from = add_plain(&mut store, "", "from", "", "pw");
        let to = add_plain(&mut store, "", "to", "", "pw");
        let dep = add_plain(&mut store, "", "dep", "", &format!("[[{}]]", from.simple()));
        store.link_dependents(&[dep], None, DependentKind::Alias, ResolveBy::Uuid);

        assert!(store.move_dependents(&from, &to, DependentKind::Alias));
        assert!(store.get(&from).unwrap().is_normal());
        assert!(store.get(&to).unwrap().is_alias_base());
        assert_eq!(store.get(&dep).unwrap().base_uuid(), Some(to));
        assert_eq!(store.dependents(&to, DependentKind::Alias), vec![dep]);

        assert!(!store.move_dependents(&from, &to, DependentKind::Alias));
    }
}
