//! The mutation surface commands execute against
//!
//! [`CommandInterface`] is the only way commands reach the store. Its
//! primitives never fail loudly: absence comes back as `None`, refused
//! changes as `false` and bulk results as counts.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::command::MultiCommands;
use crate::filter::FilterMap;
use crate::item::{Attachment, DependentKind, Entry, EntryType, FieldType, PasswordPolicy, PwhAction};
use crate::prefs::Preferences;
use crate::report::Reporter;
use crate::utils::group_with_ancestors;

use super::alias::ResolveBy;
use super::dependents::DependentMap;
use super::header::HeaderType;
use super::linking::{DependentsResult, DependentsUndo};
use super::rue::RueList;
use super::store::Store;

/// What a view should refresh after a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuiAction {
    UpdateStatusBar,
    AddEntry,
    DeleteEntry,
    ModifyEntry,
    RefreshEntry,
    RefreshEntryPassword,
    RefreshTree,
    RefreshGroups,
    RefreshBothViews,
    DbPreferencesChanged,
    PwhChangedInDb,
}

/// Receives change notifications from the store
///
/// Called synchronously once a change is complete. Implementations must
/// not hold on to store state.
pub trait Observer {
    fn entry_updated(&mut self, action: GuiAction, uuid: &Uuid, field: Option<FieldType>);

    fn groups_updated(&mut self, _action: GuiAction, _groups: &[String]) {}
}

/// Store operations available to commands
pub trait CommandInterface {
    fn is_read_only(&self) -> bool;
    fn preferences(&self) -> &Preferences;
    fn find(&self, uuid: &Uuid) -> Option<&Entry>;
    fn find_gtu(&self, group: &str, title: &str, user: &str) -> Option<&Entry>;
    fn find_attachment(&self, uuid: &Uuid) -> Option<&Attachment>;

    /// Insert an entry and, if not already stored, its attachment
    ///
    /// Refuses an entry whose UUID is already present. Dependents are not
    /// linked here.
    fn do_add_entry(&mut self, entry: Entry, attachment: Option<Attachment>) -> bool;

    /// Remove an entry without touching its dependents
    ///
    /// Returns the removed entry and, if this was its last reference, the
    /// removed attachment.
    fn do_delete_entry(&mut self, uuid: &Uuid) -> Option<(Entry, Option<Attachment>)>;

    /// Swap in a new value for an existing entry with the same UUID
    fn do_replace_entry(&mut self, old: &Uuid, new: Entry) -> bool;

    /// Link `dependent` to `base`, turning a normal base into a base entry
    fn do_add_dependent_entry(&mut self, base: &Uuid, dependent: &Uuid, kind: DependentKind) -> bool;

    /// Unlink `dependent` from `base`; a base left without dependents
    /// becomes normal again
    fn do_remove_dependent_entry(&mut self, base: &Uuid, dependent: &Uuid, kind: DependentKind) -> bool;

    fn get_dependents(&self, base: &Uuid, kind: DependentKind) -> Vec<Uuid>;
    fn dependent_map(&self, kind: DependentKind) -> DependentMap;
    fn set_dependent_map(&mut self, kind: DependentKind, map: DependentMap);

    fn do_add_dependent_entries(
        &mut self,
        uuids: &[Uuid],
        reporter: Option<&mut dyn Reporter>,
        kind: DependentKind,
        via: ResolveBy,
    ) -> DependentsResult;

    fn undo_add_dependent_entries(&mut self, undo: DependentsUndo);

    fn do_move_dependent_entries(&mut self, from: &Uuid, to: &Uuid, kind: DependentKind) -> bool;

    /// Apply a history action to every entry that owns its history,
    /// saving each changed entry's prior value into `saved`
    fn do_update_password_history(
        &mut self,
        action: PwhAction,
        new_max: usize,
        saved: &mut BTreeMap<Uuid, Entry>,
    ) -> usize;

    fn undo_update_password_history(&mut self, saved: &BTreeMap<Uuid, Entry>);

    /// Plan the commands that rename group `old` to `new`
    fn do_rename_group(&self, old: &str, new: &str) -> MultiCommands;

    fn add_changed_nodes(&mut self, path: &str);
    fn modified_nodes(&self) -> &BTreeSet<String>;
    fn set_modified_nodes(&mut self, nodes: BTreeSet<String>);
    fn is_db_changed(&self) -> bool;
    fn set_db_changed(&mut self, changed: bool);

    fn get_header_item(&self, ht: HeaderType) -> String;
    fn do_change_header(&mut self, ht: HeaderType, value: &str) -> bool;
    fn undo_change_header(&mut self, ht: HeaderType, old: &str);

    fn set_db_preferences(&mut self, prefs: Preferences);
    fn named_policies(&self) -> &BTreeMap<String, PasswordPolicy>;
    fn set_named_policies(&mut self, policies: BTreeMap<String, PasswordPolicy>);
    fn empty_groups(&self) -> &BTreeSet<String>;
    fn set_empty_groups(&mut self, groups: BTreeSet<String>);
    fn filters(&self) -> &FilterMap;
    fn set_filters(&mut self, filters: FilterMap);
    fn rue_list(&self) -> &RueList;
    fn set_rue_list(&mut self, rue: RueList);

    /// Re-index an entry's expiry after its fields changed
    fn update_expiry_entry(&mut self, uuid: &Uuid);
    fn remove_expiry_entry(&mut self, uuid: &Uuid);

    fn notify_gui(&mut self, action: GuiAction, uuid: &Uuid, field: Option<FieldType>);
    fn notify_groups(&mut self, action: GuiAction, groups: &[String]);
}

impl CommandInterface for Store {
    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    fn find(&self, uuid: &Uuid) -> Option<&Entry> {
        self.entries.get(uuid)
    }

    fn find_gtu(&self, group: &str, title: &str, user: &str) -> Option<&Entry> {
        Store::find_gtu(self, group, title, user)
    }

    fn find_attachment(&self, uuid: &Uuid) -> Option<&Attachment> {
        self.attachments.get(uuid)
    }

    fn do_add_entry(&mut self, entry: Entry, attachment: Option<Attachment>) -> bool {
        let uuid = entry.uuid();
        if self.entries.contains_key(&uuid) {
            log::error!("Refusing to add entry {}: UUID already present", uuid);
            debug_assert!(false, "duplicate entry UUID");
            return false;
        }

        if let Some(att) = attachment {
            self.attachments.entry(att.uuid()).or_insert(att);
        }
        if let Some(att_uuid) = entry.attachment_ref() {
            match self.attachments.get_mut(&att_uuid) {
                Some(att) => att.inc_ref(),
                None => log::warn!("Entry {} refers to missing attachment {}", uuid, att_uuid),
            }
        }

        self.expired.add(&entry);
        self.add_changed_nodes(&entry.group());
        self.entries.insert(uuid, entry);
        self.db_changed = true;
        true
    }

    fn do_delete_entry(&mut self, uuid: &Uuid) -> Option<(Entry, Option<Attachment>)> {
        let entry = self.entries.remove(uuid)?;

        let mut removed_att = None;
        if let Some(att_uuid) = entry.attachment_ref() {
            if let Some(att) = self.attachments.get_mut(&att_uuid) {
                att.dec_ref();
                if att.ref_count() == 0 {
                    removed_att = self.attachments.remove(&att_uuid);
                }
            }
        }

        self.expired.remove(uuid);
        self.rue.remove(uuid);
        self.add_changed_nodes(&entry.group());
        self.db_changed = true;
        Some((entry, removed_att))
    }

    fn do_replace_entry(&mut self, old: &Uuid, new: Entry) -> bool {
        if new.uuid() != *old {
            log::error!("Replacement for entry {} carries a different UUID", old);
            debug_assert!(false, "replace with mismatched UUID");
            return false;
        }
        let Some(slot) = self.entries.get_mut(old) else {
            return false;
        };

        let old_group = slot.group();
        let old_att = slot.attachment_ref();
        let new_att = new.attachment_ref();
        *slot = new;

        if old_att != new_att {
            if let Some(att) = old_att.and_then(|a| self.attachments.get_mut(&a)) {
                att.dec_ref();
            }
            if let Some(att) = new_att.and_then(|a| self.attachments.get_mut(&a)) {
                att.inc_ref();
            }
        }

        let mut group = String::new();
        if let Some(entry) = self.entries.get(old) {
            self.expired.update(entry);
            group = entry.group();
        }
        self.add_changed_nodes(&old_group);
        self.add_changed_nodes(&group);
        self.db_changed = true;
        true
    }

    fn do_add_dependent_entry(&mut self, base: &Uuid, dependent: &Uuid, kind: DependentKind) -> bool {
        let Some(base_entry) = self.entries.get_mut(base) else {
            log::warn!("Cannot link {} to missing base {}", dependent, base);
            return false;
        };
        if base_entry.entry_type() == EntryType::Normal {
            base_entry.set_entry_type(kind.base_type());
        }
        self.dependent_links_mut(kind).insert(base, dependent);
        self.db_changed = true;
        true
    }

    fn do_remove_dependent_entry(&mut self, base: &Uuid, dependent: &Uuid, kind: DependentKind) -> bool {
        let links = self.dependent_links_mut(kind);
        if !links.remove(base, dependent) {
            return false;
        }
        if !links.is_base(base) {
            if let Some(base_entry) = self.entries.get_mut(base) {
                if base_entry.entry_type() == kind.base_type() {
                    base_entry.set_entry_type(EntryType::Normal);
                }
            }
        }
        self.db_changed = true;
        true
    }

    fn get_dependents(&self, base: &Uuid, kind: DependentKind) -> Vec<Uuid> {
        self.dependents(base, kind)
    }

    fn dependent_map(&self, kind: DependentKind) -> DependentMap {
        self.dependent_links(kind).clone()
    }

    fn set_dependent_map(&mut self, kind: DependentKind, map: DependentMap) {
        *self.dependent_links_mut(kind) = map;
    }

    fn do_add_dependent_entries(
        &mut self,
        uuids: &[Uuid],
        reporter: Option<&mut dyn Reporter>,
        kind: DependentKind,
        via: ResolveBy,
    ) -> DependentsResult {
        self.link_dependents(uuids, reporter, kind, via)
    }

    fn undo_add_dependent_entries(&mut self, undo: DependentsUndo) {
        self.restore_dependents(undo);
    }

    fn do_move_dependent_entries(&mut self, from: &Uuid, to: &Uuid, kind: DependentKind) -> bool {
        self.move_dependents(from, to, kind)
    }

    fn do_update_password_history(
        &mut self,
        action: PwhAction,
        new_max: usize,
        saved: &mut BTreeMap<Uuid, Entry>,
    ) -> usize {
        self.apply_history_action(action, new_max, saved)
    }

    fn undo_update_password_history(&mut self, saved: &BTreeMap<Uuid, Entry>) {
        self.restore_histories(saved);
    }

    fn do_rename_group(&self, old: &str, new: &str) -> MultiCommands {
        self.plan_group_rename(old, new)
    }

    fn add_changed_nodes(&mut self, path: &str) {
        self.modified_nodes.extend(group_with_ancestors(path));
    }

    fn modified_nodes(&self) -> &BTreeSet<String> {
        &self.modified_nodes
    }

    fn set_modified_nodes(&mut self, nodes: BTreeSet<String>) {
        self.modified_nodes = nodes;
    }

    fn is_db_changed(&self) -> bool {
        self.db_changed
    }

    fn set_db_changed(&mut self, changed: bool) {
        self.db_changed = changed;
    }

    fn get_header_item(&self, ht: HeaderType) -> String {
        match ht {
            HeaderType::NdPrefs => self.prefs.to_pref_string(),
            HeaderType::Rue => self.rue.to_header_string(),
            _ => self.header.get(ht).unwrap_or_default().to_string(),
        }
    }

    fn do_change_header(&mut self, ht: HeaderType, value: &str) -> bool {
        if ht.is_side_table() {
            log::warn!("Header field {:?} is changed through its own command", ht);
            return false;
        }
        if self.header.get(ht).unwrap_or_default() == value {
            return false;
        }
        self.header.set(ht, value);
        self.db_changed = true;
        true
    }

    fn undo_change_header(&mut self, ht: HeaderType, old: &str) {
        self.header.set(ht, old);
    }

    fn set_db_preferences(&mut self, prefs: Preferences) {
        self.prefs = prefs;
        self.db_changed = true;
    }

    fn named_policies(&self) -> &BTreeMap<String, PasswordPolicy> {
        &self.named_policies
    }

    fn set_named_policies(&mut self, policies: BTreeMap<String, PasswordPolicy>) {
        self.named_policies = policies;
        self.db_changed = true;
    }

    fn empty_groups(&self) -> &BTreeSet<String> {
        &self.empty_groups
    }

    fn set_empty_groups(&mut self, groups: BTreeSet<String>) {
        self.empty_groups = groups;
        self.db_changed = true;
    }

    fn rue_list(&self) -> &RueList {
        &self.rue
    }

    fn set_rue_list(&mut self, rue: RueList) {
        self.rue = rue;
    }

    fn filters(&self) -> &FilterMap {
        &self.filters
    }

    fn set_filters(&mut self, filters: FilterMap) {
        self.filters = filters;
        self.db_changed = true;
    }

    fn update_expiry_entry(&mut self, uuid: &Uuid) {
        match self.entries.get(uuid) {
            Some(entry) => self.expired.update(entry),
            None => {
                self.expired.remove(uuid);
            }
        }
    }

    fn remove_expiry_entry(&mut self, uuid: &Uuid) {
        self.expired.remove(uuid);
    }

    fn notify_gui(&mut self, action: GuiAction, uuid: &Uuid, field: Option<FieldType>) {
        if let Some(observer) = self.observer.as_mut() {
            observer.entry_updated(action, uuid, field);
        }
    }

    fn notify_groups(&mut self, action: GuiAction, groups: &[String]) {
        if let Some(observer) = self.observer.as_mut() {
            observer.groups_updated(action, groups);
        }
    }
}
