//! The in-memory password store
//!
//! The store owns every entry and attachment plus the side tables kept in
//! step with them. Mutations go through [`Command`](crate::command::Command)
//! objects executing against the [`CommandInterface`](super::CommandInterface)
//! the store implements; this module holds construction and read access.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;
use zeroize::Zeroizing;

use crate::command::Command;
use crate::filter::{Filter, FilterMap, FilterPool};
use crate::item::{Attachment, DependentKind, Entry, FieldType, PasswordPolicy};
use crate::prefs::Preferences;
use crate::utils::now_time;

use super::dependents::DependentMap;
use super::expired::ExpiredList;
use super::header::{encode_policies, DbHeader, HeaderType};
use super::interface::Observer;
use super::rue::RueList;

/// One item as ordered `(type, bytes)` field records
pub type RawRecords = Vec<(u8, Zeroizing<Vec<u8>>)>;

/// Main store interface
pub struct Store {
    /// All entries by UUID
    pub(crate) entries: BTreeMap<Uuid, Entry>,
    /// All attachments by UUID
    pub(crate) attachments: BTreeMap<Uuid, Attachment>,
    /// Alias bases to their aliases
    pub(crate) aliases: DependentMap,
    /// Shortcut bases to their shortcuts
    pub(crate) shortcuts: DependentMap,
    pub(crate) named_policies: BTreeMap<String, PasswordPolicy>,
    pub(crate) empty_groups: BTreeSet<String>,
    /// Group paths touched this session, for tree refresh
    pub(crate) modified_nodes: BTreeSet<String>,
    pub(crate) expired: ExpiredList,
    pub(crate) rue: RueList,
    pub(crate) filters: FilterMap,
    pub(crate) header: DbHeader,
    pub(crate) prefs: Preferences,
    pub(crate) read_only: bool,
    pub(crate) db_changed: bool,
    /// Executed commands; those at and after `undo_pos` can be redone
    pub(crate) history: Vec<Box<dyn Command>>,
    pub(crate) undo_pos: usize,
    pub(crate) observer: Option<Box<dyn Observer>>,
}

/// Comparable copy of everything a command may change
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub entries: BTreeMap<Uuid, Entry>,
    pub attachments: BTreeMap<Uuid, Attachment>,
    pub aliases: DependentMap,
    pub shortcuts: DependentMap,
    pub expired: ExpiredList,
    pub rue: RueList,
    pub modified_nodes: BTreeSet<String>,
    pub named_policies: BTreeMap<String, PasswordPolicy>,
    pub empty_groups: BTreeSet<String>,
    pub filters: FilterMap,
    pub prefs: Preferences,
    pub header: DbHeader,
    pub db_changed: bool,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("entries", &self.entries.len())
            .field("attachments", &self.attachments.len())
            .field("read_only", &self.read_only)
            .field("db_changed", &self.db_changed)
            .field("history", &self.history.len())
            .field("undo_pos", &self.undo_pos)
            .finish()
    }
}

impl Store {
    /// Create an empty store with the given preferences
    pub fn new(prefs: Preferences) -> Self {
        Self {
            entries: BTreeMap::new(),
            attachments: BTreeMap::new(),
            aliases: DependentMap::new(),
            shortcuts: DependentMap::new(),
            named_policies: BTreeMap::new(),
            empty_groups: BTreeSet::new(),
            modified_nodes: BTreeSet::new(),
            expired: ExpiredList::new(),
            rue: RueList::default(),
            filters: FilterMap::new(),
            header: DbHeader::new(),
            prefs,
            read_only: false,
            db_changed: false,
            history: Vec::new(),
            undo_pos: 0,
            observer: None,
        }
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Install the callback that receives change notifications
    pub fn set_observer(&mut self, observer: Box<dyn Observer>) {
        self.observer = Some(observer);
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.values()
    }

    pub fn get(&self, uuid: &Uuid) -> Option<&Entry> {
        self.entries.get(uuid)
    }

    pub fn get_attachment(&self, uuid: &Uuid) -> Option<&Attachment> {
        self.attachments.get(uuid)
    }

    /// Exact group/title/user lookup
    pub fn find_gtu(&self, group: &str, title: &str, user: &str) -> Option<&Entry> {
        self.entries
            .values()
            .find(|e| e.title() == title && e.group() == group && e.user() == user)
    }

    /// The base entry of a dependent
    pub fn base_of(&self, entry: &Entry) -> Option<&Entry> {
        if !entry.is_dependent() {
            return None;
        }
        entry.base_uuid().and_then(|b| self.entries.get(&b))
    }

    /// Dependents of `base` of the given kind
    pub fn dependents(&self, base: &Uuid, kind: DependentKind) -> Vec<Uuid> {
        self.dependent_links(kind).get(base)
    }

    pub(crate) fn dependent_links(&self, kind: DependentKind) -> &DependentMap {
        match kind {
            DependentKind::Alias => &self.aliases,
            DependentKind::Shortcut => &self.shortcuts,
        }
    }

    pub(crate) fn dependent_links_mut(&mut self, kind: DependentKind) -> &mut DependentMap {
        match kind {
            DependentKind::Alias => &mut self.aliases,
            DependentKind::Shortcut => &mut self.shortcuts,
        }
    }

    pub fn num_aliases(&self) -> usize {
        self.aliases.num_links()
    }

    pub fn num_shortcuts(&self) -> usize {
        self.shortcuts.num_links()
    }

    /// A field value as the user sees it, reading through to the base for
    /// dependents
    pub fn effective_field_value(&self, uuid: &Uuid, ft: FieldType) -> Option<String> {
        let entry = self.entries.get(uuid)?;
        Some(entry.effective_field_value(ft, self.base_of(entry)))
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn named_policies(&self) -> &BTreeMap<String, PasswordPolicy> {
        &self.named_policies
    }

    pub fn empty_groups(&self) -> &BTreeSet<String> {
        &self.empty_groups
    }

    pub fn filters(&self) -> &FilterMap {
        &self.filters
    }

    pub fn header(&self) -> &DbHeader {
        &self.header
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_db_changed(&self) -> bool {
        self.db_changed
    }

    /// Mark the current state as saved
    pub fn clear_db_changed(&mut self) {
        self.db_changed = false;
    }

    pub fn modified_nodes(&self) -> &BTreeSet<String> {
        &self.modified_nodes
    }

    pub fn expiry_index(&self) -> &ExpiredList {
        &self.expired
    }

    /// Entries whose password has expired
    pub fn expired_entries(&self) -> Vec<Uuid> {
        self.expired.expired(now_time())
    }

    /// Entries expiring within `days` days, already expired ones included
    pub fn expiring_entries(&self, days: i64) -> Vec<Uuid> {
        self.expired.expiring(days, now_time())
    }

    /// Entries inside the configured warning window
    pub fn entries_to_warn(&self) -> Vec<Uuid> {
        self.expiring_entries(self.prefs.pre_expiry_warn_days as i64)
    }

    pub fn rue(&self) -> &RueList {
        &self.rue
    }

    /// Record use of an entry; not undoable and not a database change
    pub fn touch_rue(&mut self, uuid: &Uuid) {
        if self.entries.contains_key(uuid) {
            self.rue.touch(uuid);
        }
    }

    /// Entries passing `filter`, in UUID order
    pub fn filter_entries(&self, filter: &Filter) -> Vec<Uuid> {
        self.entries
            .values()
            .filter(|e| {
                let attachment = e.attachment_ref().and_then(|a| self.attachments.get(&a));
                filter.matches(e, self.base_of(e), attachment)
            })
            .map(Entry::uuid)
            .collect()
    }

    pub fn find_filter(&self, pool: FilterPool, name: &str) -> Option<&Filter> {
        self.filters.get(&(pool, name.to_string()))
    }

    /// Copy of the state commands act on
    pub fn content_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            entries: self.entries.clone(),
            attachments: self.attachments.clone(),
            aliases: self.aliases.clone(),
            shortcuts: self.shortcuts.clone(),
            expired: self.expired.clone(),
            rue: self.rue.clone(),
            modified_nodes: self.modified_nodes.clone(),
            named_policies: self.named_policies.clone(),
            empty_groups: self.empty_groups.clone(),
            filters: self.filters.clone(),
            prefs: self.prefs.clone(),
            header: self.header.clone(),
            db_changed: self.db_changed,
        }
    }

    /// Header with the side tables folded back in, ready to write
    pub fn header_for_save(&self) -> DbHeader {
        let mut header = self.header.clone();
        header.set(HeaderType::NdPrefs, &self.prefs.to_pref_string());
        header.set(HeaderType::Rue, &self.rue.to_header_string());
        if self.named_policies.is_empty() {
            header.take(HeaderType::PswdPolicies);
        } else {
            header.set(HeaderType::PswdPolicies, &encode_policies(&self.named_policies));
        }

        let has_db_filters = self.filters.keys().any(|(pool, _)| *pool == FilterPool::Database);
        header.take(HeaderType::Filters);
        if has_db_filters {
            match crate::filter::write_filters(&self.filters, Some(FilterPool::Database)) {
                Ok(xml) => header.set(HeaderType::Filters, &xml),
                Err(e) => log::warn!("Database filters not saved: {}", e),
            }
        }

        header.empty_groups = self.empty_groups.iter().cloned().collect();
        header
    }

    /// Entries and attachments as raw field records, ready to write
    pub fn records_for_save(&self) -> (Vec<RawRecords>, Vec<RawRecords>) {
        let entries = self.entries.values().map(Entry::to_raw_fields).collect();
        let attachments = self.attachments.values().map(Attachment::to_raw_fields).collect();
        (entries, attachments)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::item::EntryType;

    /// Create an empty store with default preferences
    pub fn test_store() -> Store {
        Store::new(Preferences::default())
    }

    /// Insert a normal entry directly, bypassing commands
    pub fn add_plain(store: &mut Store, group: &str, title: &str, user: &str, password: &str) -> Uuid {
        let mut entry = Entry::new();
        entry.set_group(group);
        entry.set_title(title);
        entry.set_user(user);
        entry.set_password(password);
        let uuid = entry.uuid();
        store.entries.insert(uuid, entry);
        uuid
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = test_store();
        assert!(store.is_empty());
        assert!(!store.is_db_changed());
        assert!(!store.is_read_only());
        assert_eq!(store.header().hash_iterations(), 2048);
    }

    #[test]
    fn test_find_gtu() {
        let mut store = test_store();
        let uuid = add_plain(&mut store, "Mail", "Gmail", "alice", "pw");
        assert_eq!(store.find_gtu("Mail", "Gmail", "alice").map(Entry::uuid), Some(uuid));
        assert!(store.find_gtu("Mail", "Gmail", "bob").is_none());
    }

    #[test]
    fn test_effective_field_value_reads_base() {
        let mut store = test_store();
        let base = add_plain(&mut store, "G", "Base", "", "secret");
        let mut alias = Entry::new();
        alias.set_title("Alias");
        alias.make_dependent(DependentKind::Alias, &base);
        let alias_uuid = alias.uuid();
        store.entries.insert(alias_uuid, alias);

        assert_eq!(
            store.effective_field_value(&alias_uuid, FieldType::Password).as_deref(),
            Some("secret")
        );
        assert_eq!(
            store.effective_field_value(&alias_uuid, FieldType::Title).as_deref(),
            Some("Alias")
        );
        assert_eq!(store.get(&alias_uuid).map(Entry::entry_type), Some(EntryType::Alias));
    }

    #[test]
    fn test_touch_rue_ignores_unknown() {
        let mut store = test_store();
        store.touch_rue(&Uuid::new_v4());
        assert!(store.rue().is_empty());
        let uuid = add_plain(&mut store, "", "t", "", "");
        store.touch_rue(&uuid);
        assert_eq!(store.rue().len(), 1);
    }

    #[test]
    fn test_header_for_save_folds_side_tables() {
        let mut store = test_store();
        store.prefs.default_user = "eve".to_string();
        store.empty_groups.insert("Empty".to_string());
        store.named_policies.insert("P".to_string(), PasswordPolicy::default());

        let header = store.header_for_save();
        assert!(header.get(HeaderType::NdPrefs).is_some_and(|s| s.contains("eve")));
        assert!(header.get(HeaderType::PswdPolicies).is_some_and(|s| s.starts_with("01")));
        assert_eq!(header.empty_groups(), ["Empty".to_string()]);
        assert!(header.get(HeaderType::Filters).is_none());
        assert!(header.get(HeaderType::Rue).is_none());
    }

    #[test]
    fn test_expiring_entries() {
        let mut store = test_store();
        let uuid = add_plain(&mut store, "", "t", "", "");
        if let Some(e) = store.entries.get_mut(&uuid) {
            e.set_xtime(now_time() - 10);
        }
        let entry = store.entries[&uuid].clone();
        store.expired.add(&entry);
        assert_eq!(store.expired_entries(), vec![uuid]);
        assert_eq!(store.entries_to_warn(), vec![uuid]);
    }
}
