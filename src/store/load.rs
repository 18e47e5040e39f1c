//! Populating a store from loaded records

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::filter::{parse_filters, FilterPool};
use crate::item::{Attachment, DependentKind, Entry, PwhValidation};
use crate::prefs::Preferences;

use super::alias::ResolveBy;
use super::header::{decode_policies, DbHeader, HeaderType};
use super::rue::{RueList, DEFAULT_RUE_SIZE};
use super::store::Store;

/// What happened while populating a store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub entries: usize,
    pub attachments: usize,
    pub aliases: usize,
    pub shortcuts: usize,
    /// Entries given a new UUID because theirs was already taken
    pub uuid_conflicts: usize,
    pub pwh_repaired: usize,
    pub pwh_discarded: usize,
    /// Attachment references dropped because the attachment was missing
    pub missing_attachments: usize,
    pub messages: Vec<String>,
}

impl Store {
    /// Replace the store's content with loaded records
    ///
    /// Records are inserted directly, without commands. Dependents stored
    /// with `[[uuid]]` and `[~uuid~]` passwords are linked to their bases,
    /// malformed histories are repaired or dropped and side tables are read
    /// from the header. The undo history is cleared and the store is left
    /// unchanged as far as saving is concerned.
    pub fn populate(&mut self, entries: Vec<Entry>, attachments: Vec<Attachment>, header: DbHeader) -> LoadReport {
        let mut report = LoadReport::default();
        self.clear_content();

        for att in attachments {
            if self.attachments.contains_key(&att.uuid()) {
                report.messages.push(format!("Duplicate attachment {} dropped", att.uuid()));
                continue;
            }
            self.attachments.insert(att.uuid(), att);
        }
        report.attachments = self.attachments.len();

        for mut entry in entries {
            if self.entries.contains_key(&entry.uuid()) {
                let old = entry.uuid();
                entry.create_uuid();
                report.uuid_conflicts += 1;
                report
                    .messages
                    .push(format!("Entry '{}' had duplicate UUID {}, given {}", entry.group_title(), old, entry.uuid()));
            }

            if let Some(att_uuid) = entry.attachment_ref() {
                match self.attachments.get_mut(&att_uuid) {
                    Some(att) => att.inc_ref(),
                    None => {
                        entry.set_attachment_ref(None);
                        report.missing_attachments += 1;
                    }
                }
            }

            match entry.validate_pw_history() {
                PwhValidation::Valid => {}
                PwhValidation::Repaired => report.pwh_repaired += 1,
                PwhValidation::Discarded(e) => {
                    report.pwh_discarded += 1;
                    report
                        .messages
                        .push(format!("Password history of '{}' discarded: {}", entry.group_title(), e));
                }
            }
            self.entries.insert(entry.uuid(), entry);
        }
        report.entries = self.entries.len();

        let uuids: Vec<Uuid> = self.entries.keys().copied().collect();
        for kind in [DependentKind::Alias, DependentKind::Shortcut] {
            let linked = self.link_dependents(&uuids, Some(&mut report.messages), kind, ResolveBy::Uuid).linked;
            match kind {
                DependentKind::Alias => report.aliases = linked,
                DependentKind::Shortcut => report.shortcuts = linked,
            }
        }
        report.entries = self.entries.len();

        for entry in self.entries.values() {
            self.expired.add(entry);
        }

        self.load_header(header, &mut report);

        self.modified_nodes.clear();
        self.clear_history();
        self.db_changed = false;
        log::info!(
            "Loaded {} entries ({} aliases, {} shortcuts) and {} attachments",
            report.entries,
            report.aliases,
            report.shortcuts,
            report.attachments
        );
        report
    }

    fn clear_content(&mut self) {
        self.entries.clear();
        self.attachments.clear();
        self.aliases.clear();
        self.shortcuts.clear();
        self.expired.clear();
        self.rue.clear();
        self.named_policies.clear();
        self.empty_groups.clear();
        self.filters.retain(|(pool, _), _| *pool != FilterPool::Database);
    }

    fn load_header(&mut self, mut header: DbHeader, report: &mut LoadReport) {
        if let Some(prefs) = header.take(HeaderType::NdPrefs) {
            match Preferences::from_pref_string(&prefs) {
                Ok(p) => self.prefs = p,
                Err(e) => report.messages.push(format!("Database preferences ignored: {}", e)),
            }
        }

        if let Some(rue) = header.take(HeaderType::Rue) {
            let mut list = RueList::from_header_string(&rue, DEFAULT_RUE_SIZE);
            for uuid in list.iter().copied().collect::<Vec<_>>() {
                if !self.entries.contains_key(&uuid) {
                    list.remove(&uuid);
                }
            }
            self.rue = list;
        }

        if let Some(policies) = header.take(HeaderType::PswdPolicies) {
            match decode_policies(&policies) {
                Ok(p) => self.named_policies = p,
                Err(e) => report.messages.push(format!("Named password policies ignored: {}", e)),
            }
        }

        if let Some(xml) = header.take(HeaderType::Filters) {
            match parse_filters(&xml) {
                Ok(filters) => {
                    for filter in filters {
                        self.filters.insert((FilterPool::Database, filter.name.clone()), filter);
                    }
                }
                Err(e) => report.messages.push(format!("Database filters ignored: {}", e)),
            }
        }

        let groups: BTreeSet<String> = std::mem::take(&mut header.empty_groups).into_iter().collect();
        self.empty_groups = groups;
        self.header = header;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FieldType;
    use crate::store::store::tests::test_store;

    fn entry(title: &str, password: &str) -> Entry {
        let mut e = Entry::new();
        e.set_title(title);
        e.set_password(password);
        e
    }

    #[test]
    fn test_populate_links_dependents() {
        let base = entry("Base", "secret");
        let alias = entry("Alias", &format!("[[{}]]", base.uuid().simple()));
        let target = entry("Target", "other");
        let shortcut = entry("Sc", &format!("[~{}~]", target.uuid().simple()));
        let orphan = entry("Orphan", &format!("[~{}~]", Uuid::new_v4().simple()));

        let mut store = test_store();
        let report = store.populate(
            vec![base.clone(), alias.clone(), target.clone(), shortcut.clone(), orphan.clone()],
            vec![],
            DbHeader::new(),
        );

        assert_eq!(report.aliases, 1);
        assert_eq!(report.shortcuts, 1);
        assert_eq!(report.entries, 4);
        assert_eq!(report.messages.len(), 1);
        assert!(store.get(&orphan.uuid()).is_none());
        assert!(store.get(&target.uuid()).unwrap().is_shortcut_base());
        assert!(store.get(&shortcut.uuid()).unwrap().is_shortcut());
        assert!(store.get(&alias.uuid()).unwrap().is_alias());
        assert!(store.get(&base.uuid()).unwrap().is_alias_base());
        assert_eq!(
            store.effective_field_value(&alias.uuid(), FieldType::Password).as_deref(),
            Some("secret")
        );
        assert!(!store.is_db_changed());
        assert!(!store.can_undo());
    }

    #[test]
    fn test_populate_duplicate_uuid_and_history() {
        let first = entry("One", "pw");
        let mut second = entry("Two", "pw");
        second.set_uuid(&first.uuid());
        second.set_field(FieldType::PwHistory, "garbage");

        let mut store = test_store();
        let report = store.populate(vec![first, second], vec![], DbHeader::new());
        assert_eq!(report.entries, 2);
        assert_eq!(report.uuid_conflicts, 1);
        assert_eq!(report.pwh_discarded, 1);
    }

    #[test]
    fn test_populate_reads_header() {
        let records: Vec<(u8, Vec<u8>)> = vec![
            (HeaderType::NdPrefs.code(), b"I 1 9".to_vec()),
            (HeaderType::EmptyGroup.code(), b"Empty".to_vec()),
            (HeaderType::DbName.code(), b"Home".to_vec()),
        ];
        let header = DbHeader::from_records(records.iter().map(|(c, v)| (*c, v.as_slice())));

        let mut store = test_store();
        store.populate(vec![], vec![], header);
        assert_eq!(store.preferences().pw_history_default_max, 9);
        assert!(store.empty_groups().contains("Empty"));
        assert_eq!(store.header().get(HeaderType::DbName), Some("Home"));
        assert_eq!(store.header().get(HeaderType::NdPrefs), None);
        assert!(store.header_for_save().get(HeaderType::NdPrefs).is_some());
    }

    #[test]
    fn test_populate_missing_attachment() {
        let mut e = entry("WithAtt", "pw");
        e.set_attachment_ref(Some(&Uuid::new_v4()));
        let att = Attachment::new();
        let mut shared = entry("Shared", "pw");
        shared.set_attachment_ref(Some(&att.uuid()));

        let mut store = test_store();
        let report = store.populate(vec![e, shared], vec![att.clone()], DbHeader::new());
        assert_eq!(report.missing_attachments, 1);
        assert_eq!(store.get_attachment(&att.uuid()).map(Attachment::ref_count), Some(1));
    }
}
