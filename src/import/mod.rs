//! Turning plain parsed records into commands
//!
//! An importer (XML, CSV, another store) produces [`ImportedEntry`] values
//! holding nothing but strings. [`import_entries`] checks them against the
//! store and builds one [`MultiCommands`] that adds them all and then links
//! any that name a base entry in their password. Executing the plan is left
//! to the caller, so a whole import is a single undo step.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::command::{AddDependentEntries, AddEntry, GuiWhen, MultiCommands, UpdateGui};
use crate::item::{DependentKind, Entry, FieldType, PasswordPolicy, PwHistory};
use crate::report::{self, Reporter};
use crate::store::{parse_alias_password, GuiAction, ResolveBy, Store};

/// One record as read by an importer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedEntry {
    /// Kept when it does not clash with an existing entry
    pub uuid: Option<Uuid>,
    pub group: String,
    pub title: String,
    pub user: String,
    pub password: String,
    /// Any other fields, in the text form of [`Entry::field_value`]
    pub fields: Vec<(FieldType, String)>,
    /// Serialized password history
    pub pw_history: String,
    /// Serialized inline policy
    pub policy: String,
    pub policy_symbols: String,
    pub policy_name: String,
}

/// Counts from building an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub added: usize,
    pub skipped: usize,
    /// Entries whose title was changed to avoid a group/title/user clash
    pub renamed: usize,
    /// Malformed histories that were dropped
    pub pwh_errors: usize,
    /// Entries queued for linking as aliases
    pub aliases: usize,
    /// Entries queued for linking as shortcuts
    pub shortcuts: usize,
}

/// Commands that perform an import, with what was found building them
#[derive(Debug)]
pub struct ImportPlan {
    pub commands: MultiCommands,
    pub stats: ImportStats,
}

/// Build the commands importing `records` into `store`
///
/// Records without a title are skipped. A record whose group, title and
/// user match an existing or earlier imported entry gets a numbered title.
/// Problems with individual records are reported and never stop the rest.
pub fn import_entries(store: &Store, records: Vec<ImportedEntry>, reporter: Option<&mut dyn Reporter>) -> ImportPlan {
    let mut reporter = reporter;
    let mut stats = ImportStats::default();
    let mut commands = MultiCommands::new();
    let mut taken: BTreeSet<(String, String, String)> = BTreeSet::new();
    let mut used_uuids: BTreeSet<Uuid> = BTreeSet::new();
    let mut aliases = Vec::new();
    let mut shortcuts = Vec::new();

    for (index, record) in records.into_iter().enumerate() {
        if record.title.is_empty() {
            stats.skipped += 1;
            report::report(&mut reporter, &format!("Record {} skipped: it has no title", index + 1));
            continue;
        }

        let mut entry = Entry::new();
        if let Some(uuid) = record.uuid {
            if store.get(&uuid).is_none() && !used_uuids.contains(&uuid) {
                entry.set_uuid(&uuid);
            }
        }
        used_uuids.insert(entry.uuid());

        for (ft, value) in &record.fields {
            if matches!(ft, FieldType::Uuid | FieldType::BaseUuid | FieldType::GroupTitle) {
                continue;
            }
            if !entry.set_field_value(*ft, value) {
                report::report(
                    &mut reporter,
                    &format!("'{}': ignored bad value for {}", record.title, ft.name()),
                );
            }
        }

        let title = unique_title(store, &taken, &record.group, &record.title, &record.user);
        if title != record.title {
            stats.renamed += 1;
            report::report(
                &mut reporter,
                &format!("'{}' already exists in '{}', imported as '{}'", record.title, record.group, title),
            );
        }
        taken.insert((record.group.clone(), title.clone(), record.user.clone()));

        entry.set_group(&record.group);
        entry.set_title(&title);
        entry.set_user(&record.user);
        entry.set_password(&record.password);

        if !record.pw_history.is_empty() {
            match PwHistory::parse(&record.pw_history) {
                Ok(history) => entry.set_pw_history(&history),
                Err(e) => {
                    stats.pwh_errors += 1;
                    entry.clear_field(FieldType::PwHistory);
                    report::report(&mut reporter, &format!("'{}': password history dropped: {}", title, e));
                }
            }
        }
        if !record.policy.is_empty() {
            match PasswordPolicy::parse(&record.policy, &record.policy_symbols) {
                Ok(policy) => entry.set_policy(Some(&policy)),
                Err(e) => report::report(&mut reporter, &format!("'{}': policy ignored: {}", title, e)),
            }
        }
        if !record.policy_name.is_empty() {
            entry.set_policy_name(&record.policy_name);
        }

        match dependent_kind_of(&record.password) {
            Some(DependentKind::Alias) => aliases.push(entry.uuid()),
            Some(DependentKind::Shortcut) => shortcuts.push(entry.uuid()),
            None => {}
        }
        commands.add(AddEntry::new(entry));
        stats.added += 1;
    }

    stats.aliases = aliases.len();
    stats.shortcuts = shortcuts.len();
    if !aliases.is_empty() {
        commands.add(AddDependentEntries::new(aliases, DependentKind::Alias, ResolveBy::Gtu));
    }
    if !shortcuts.is_empty() {
        commands.add(AddDependentEntries::new(shortcuts, DependentKind::Shortcut, ResolveBy::Gtu));
    }
    if stats.added > 0 {
        commands.add(UpdateGui::groups(GuiAction::RefreshBothViews, GuiWhen::Always));
    }

    log::info!(
        "Import planned: {} added, {} skipped, {} renamed, {} history errors",
        stats.added,
        stats.skipped,
        stats.renamed,
        stats.pwh_errors
    );
    ImportPlan { commands, stats }
}

/// Which kind of dependent a password asks to become, if any
fn dependent_kind_of(password: &str) -> Option<DependentKind> {
    parse_alias_password(password)?;
    if password.starts_with("[~") && password.ends_with("~]") {
        Some(DependentKind::Shortcut)
    } else {
        Some(DependentKind::Alias)
    }
}

fn unique_title(
    store: &Store,
    taken: &BTreeSet<(String, String, String)>,
    group: &str,
    title: &str,
    user: &str,
) -> String {
    let clashes = |t: &str| {
        store.find_gtu(group, t, user).is_some()
            || taken.contains(&(group.to_string(), t.to_string(), user.to_string()))
    };
    if !clashes(title) {
        return title.to_string();
    }
    (1..)
        .map(|n| format!("{} ({})", title, n))
        .find(|t| !clashes(t))
        .unwrap_or_else(|| title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::store::tests::{add_plain, test_store};

    fn record(group: &str, title: &str, user: &str, password: &str) -> ImportedEntry {
        ImportedEntry {
            group: group.to_string(),
            title: title.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_dependent_kind_of() {
        assert_eq!(dependent_kind_of("[G:T]"), Some(DependentKind::Alias));
        assert_eq!(dependent_kind_of("[[T]]"), Some(DependentKind::Alias));
        assert_eq!(dependent_kind_of("[~T~]"), Some(DependentKind::Shortcut));
        assert_eq!(dependent_kind_of("plain"), None);
        assert_eq!(dependent_kind_of("[]"), None);
    }

    #[test]
    fn test_import_renames_and_links() {
        let mut store = test_store();
        let base = add_plain(&mut store, "Web", "Mail", "me", "secret");

        let mut bad_history = record("Web", "Forum", "", "pw");
        bad_history.pw_history = "zz".to_string();
        let records = vec![
            record("Web", "Mail", "me", "other"),
            record("Web", "Mail", "me", "third"),
            record("", "", "", "no title"),
            record("Links", "MailAlias", "", "[Web:Mail:me]"),
            bad_history,
        ];

        let mut lines: Vec<String> = Vec::new();
        let plan = import_entries(&store, records, Some(&mut lines));
        assert_eq!(
            plan.stats,
            ImportStats {
                added: 4,
                skipped: 1,
                renamed: 2,
                pwh_errors: 1,
                aliases: 1,
                shortcuts: 0,
            }
        );
        assert_eq!(lines.len(), 4);

        store.execute(plan.commands);
        assert_eq!(store.len(), 5);
        assert!(store.find_gtu("Web", "Mail (1)", "me").is_some());
        assert!(store.find_gtu("Web", "Mail (2)", "me").is_some());
        let alias = store.find_gtu("Links", "MailAlias", "").unwrap();
        assert_eq!(alias.base_uuid(), Some(base));

        store.undo();
        assert_eq!(store.len(), 1);
        assert!(store.get(&base).unwrap().is_normal());
    }

    #[test]
    fn test_import_keeps_free_uuid() {
        let mut store = test_store();
        let existing = add_plain(&mut store, "", "a", "", "");
        let free = Uuid::new_v4();
        let mut first = record("", "x", "", "");
        first.uuid = Some(free);
        let mut second = record("", "y", "", "");
        second.uuid = Some(existing);

        let plan = import_entries(&store, vec![first, second], None);
        store.execute(plan.commands);
        assert_eq!(store.get(&free).unwrap().title(), "x");
        assert_eq!(store.get(&existing).unwrap().title(), "a");
        assert!(store.find_gtu("", "y", "").is_some());
    }
}
