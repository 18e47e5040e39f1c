//! Commands on database-wide state: header fields, preferences and side tables

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::filter::FilterMap;
use crate::item::{Entry, PasswordPolicy, PwhAction};
use crate::prefs::Preferences;
use crate::store::{CommandInterface, GuiAction, HeaderType};
use crate::utils::rebase_group;

use super::{ChangeType, Command, CommandBase, CommandKind, DbChange, Outcome};

/// Set a plain header field such as the database name
#[derive(Debug)]
pub struct ChangeDbHeader {
    base: CommandBase,
    header_type: HeaderType,
    value: String,
    old: String,
    changed: bool,
}

impl ChangeDbHeader {
    pub fn new(header_type: HeaderType, value: &str) -> Self {
        Self {
            base: CommandBase::new(ChangeType::None),
            header_type,
            value: value.to_string(),
            old: String::new(),
            changed: false,
        }
    }
}

impl Command for ChangeDbHeader {
    fn kind(&self) -> CommandKind {
        CommandKind::ChangeDbHeader
    }

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CommandBase {
        &mut self.base
    }

    fn execute(&mut self, core: &mut dyn CommandInterface) -> Outcome {
        if !self.base.begin(core) {
            return Outcome::Done;
        }
        if self.header_type.is_side_table() {
            self.base.skip();
            return Outcome::Failed;
        }
        self.old = core.get_header_item(self.header_type);
        self.changed = core.do_change_header(self.header_type, &self.value);
        if !self.changed {
            self.base.skip();
            return Outcome::NothingToDo;
        }
        self.base.db_change = Some(DbChange::Header);
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied || !self.changed {
            return;
        }
        core.undo_change_header(self.header_type, &self.old);
        self.changed = false;
        self.base.restore(core);
    }
}

/// Replace the database preferences
#[derive(Debug)]
pub struct DbPrefs {
    base: CommandBase,
    prefs: Preferences,
    old: Option<Preferences>,
}

impl DbPrefs {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            base: CommandBase::new(ChangeType::None),
            prefs,
            old: None,
        }
    }
}

impl Command for DbPrefs {
    fn kind(&self) -> CommandKind {
        CommandKind::DbPrefs
    }

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CommandBase {
        &mut self.base
    }

    fn execute(&mut self, core: &mut dyn CommandInterface) -> Outcome {
        if !self.base.begin(core) {
            return Outcome::Done;
        }
        let old = core.preferences().clone();
        if old == self.prefs {
            self.base.skip();
            return Outcome::NothingToDo;
        }
        self.old = Some(old);
        core.set_db_preferences(self.prefs.clone());

        self.base.db_change = Some(DbChange::Preferences);
        if self.base.notify_gui {
            core.notify_groups(GuiAction::DbPreferencesChanged, &[]);
        }
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        if let Some(old) = self.old.take() {
            core.set_db_preferences(old);
        }
        self.base.restore(core);
        if self.base.notify_gui {
            core.notify_groups(GuiAction::DbPreferencesChanged, &[]);
        }
    }
}

#[derive(Debug, Clone)]
enum PolicyNamesOp {
    ReplaceAll(BTreeMap<String, PasswordPolicy>),
    Add(String, PasswordPolicy),
    Remove(String),
}

/// Change the named password policies
#[derive(Debug)]
pub struct DbPolicyNames {
    base: CommandBase,
    op: PolicyNamesOp,
    old: Option<BTreeMap<String, PasswordPolicy>>,
}

impl DbPolicyNames {
    fn with_op(op: PolicyNamesOp) -> Self {
        Self {
            base: CommandBase::new(ChangeType::None),
            op,
            old: None,
        }
    }

    pub fn replace_all(policies: BTreeMap<String, PasswordPolicy>) -> Self {
        Self::with_op(PolicyNamesOp::ReplaceAll(policies))
    }

    /// Add a policy; fails if the name is taken
    pub fn add(name: &str, policy: PasswordPolicy) -> Self {
        Self::with_op(PolicyNamesOp::Add(name.to_string(), policy))
    }

    pub fn remove(name: &str) -> Self {
        Self::with_op(PolicyNamesOp::Remove(name.to_string()))
    }
}

impl Command for DbPolicyNames {
    fn kind(&self) -> CommandKind {
        CommandKind::DbPolicyNames
    }

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CommandBase {
        &mut self.base
    }

    fn execute(&mut self, core: &mut dyn CommandInterface) -> Outcome {
        if !self.base.begin(core) {
            return Outcome::Done;
        }
        let old = core.named_policies().clone();
        let mut policies = old.clone();
        match &self.op {
            PolicyNamesOp::ReplaceAll(all) => policies = all.clone(),
            PolicyNamesOp::Add(name, policy) => {
                if policies.contains_key(name) {
                    self.base.skip();
                    return Outcome::Failed;
                }
                policies.insert(name.clone(), policy.clone());
            }
            PolicyNamesOp::Remove(name) => {
                if policies.remove(name).is_none() {
                    self.base.skip();
                    return Outcome::NothingToDo;
                }
            }
        }
        if policies == old {
            self.base.skip();
            return Outcome::NothingToDo;
        }
        self.old = Some(old);
        core.set_named_policies(policies);
        self.base.db_change = Some(DbChange::PolicyNames);
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        if let Some(old) = self.old.take() {
            core.set_named_policies(old);
        }
        self.base.restore(core);
    }
}

#[derive(Debug, Clone)]
enum EmptyGroupsOp {
    Add(String),
    Delete(String),
    Rename(String, String),
    ReplaceAll(BTreeSet<String>),
}

/// Change the set of groups kept without entries
#[derive(Debug)]
pub struct DbEmptyGroups {
    base: CommandBase,
    op: EmptyGroupsOp,
    old: Option<BTreeSet<String>>,
}

impl DbEmptyGroups {
    fn with_op(op: EmptyGroupsOp) -> Self {
        Self {
            base: CommandBase::new(ChangeType::None),
            op,
            old: None,
        }
    }

    pub fn add(group: &str) -> Self {
        Self::with_op(EmptyGroupsOp::Add(group.to_string()))
    }

    pub fn delete(group: &str) -> Self {
        Self::with_op(EmptyGroupsOp::Delete(group.to_string()))
    }

    /// Rename `old` and every empty group below it
    pub fn rename(old: &str, new: &str) -> Self {
        Self::with_op(EmptyGroupsOp::Rename(old.to_string(), new.to_string()))
    }

    pub fn replace_all(groups: BTreeSet<String>) -> Self {
        Self::with_op(EmptyGroupsOp::ReplaceAll(groups))
    }
}

impl Command for DbEmptyGroups {
    fn kind(&self) -> CommandKind {
        CommandKind::DbEmptyGroups
    }

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CommandBase {
        &mut self.base
    }

    fn execute(&mut self, core: &mut dyn CommandInterface) -> Outcome {
        if !self.base.begin(core) {
            return Outcome::Done;
        }
        let old = core.empty_groups().clone();
        let groups: BTreeSet<String> = match &self.op {
            EmptyGroupsOp::Add(group) => old.iter().cloned().chain([group.clone()]).collect(),
            EmptyGroupsOp::Delete(group) => old.iter().filter(|g| *g != group).cloned().collect(),
            EmptyGroupsOp::Rename(from, to) => old
                .iter()
                .map(|g| rebase_group(g, from, to).unwrap_or_else(|| g.clone()))
                .collect(),
            EmptyGroupsOp::ReplaceAll(all) => all.clone(),
        };
        if groups == old {
            self.base.skip();
            return Outcome::NothingToDo;
        }
        self.old = Some(old);
        core.set_empty_groups(groups);

        self.base.db_change = Some(DbChange::EmptyGroups);
        if self.base.notify_gui {
            core.notify_groups(GuiAction::RefreshGroups, &[]);
        }
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        if let Some(old) = self.old.take() {
            core.set_empty_groups(old);
        }
        self.base.restore(core);
        if self.base.notify_gui {
            core.notify_groups(GuiAction::RefreshGroups, &[]);
        }
    }
}

/// Replace the stored filters
#[derive(Debug)]
pub struct DbFilters {
    base: CommandBase,
    filters: FilterMap,
    old: Option<FilterMap>,
}

impl DbFilters {
    pub fn new(filters: FilterMap) -> Self {
        Self {
            base: CommandBase::new(ChangeType::None),
            filters,
            old: None,
        }
    }
}

impl Command for DbFilters {
    fn kind(&self) -> CommandKind {
        CommandKind::DbFilters
    }

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CommandBase {
        &mut self.base
    }

    fn execute(&mut self, core: &mut dyn CommandInterface) -> Outcome {
        if !self.base.begin(core) {
            return Outcome::Done;
        }
        let old = core.filters().clone();
        if old == self.filters {
            self.base.skip();
            return Outcome::NothingToDo;
        }
        self.old = Some(old);
        core.set_filters(self.filters.clone());
        self.base.db_change = Some(DbChange::Filters);
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        if let Some(old) = self.old.take() {
            core.set_filters(old);
        }
        self.base.restore(core);
    }
}

/// Apply a history action to every entry that keeps its own history
#[derive(Debug)]
pub struct UpdatePasswordHistory {
    base: CommandBase,
    action: PwhAction,
    new_max: usize,
    saved: BTreeMap<Uuid, Entry>,
    changed: usize,
}

impl UpdatePasswordHistory {
    pub fn new(action: PwhAction, new_max: usize) -> Self {
        Self {
            base: CommandBase::new(ChangeType::Db),
            action,
            new_max,
            saved: BTreeMap::new(),
            changed: 0,
        }
    }

    /// Entries changed by the last execute
    pub fn num_changed(&self) -> usize {
        self.changed
    }
}

impl Command for UpdatePasswordHistory {
    fn kind(&self) -> CommandKind {
        CommandKind::UpdatePasswordHistory
    }

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CommandBase {
        &mut self.base
    }

    fn execute(&mut self, core: &mut dyn CommandInterface) -> Outcome {
        if !self.base.begin(core) {
            return Outcome::Done;
        }
        self.saved.clear();
        self.changed = core.do_update_password_history(self.action, self.new_max, &mut self.saved);
        if self.changed == 0 {
            self.base.skip();
            return Outcome::NothingToDo;
        }
        self.base.db_change = Some(DbChange::PasswordHistory);
        if self.base.notify_gui {
            core.notify_groups(GuiAction::PwhChangedInDb, &[]);
        }
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        core.undo_update_password_history(&self.saved);
        self.base.restore(core);
        if self.base.notify_gui {
            core.notify_groups(GuiAction::PwhChangedInDb, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, FilterPool};
    use crate::store::store::tests::{add_plain, test_store};

    #[test]
    fn test_change_header() {
        let mut store = test_store();
        assert_eq!(store.execute(ChangeDbHeader::new(HeaderType::DbName, "Vault")), Outcome::Done);
        assert_eq!(
            store.execute(ChangeDbHeader::new(HeaderType::DbName, "Vault")),
            Outcome::NothingToDo
        );
        assert_eq!(store.execute(ChangeDbHeader::new(HeaderType::Filters, "x")), Outcome::Failed);

        store.undo();
        store.undo();
        assert_eq!(store.header().get(HeaderType::DbName), Some("Vault"));
        store.undo();
        assert_eq!(store.header().get(HeaderType::DbName), None);
        assert!(!store.is_db_changed());
    }

    #[test]
    fn test_db_prefs() {
        let mut store = test_store();
        let mut prefs = store.preferences().clone();
        prefs.pw_history_default_max = 7;

        store.execute(DbPrefs::new(prefs.clone()));
        assert_eq!(store.preferences(), &prefs);
        assert_eq!(store.execute(DbPrefs::new(prefs)), Outcome::NothingToDo);
        store.undo();
        store.undo();
        assert_eq!(store.preferences().pw_history_default_max, 3);
    }

    #[test]
    fn test_policy_names() {
        let mut store = test_store();
        let policy = PasswordPolicy::default();

        assert_eq!(store.execute(DbPolicyNames::add("Web", policy.clone())), Outcome::Done);
        assert_eq!(store.execute(DbPolicyNames::add("Web", policy)), Outcome::Failed);
        assert_eq!(store.execute(DbPolicyNames::remove("Other")), Outcome::NothingToDo);
        assert!(store.named_policies().contains_key("Web"));

        assert_eq!(store.execute(DbPolicyNames::remove("Web")), Outcome::Done);
        assert!(store.named_policies().is_empty());
        store.undo();
        assert!(store.named_policies().contains_key("Web"));
    }

    #[test]
    fn test_empty_groups() {
        let mut store = test_store();
        store.execute(DbEmptyGroups::add("A"));
        store.execute(DbEmptyGroups::add("A.B"));
        store.execute(DbEmptyGroups::rename("A", "Z"));
        let groups: Vec<&String> = store.empty_groups().iter().collect();
        assert_eq!(groups, vec!["Z", "Z.B"]);

        store.undo();
        assert!(store.empty_groups().contains("A.B"));
        assert_eq!(store.execute(DbEmptyGroups::delete("Missing")), Outcome::NothingToDo);
        store.execute(DbEmptyGroups::replace_all(BTreeSet::new()));
        assert!(store.empty_groups().is_empty());
    }

    #[test]
    fn test_db_filters() {
        let mut store = test_store();
        let mut filters = store.filters().clone();
        filters.insert((FilterPool::Database, "f".to_string()), Filter::new("f"));

        store.execute(DbFilters::new(filters));
        assert!(store.find_filter(FilterPool::Database, "f").is_some());
        store.undo();
        assert!(store.find_filter(FilterPool::Database, "f").is_none());
    }

    #[test]
    fn test_update_password_history() {
        let mut store = test_store();
        let uuid = add_plain(&mut store, "", "t", "", "pw");
        store.entries.get_mut(&uuid).unwrap().set_field(
            crate::item::FieldType::PwHistory,
            "10301499602d00003abc",
        );
        let before = store.content_snapshot();

        assert_eq!(store.execute(UpdatePasswordHistory::new(PwhAction::Clear, 0)), Outcome::Done);
        assert_eq!(store.get(&uuid).unwrap().previous_password(), None);
        store.undo();
        assert_eq!(store.content_snapshot(), before);
        store.redo();
        assert_eq!(
            store.execute(UpdatePasswordHistory::new(PwhAction::Clear, 0)),
            Outcome::NothingToDo
        );
    }
}
