//! Commands on alias and shortcut links

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::item::{DependentKind, Entry};
use crate::store::{CommandInterface, DependentMap, DependentsUndo, GuiAction, ResolveBy};

use super::{ChangeType, Command, CommandBase, CommandKind, DbChange, Outcome};

/// Link one dependent to a base
#[derive(Debug)]
pub struct AddDependentEntry {
    base: CommandBase,
    base_uuid: Uuid,
    dependent: Uuid,
    dependent_kind: DependentKind,
    saved_base: Option<Entry>,
    inserted: bool,
}

impl AddDependentEntry {
    pub fn new(base: &Uuid, dependent: &Uuid, kind: DependentKind) -> Self {
        Self {
            base: CommandBase::new(ChangeType::Db),
            base_uuid: *base,
            dependent: *dependent,
            dependent_kind: kind,
            saved_base: None,
            inserted: false,
        }
    }
}

impl Command for AddDependentEntry {
    fn kind(&self) -> CommandKind {
        CommandKind::AddDependentEntry
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
        let Some(base_entry) = core.find(&self.base_uuid).cloned() else {
            self.base.skip();
            return Outcome::Failed;
        };
        self.inserted = !core
            .get_dependents(&self.base_uuid, self.dependent_kind)
            .contains(&self.dependent);
        self.saved_base = Some(base_entry);
        core.do_add_dependent_entry(&self.base_uuid, &self.dependent, self.dependent_kind);

        self.base.db_change = Some(DbChange::Entries);
        if self.base.notify_gui {
            core.notify_gui(GuiAction::RefreshEntry, &self.base_uuid, None);
        }
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        if self.inserted {
            core.do_remove_dependent_entry(&self.base_uuid, &self.dependent, self.dependent_kind);
        }
        if let Some(saved) = self.saved_base.take() {
            core.do_replace_entry(&self.base_uuid, saved);
        }
        self.base.restore(core);
        if self.base.notify_gui {
            core.notify_gui(GuiAction::RefreshEntry, &self.base_uuid, None);
        }
    }
}

/// Unlink one dependent from its base
#[derive(Debug)]
pub struct RemoveDependentEntry {
    base: CommandBase,
    base_uuid: Uuid,
    dependent: Uuid,
    dependent_kind: DependentKind,
    saved_base: Option<Entry>,
}

impl RemoveDependentEntry {
    pub fn new(base: &Uuid, dependent: &Uuid, kind: DependentKind) -> Self {
        Self {
            base: CommandBase::new(ChangeType::Db),
            base_uuid: *base,
            dependent: *dependent,
            dependent_kind: kind,
            saved_base: None,
        }
    }
}

impl Command for RemoveDependentEntry {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveDependentEntry
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
        let saved = core.find(&self.base_uuid).cloned();
        if !core.do_remove_dependent_entry(&self.base_uuid, &self.dependent, self.dependent_kind) {
            self.base.skip();
            return Outcome::NothingToDo;
        }
        self.saved_base = saved;

        self.base.db_change = Some(DbChange::Entries);
        if self.base.notify_gui {
            core.notify_gui(GuiAction::RefreshEntry, &self.base_uuid, None);
        }
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        core.do_add_dependent_entry(&self.base_uuid, &self.dependent, self.dependent_kind);
        if let Some(saved) = self.saved_base.take() {
            core.do_replace_entry(&self.base_uuid, saved);
        }
        self.base.restore(core);
        if self.base.notify_gui {
            core.notify_gui(GuiAction::RefreshEntry, &self.base_uuid, None);
        }
    }
}

/// Link many candidates to the bases their passwords name
///
/// Failures are collected as messages. Shortcuts that cannot be linked are
/// deleted; undo brings them back.
#[derive(Debug)]
pub struct AddDependentEntries {
    base: CommandBase,
    uuids: Vec<Uuid>,
    dependent_kind: DependentKind,
    via: ResolveBy,
    linked: usize,
    messages: Vec<String>,
    saved: Option<DependentsUndo>,
}

impl AddDependentEntries {
    pub fn new(uuids: Vec<Uuid>, kind: DependentKind, via: ResolveBy) -> Self {
        Self {
            base: CommandBase::new(ChangeType::Db),
            uuids,
            dependent_kind: kind,
            via,
            linked: 0,
            messages: Vec::new(),
            saved: None,
        }
    }

    /// Number linked by the last execute
    pub fn linked(&self) -> usize {
        self.linked
    }

    /// Problems reported by the last execute
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl Command for AddDependentEntries {
    fn kind(&self) -> CommandKind {
        CommandKind::AddDependentEntries
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
        self.messages.clear();
        let result = core.do_add_dependent_entries(&self.uuids, Some(&mut self.messages), self.dependent_kind, self.via);
        self.linked = result.linked;
        let changed = result.linked > 0 || result.undo.deleted().next().is_some();
        self.saved = Some(result.undo);

        if !changed {
            self.base.db_change = None;
            return Outcome::NothingToDo;
        }
        self.base.db_change = Some(DbChange::Entries);
        if self.base.notify_gui {
            core.notify_groups(GuiAction::RefreshBothViews, &[]);
        }
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        if let Some(saved) = self.saved.take() {
            core.undo_add_dependent_entries(saved);
        }
        self.base.restore(core);
        if self.base.notify_gui && self.base.db_change.is_some() {
            core.notify_groups(GuiAction::RefreshBothViews, &[]);
        }
    }
}

/// Move every dependent of one base to another
#[derive(Debug)]
pub struct MoveDependentEntries {
    base: CommandBase,
    from: Uuid,
    to: Uuid,
    dependent_kind: DependentKind,
    saved_map: Option<DependentMap>,
    saved_entries: BTreeMap<Uuid, Entry>,
}

impl MoveDependentEntries {
    pub fn new(from: &Uuid, to: &Uuid, kind: DependentKind) -> Self {
        Self {
            base: CommandBase::new(ChangeType::Db),
            from: *from,
            to: *to,
            dependent_kind: kind,
            saved_map: None,
            saved_entries: BTreeMap::new(),
        }
    }
}

impl Command for MoveDependentEntries {
    fn kind(&self) -> CommandKind {
        CommandKind::MoveDependentEntries
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
        let map = core.dependent_map(self.dependent_kind);
        let mut saved = BTreeMap::new();
        let touched = core
            .get_dependents(&self.from, self.dependent_kind)
            .into_iter()
            .chain([self.from, self.to]);
        for uuid in touched {
            if let Some(entry) = core.find(&uuid) {
                saved.insert(uuid, entry.clone());
            }
        }

        if !core.do_move_dependent_entries(&self.from, &self.to, self.dependent_kind) {
            self.base.skip();
            return Outcome::NothingToDo;
        }
        self.saved_map = Some(map);
        self.saved_entries = saved;

        self.base.db_change = Some(DbChange::Entries);
        if self.base.notify_gui {
            core.notify_groups(GuiAction::RefreshBothViews, &[]);
        }
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        if let Some(map) = self.saved_map.take() {
            core.set_dependent_map(self.dependent_kind, map);
        }
        for (uuid, entry) in std::mem::take(&mut self.saved_entries) {
            core.do_replace_entry(&uuid, entry);
        }
        self.base.restore(core);
        if self.base.notify_gui {
            core.notify_groups(GuiAction::RefreshBothViews, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{AddEntry, MultiCommands};
    use crate::item::FieldType;
    use crate::store::store::tests::{add_plain, test_store};

    fn candidate(title: &str, password: &str) -> Entry {
        let mut e = Entry::new();
        e.set_title(title);
        e.set_password(password);
        e
    }

    #[test]
    fn test_add_remove_single_link() {
        let mut store = test_store();
        let base = add_plain(&mut store, "", "base", "", "pw");
        let dep = Uuid::new_v4();
        let before = store.content_snapshot();

        store.execute(AddDependentEntry::new(&base, &dep, DependentKind::Shortcut));
        assert!(store.get(&base).unwrap().is_shortcut_base());
        store.undo();
        assert_eq!(store.content_snapshot(), before);

        store.redo();
        assert_eq!(
            store.execute(RemoveDependentEntry::new(&base, &dep, DependentKind::Shortcut)),
            Outcome::Done
        );
        assert!(store.get(&base).unwrap().is_normal());
        assert_eq!(
            store.execute(RemoveDependentEntry::new(&base, &dep, DependentKind::Shortcut)),
            Outcome::NothingToDo
        );
        store.undo();
        store.undo();
        assert!(store.get(&base).unwrap().is_shortcut_base());
    }

    #[test]
    fn test_add_dependent_entries_by_name() {
        let mut store = test_store();
        add_plain(&mut store, "Web", "Mail", "me", "secret");
        let alias = candidate("MailAlias", "[[Web:Mail:me]]");
        let broken = candidate("Broken", "[[Nowhere]]");
        let ids = vec![alias.uuid(), broken.uuid()];

        let mut multi = MultiCommands::new();
        multi.add(AddEntry::new(alias.clone()));
        multi.add(AddEntry::new(broken.clone()));
        multi.add(AddDependentEntries::new(ids, DependentKind::Alias, ResolveBy::Gtu));
        store.execute(multi);

        assert!(store.get(&alias.uuid()).unwrap().is_alias());
        assert!(store.get(&broken.uuid()).unwrap().is_normal());
        assert_eq!(
            store.effective_field_value(&alias.uuid(), FieldType::Password).as_deref(),
            Some("secret")
        );
        let multi = store.last_command().and_then(|c| c.downcast_ref::<MultiCommands>()).unwrap();
        let link = multi
            .find_command(CommandKind::AddDependentEntries)
            .and_then(|c| c.downcast_ref::<AddDependentEntries>())
            .unwrap();
        assert_eq!(link.linked(), 1);
        assert_eq!(link.messages().len(), 1);

        store.undo();
        assert_eq!(store.len(), 1);
        assert_eq!(store.num_aliases(), 0);
    }

    #[test]
    fn test_unresolved_shortcut_deleted_and_restored() {
        let mut store = test_store();
        let orphan = candidate("Orphan", "[~Missing~]");
        let uuid = orphan.uuid();
        store.execute(AddEntry::new(orphan));
        let before = store.content_snapshot();

        assert_eq!(
            store.execute(AddDependentEntries::new(vec![uuid], DependentKind::Shortcut, ResolveBy::Gtu)),
            Outcome::Done
        );
        assert!(store.get(&uuid).is_none());
        store.undo();
        assert_eq!(store.content_snapshot(), before);
    }

    #[test]
    fn test_move_dependents() {
        let mut store = test_store();
        let from = add_plain(&mut store, "", "from", "", "one");
        let to = add_plain(&mut store, "", "to", "", "two");
        let mut alias = candidate("a", "");
        alias.make_dependent(DependentKind::Alias, &from);
        let alias_uuid = alias.uuid();
        store.execute(AddEntry::new(alias));
        let before = store.content_snapshot();

        assert_eq!(store.execute(MoveDependentEntries::new(&from, &to, DependentKind::Alias)), Outcome::Done);
        assert!(store.get(&from).unwrap().is_normal());
        assert!(store.get(&to).unwrap().is_alias_base());
        assert_eq!(store.get(&alias_uuid).and_then(Entry::base_uuid), Some(to));

        store.undo();
        assert_eq!(store.content_snapshot(), before);
        assert_eq!(
            store.execute(MoveDependentEntries::new(&from, &from, DependentKind::Alias)),
            Outcome::NothingToDo
        );
    }
}
