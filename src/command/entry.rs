//! Commands on single entries

use std::fmt;

use uuid::Uuid;
use zeroize::Zeroizing;

use crate::item::{Attachment, DependentKind, Entry, EntryStatus, FieldType, PwhError, PwhValidation};
use crate::store::{CommandInterface, GuiAction, RueList};
use crate::utils::now_time;

use super::{ChangeType, Command, CommandBase, CommandKind, DbChange, Outcome};

/// The base link a dependent entry declares
fn link_of(entry: &Entry) -> Option<(Uuid, DependentKind)> {
    let kind = entry.entry_type().dependent_kind().filter(|_| entry.is_dependent())?;
    Some((entry.base_uuid()?, kind))
}

/// Replace `from` with `to`, moving the dependent link if it changed
fn swap_entry(core: &mut dyn CommandInterface, from: &Entry, to: Entry) {
    let uuid = to.uuid();
    let from_link = link_of(from);
    let to_link = link_of(&to);
    let relink = from_link != to_link;

    if relink {
        if let Some((base, kind)) = from_link {
            core.do_remove_dependent_entry(&base, &uuid, kind);
        }
    }
    core.do_replace_entry(&uuid, to);
    if relink {
        if let Some((base, kind)) = to_link {
            core.do_add_dependent_entry(&base, &uuid, kind);
        }
    }
}

/// Add a new entry, linking it to its base if it is a dependent
#[derive(Debug)]
pub struct AddEntry {
    base: CommandBase,
    entry: Entry,
    attachment: Option<Attachment>,
}

impl AddEntry {
    pub fn new(entry: Entry) -> Self {
        Self {
            base: CommandBase::new(ChangeType::Db),
            entry,
            attachment: None,
        }
    }

    /// Add an entry together with the attachment it refers to
    pub fn with_attachment(mut entry: Entry, attachment: Attachment) -> Self {
        entry.set_attachment_ref(Some(&attachment.uuid()));
        Self {
            base: CommandBase::new(ChangeType::Db),
            entry,
            attachment: Some(attachment),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.entry.uuid()
    }
}

impl Command for AddEntry {
    fn kind(&self) -> CommandKind {
        CommandKind::AddEntry
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
        let mut entry = self.entry.clone();
        entry.set_status(EntryStatus::Added);
        let uuid = entry.uuid();
        let link = link_of(&entry);

        if !core.do_add_entry(entry, self.attachment.clone()) {
            self.base.skip();
            return Outcome::Failed;
        }
        if let Some((base, kind)) = link {
            if core.find(&base).is_some() {
                core.do_add_dependent_entry(&base, &uuid, kind);
            } else {
                log::warn!("New {} {} refers to missing base {}", kind.name(), uuid, base);
            }
        }

        self.base.db_change = Some(DbChange::Entries);
        if self.base.notify_gui {
            core.notify_gui(GuiAction::AddEntry, &uuid, None);
        }
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        let mut delete = DeleteEntry::new(&self.entry.uuid());
        delete.base.in_multi = true;
        delete.base.notify_gui = false;
        delete.execute(core);

        self.base.restore(core);
        if self.base.notify_gui {
            core.notify_gui(GuiAction::DeleteEntry, &self.entry.uuid(), None);
        }
    }
}

/// Delete an entry
///
/// Deleting a base also deletes all of its dependents. Deleting a
/// dependent unlinks it first, which turns a base left without
/// dependents back into a normal entry.
#[derive(Debug)]
pub struct DeleteEntry {
    base: CommandBase,
    uuid: Uuid,
    /// The entry as it was before anything was removed
    saved: Option<(Entry, Option<Attachment>)>,
    dependents: Vec<(Entry, Option<Attachment>)>,
    dependent_kind: Option<DependentKind>,
    /// Base this entry was unlinked from
    link: Option<(Uuid, DependentKind)>,
    /// Recently used list before the delete dropped anything from it
    saved_rue: Option<RueList>,
}

impl DeleteEntry {
    pub fn new(uuid: &Uuid) -> Self {
        Self {
            base: CommandBase::new(ChangeType::Db),
            uuid: *uuid,
            saved: None,
            dependents: Vec::new(),
            dependent_kind: None,
            link: None,
            saved_rue: None,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Number of dependents removed along with a base
    pub fn num_dependents(&self) -> usize {
        self.dependents.len()
    }
}

impl Command for DeleteEntry {
    fn kind(&self) -> CommandKind {
        CommandKind::DeleteEntry
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
        let Some(entry) = core.find(&self.uuid).cloned() else {
            self.base.skip();
            return Outcome::NothingToDo;
        };
        self.dependents.clear();
        self.dependent_kind = None;
        self.link = None;
        self.saved_rue = Some(core.rue_list().clone());

        if entry.is_base() {
            if let Some(kind) = entry.entry_type().dependent_kind() {
                self.dependent_kind = Some(kind);
                for dep in core.get_dependents(&self.uuid, kind) {
                    core.do_remove_dependent_entry(&self.uuid, &dep, kind);
                    if let Some(removed) = core.do_delete_entry(&dep) {
                        self.dependents.push(removed);
                        if self.base.notify_gui {
                            core.notify_gui(GuiAction::DeleteEntry, &dep, None);
                        }
                    }
                }
            }
        }

        if let Some((base, kind)) = link_of(&entry) {
            if core.do_remove_dependent_entry(&base, &self.uuid, kind) {
                self.link = Some((base, kind));
            }
        }

        let attachment = core.do_delete_entry(&self.uuid).and_then(|(_, att)| att);
        self.saved = Some((entry, attachment));

        self.base.db_change = Some(DbChange::Entries);
        if self.base.notify_gui {
            core.notify_gui(GuiAction::DeleteEntry, &self.uuid, None);
        }
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        if let Some((entry, attachment)) = self.saved.clone() {
            if core.find(&self.uuid).is_none() {
                core.do_add_entry(entry, attachment);
            }
        }
        if let Some(kind) = self.dependent_kind {
            for (dep, attachment) in self.dependents.iter().cloned() {
                let dep_uuid = dep.uuid();
                if core.find(&dep_uuid).is_none() {
                    core.do_add_entry(dep, attachment);
                }
                core.do_add_dependent_entry(&self.uuid, &dep_uuid, kind);
                if self.base.notify_gui {
                    core.notify_gui(GuiAction::AddEntry, &dep_uuid, None);
                }
            }
        }
        if let Some((base, kind)) = self.link {
            if core.find(&base).is_some() {
                core.do_add_dependent_entry(&base, &self.uuid, kind);
            }
        }
        if let Some(rue) = self.saved_rue.clone() {
            core.set_rue_list(rue);
        }

        self.base.restore(core);
        if self.base.notify_gui {
            core.notify_gui(GuiAction::AddEntry, &self.uuid, None);
        }
    }
}

/// Replace an entry with an edited copy of itself
///
/// The copy keeps the entry's UUID. Changing a dependent's base moves its
/// link.
#[derive(Debug)]
pub struct EditEntry {
    base: CommandBase,
    old: Entry,
    new: Entry,
    /// The value actually stored by the last execute
    applied_new: Option<Entry>,
}

impl EditEntry {
    pub fn new(old: &Entry, new: Entry) -> Self {
        Self {
            base: CommandBase::new(ChangeType::Db),
            old: old.clone(),
            new,
            applied_new: None,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.new.uuid()
    }
}

impl Command for EditEntry {
    fn kind(&self) -> CommandKind {
        CommandKind::EditEntry
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
        let uuid = self.new.uuid();
        if uuid != self.old.uuid() {
            log::error!("Edit of {} supplies a different UUID {}", self.old.uuid(), uuid);
            self.base.skip();
            return Outcome::Failed;
        }
        let Some(current) = core.find(&uuid).cloned() else {
            self.base.skip();
            return Outcome::NothingToDo;
        };

        let mut new = self.new.clone();
        new.set_status(current.status());
        new.touch_status();
        self.old = current;
        self.applied_new = Some(new.clone());
        swap_entry(core, &self.old, new);

        self.base.db_change = Some(DbChange::Entries);
        if self.base.notify_gui {
            core.notify_gui(GuiAction::ModifyEntry, &uuid, None);
        }
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        if let Some(new) = self.applied_new.take() {
            swap_entry(core, &new, self.old.clone());
        }
        self.base.restore(core);
        if self.base.notify_gui {
            core.notify_gui(GuiAction::ModifyEntry, &self.old.uuid(), None);
        }
    }
}

/// Change one field of an entry
///
/// A password change goes through the password history. The record
/// modification time is stamped unless it is the field being set.
pub struct UpdateEntry {
    base: CommandBase,
    uuid: Uuid,
    field: FieldType,
    value: Zeroizing<String>,
    old: Option<Entry>,
    /// Value stored by the first execute, reused by redo
    new: Option<Entry>,
    /// Unreadable history thrown away by a password change
    discarded_history: Option<PwhError>,
}

impl fmt::Debug for UpdateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateEntry")
            .field("uuid", &self.uuid)
            .field("field", &self.field)
            .field("applied", &self.base.applied)
            .finish_non_exhaustive()
    }
}

impl UpdateEntry {
    pub fn new(uuid: &Uuid, field: FieldType, value: &str) -> Self {
        Self {
            base: CommandBase::new(ChangeType::Db),
            uuid: *uuid,
            field,
            value: Zeroizing::new(value.to_string()),
            old: None,
            new: None,
            discarded_history: None,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn field(&self) -> FieldType {
        self.field
    }

    /// Why the entry's password history was dropped, if it had to be
    pub fn discarded_history(&self) -> Option<PwhError> {
        self.discarded_history
    }

    fn updated(&mut self, core: &dyn CommandInterface, current: &Entry) -> Option<Entry> {
        if let Some(new) = &self.new {
            return Some(new.clone());
        }
        let now = now_time();
        let mut entry = current.clone();
        match self.field {
            FieldType::Uuid | FieldType::BaseUuid => return None,
            FieldType::Password => {
                let defaults = core.preferences().history_defaults();
                if let PwhValidation::Discarded(e) = entry.update_password_at(&self.value, &defaults, now) {
                    self.discarded_history = Some(e);
                }
            }
            ft => {
                if !entry.set_field_value(ft, &self.value) {
                    return None;
                }
            }
        }
        if self.field != FieldType::RMTime {
            entry.set_time(FieldType::RMTime, now);
        }
        entry.touch_status();
        Some(entry)
    }
}

impl Command for UpdateEntry {
    fn kind(&self) -> CommandKind {
        CommandKind::UpdateEntry
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
        let Some(current) = core.find(&self.uuid).cloned() else {
            self.base.skip();
            return Outcome::NothingToDo;
        };
        if self.field == FieldType::Password && current.is_dependent() {
            log::warn!("Password of dependent {} belongs to its base", self.uuid);
            self.base.skip();
            return Outcome::Failed;
        }
        let Some(new) = self.updated(core, &current) else {
            log::warn!("Rejected value for {} of {}", self.field.name(), self.uuid);
            self.base.skip();
            return Outcome::Failed;
        };

        self.old = Some(current);
        self.new = Some(new.clone());
        core.do_replace_entry(&self.uuid, new);

        self.base.db_change = Some(DbChange::Entries);
        if self.base.notify_gui {
            let action = match self.field {
                FieldType::Password => GuiAction::RefreshEntryPassword,
                _ => GuiAction::ModifyEntry,
            };
            core.notify_gui(action, &self.uuid, Some(self.field));
        }
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        if let Some(old) = self.old.clone() {
            core.do_replace_entry(&self.uuid, old);
        }
        self.base.restore(core);
        if self.base.notify_gui {
            core.notify_gui(GuiAction::ModifyEntry, &self.uuid, Some(self.field));
        }
    }
}

/// Set a new password, keeping the old one in the entry's history and
/// refreshing its expiry
#[derive(Debug)]
pub struct UpdatePassword {
    inner: UpdateEntry,
}

impl UpdatePassword {
    pub fn new(uuid: &Uuid, password: &str) -> Self {
        Self {
            inner: UpdateEntry::new(uuid, FieldType::Password, password),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.inner.uuid
    }

    pub fn discarded_history(&self) -> Option<PwhError> {
        self.inner.discarded_history
    }
}

impl Command for UpdatePassword {
    fn kind(&self) -> CommandKind {
        CommandKind::UpdatePassword
    }

    fn base(&self) -> &CommandBase {
        &self.inner.base
    }

    fn base_mut(&mut self) -> &mut CommandBase {
        &mut self.inner.base
    }

    fn execute(&mut self, core: &mut dyn CommandInterface) -> Outcome {
        let rc = self.inner.execute(core);
        if self.inner.base.applied {
            core.update_expiry_entry(&self.inner.uuid);
        }
        rc
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        let applied = self.inner.base.applied;
        self.inner.undo(core);
        if applied {
            core.update_expiry_entry(&self.inner.uuid);
        }
    }
}
