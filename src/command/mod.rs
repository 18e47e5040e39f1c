//! Undoable commands
//!
//! Every change to a [`Store`](crate::store::Store) is a [`Command`]. A
//! command's `undo` puts back exactly the state its `execute` found,
//! side tables included, however many times the two alternate. Commands
//! only keep values they copied out of the store, never references into it.
//!
//! All mutating commands do nothing on a read-only store and report
//! [`Outcome::Done`].

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::store::CommandInterface;

mod database;
mod dependents;
mod entry;
mod group;
mod gui;
mod multi;

pub use database::{ChangeDbHeader, DbEmptyGroups, DbFilters, DbPolicyNames, DbPrefs, UpdatePasswordHistory};
pub use dependents::{AddDependentEntries, AddDependentEntry, MoveDependentEntries, RemoveDependentEntry};
pub use entry::{AddEntry, DeleteEntry, EditEntry, UpdateEntry, UpdatePassword};
pub use group::RenameGroup;
pub use gui::{GuiWhen, UpdateGui};
pub use multi::MultiCommands;

/// Tag identifying each concrete command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Multi,
    AddEntry,
    DeleteEntry,
    EditEntry,
    UpdateEntry,
    UpdatePassword,
    AddDependentEntry,
    RemoveDependentEntry,
    AddDependentEntries,
    MoveDependentEntries,
    UpdatePasswordHistory,
    RenameGroup,
    ChangeDbHeader,
    DbPrefs,
    DbPolicyNames,
    DbEmptyGroups,
    DbFilters,
    UpdateGui,
}

/// Result of executing a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The target was already gone or already in the requested state
    NothingToDo,
    Failed,
}

impl Outcome {
    pub fn is_done(self) -> bool {
        self == Outcome::Done
    }

    /// `0` for done, non-zero otherwise
    pub fn code(self) -> i32 {
        match self {
            Outcome::Done => 0,
            Outcome::NothingToDo => 1,
            Outcome::Failed => -1,
        }
    }
}

/// Whether a command touches entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeType {
    #[default]
    None,
    Db,
}

/// What the last execute actually changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbChange {
    Entries,
    Preferences,
    Header,
    EmptyGroups,
    PolicyNames,
    Filters,
    PasswordHistory,
}

/// State shared by every command
#[derive(Debug, Clone)]
pub struct CommandBase {
    pub(crate) change_type: ChangeType,
    pub(crate) db_change: Option<DbChange>,
    pub(crate) notify_gui: bool,
    /// Part of a composite that tracks modified groups for it
    pub(crate) in_multi: bool,
    /// The last execute changed something that undo must reverse
    pub(crate) applied: bool,
    saved_nodes: Option<BTreeSet<String>>,
    saved_db_changed: bool,
}

impl CommandBase {
    pub fn new(change_type: ChangeType) -> Self {
        Self {
            change_type,
            db_change: None,
            notify_gui: true,
            in_multi: false,
            applied: false,
            saved_nodes: None,
            saved_db_changed: false,
        }
    }

    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    /// What the last execute changed, if anything
    pub fn db_change(&self) -> Option<DbChange> {
        self.db_change
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub fn set_notify_gui(&mut self, notify: bool) {
        self.notify_gui = notify;
    }

    /// Begin an execute, saving what undo restores
    ///
    /// Returns false on a read-only store, in which case the command must
    /// do nothing.
    pub(crate) fn begin(&mut self, core: &dyn CommandInterface) -> bool {
        self.db_change = None;
        if core.is_read_only() {
            self.applied = false;
            return false;
        }
        self.saved_db_changed = core.is_db_changed();
        self.saved_nodes = (self.change_type == ChangeType::Db && !self.in_multi).then(|| core.modified_nodes().clone());
        self.applied = true;
        true
    }

    /// Finish an undo by putting back what [`begin`](Self::begin) saved
    pub(crate) fn restore(&mut self, core: &mut dyn CommandInterface) {
        if let Some(nodes) = self.saved_nodes.take() {
            core.set_modified_nodes(nodes);
        }
        core.set_db_changed(self.saved_db_changed);
        self.applied = false;
    }

    /// Mark an execute that found nothing to change
    pub(crate) fn skip(&mut self) {
        self.applied = false;
        self.saved_nodes = None;
    }
}

/// A reversible change to the store
pub trait Command: Any + Debug {
    fn kind(&self) -> CommandKind;
    fn base(&self) -> &CommandBase;
    fn base_mut(&mut self) -> &mut CommandBase;

    fn execute(&mut self, core: &mut dyn CommandInterface) -> Outcome;

    /// Reverse the last execute; does nothing if it changed nothing
    fn undo(&mut self, core: &mut dyn CommandInterface);

    fn redo(&mut self, core: &mut dyn CommandInterface) -> Outcome {
        self.execute(core)
    }
}

impl dyn Command {
    pub fn downcast_ref<T: Command>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Command>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}
