use std::collections::BTreeSet;

use crate::store::{CommandInterface, GuiAction};

use super::{ChangeType, Command, CommandBase, CommandKind, Outcome};

/// An ordered list of commands run as one
///
/// Execute runs every command in order and keeps going past failures;
/// the individual results are available from [`get_rc`](Self::get_rc).
/// Undo runs in reverse order.
#[derive(Debug)]
pub struct MultiCommands {
    base: CommandBase,
    commands: Vec<Box<dyn Command>>,
    rcs: Vec<Outcome>,
}

impl Default for MultiCommands {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiCommands {
    pub fn new() -> Self {
        Self {
            base: CommandBase::new(ChangeType::None),
            commands: Vec::new(),
            rcs: Vec::new(),
        }
    }

    pub fn add<C: Command>(&mut self, command: C) {
        self.add_boxed(Box::new(command));
    }

    pub fn add_boxed(&mut self, mut command: Box<dyn Command>) {
        command.base_mut().in_multi = true;
        if command.base().change_type == ChangeType::Db {
            self.base.change_type = ChangeType::Db;
        }
        self.commands.push(command);
    }

    /// Mark this composite as run by another command that tracks
    /// modified groups itself
    pub fn set_nested(&mut self, nested: bool) {
        self.base.in_multi = nested;
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Result of the `index`-th command in the last execute or redo
    pub fn get_rc(&self, index: usize) -> Option<Outcome> {
        self.rcs.get(index).copied()
    }

    pub fn rcs(&self) -> &[Outcome] {
        &self.rcs
    }

    pub fn commands(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.iter().map(|c| c.as_ref())
    }

    /// First command of the given kind
    pub fn find_command(&self, kind: CommandKind) -> Option<&dyn Command> {
        self.commands().find(|c| c.kind() == kind)
    }

    fn run(&mut self, core: &mut dyn CommandInterface, redo: bool) -> Outcome {
        self.rcs.clear();
        if !self.base.begin(core) {
            return Outcome::Done;
        }

        for command in self.commands.iter_mut() {
            let rc = if redo { command.redo(core) } else { command.execute(core) };
            self.rcs.push(rc);
        }

        if self.rcs.contains(&Outcome::Failed) {
            Outcome::Failed
        } else if !self.rcs.is_empty() && !self.rcs.contains(&Outcome::Done) {
            Outcome::NothingToDo
        } else {
            Outcome::Done
        }
    }
}

impl Command for MultiCommands {
    fn kind(&self) -> CommandKind {
        CommandKind::Multi
    }

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CommandBase {
        &mut self.base
    }

    fn execute(&mut self, core: &mut dyn CommandInterface) -> Outcome {
        self.run(core, false)
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if !self.base.applied {
            return;
        }
        for command in self.commands.iter_mut().rev() {
            command.undo(core);
        }

        let touched: BTreeSet<String> = core.modified_nodes().clone();
        self.base.restore(core);
        let changed: Vec<String> = touched.difference(core.modified_nodes()).cloned().collect();
        if self.base.notify_gui && !changed.is_empty() {
            core.notify_groups(GuiAction::RefreshTree, &changed);
        }
    }

    fn redo(&mut self, core: &mut dyn CommandInterface) -> Outcome {
        self.run(core, true)
    }
}
