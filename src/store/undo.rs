//! Command execution and the undo/redo history

use crate::command::{Command, Outcome};

use super::store::Store;

impl Store {
    /// Execute a command and record it for undo
    ///
    /// A read-only store runs the command, which does nothing, and keeps no
    /// record of it. Executing discards anything that could be redone.
    pub fn execute<C: Command>(&mut self, command: C) -> Outcome {
        self.execute_boxed(Box::new(command))
    }

    pub fn execute_boxed(&mut self, mut command: Box<dyn Command>) -> Outcome {
        let outcome = command.execute(self);
        log::debug!("Executed {:?}: {:?}", command.kind(), outcome);
        if self.read_only {
            return outcome;
        }
        self.history.truncate(self.undo_pos);
        self.history.push(command);
        self.undo_pos = self.history.len();
        outcome
    }

    /// Undo the most recent command; false if there is none
    ///
    /// A read-only store undoes nothing and keeps its history as it is.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        let mut history = std::mem::take(&mut self.history);
        let pos = self.undo_pos - 1;
        history[pos].undo(self);
        log::debug!("Undid {:?}", history[pos].kind());
        self.history = history;
        self.undo_pos = pos;
        true
    }

    /// Redo the most recently undone command; false if there is none
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        let mut history = std::mem::take(&mut self.history);
        let pos = self.undo_pos;
        let outcome = history[pos].redo(self);
        log::debug!("Redid {:?}: {:?}", history[pos].kind(), outcome);
        self.history = history;
        self.undo_pos = pos + 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.read_only && self.undo_pos > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.read_only && self.undo_pos < self.history.len()
    }

    /// Forget all recorded commands
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.undo_pos = 0;
    }

    /// The command the next undo would reverse
    pub fn last_command(&self) -> Option<&dyn Command> {
        self.undo_pos
            .checked_sub(1)
            .and_then(|pos| self.history.get(pos))
            .map(|c| c.as_ref())
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
