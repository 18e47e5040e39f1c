use uuid::Uuid;

use crate::store::{CommandInterface, GuiAction};

use super::{ChangeType, Command, CommandBase, CommandKind, Outcome};

/// Which phases of a command sequence fire a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiWhen {
    Execute,
    Undo,
    Redo,
    ExecuteRedo,
    Always,
}

impl GuiWhen {
    fn on_execute(self) -> bool {
        matches!(self, GuiWhen::Execute | GuiWhen::ExecuteRedo | GuiWhen::Always)
    }

    fn on_redo(self) -> bool {
        matches!(self, GuiWhen::Redo | GuiWhen::ExecuteRedo | GuiWhen::Always)
    }

    fn on_undo(self) -> bool {
        matches!(self, GuiWhen::Undo | GuiWhen::Always)
    }
}

/// Notify the observer without changing anything
///
/// Placed inside a [`MultiCommands`](super::MultiCommands) to refresh a
/// view once after a batch of changes.
#[derive(Debug)]
pub struct UpdateGui {
    base: CommandBase,
    action: GuiAction,
    target: Option<Uuid>,
    when: GuiWhen,
}

impl UpdateGui {
    pub fn new(action: GuiAction, uuid: &Uuid, when: GuiWhen) -> Self {
        Self {
            base: CommandBase::new(ChangeType::None),
            action,
            target: Some(*uuid),
            when,
        }
    }

    /// Notification about groups rather than one entry
    pub fn groups(action: GuiAction, when: GuiWhen) -> Self {
        Self {
            base: CommandBase::new(ChangeType::None),
            action,
            target: None,
            when,
        }
    }

    fn fire(&self, core: &mut dyn CommandInterface) {
        if !self.base.notify_gui {
            return;
        }
        match &self.target {
            Some(uuid) => core.notify_gui(self.action, uuid, None),
            None => core.notify_groups(self.action, &[]),
        }
    }
}

impl Command for UpdateGui {
    fn kind(&self) -> CommandKind {
        CommandKind::UpdateGui
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
        if self.when.on_execute() {
            self.fire(core);
        }
        Outcome::Done
    }

    fn undo(&mut self, core: &mut dyn CommandInterface) {
        if self.base.applied && self.when.on_undo() {
            self.fire(core);
        }
    }

    fn redo(&mut self, core: &mut dyn CommandInterface) -> Outcome {
        if !self.base.begin(core) {
            return Outcome::Done;
        }
        if self.when.on_redo() {
            self.fire(core);
        }
        Outcome::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FieldType;
    use crate::store::Observer;
    use crate::store::store::tests::test_store;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<GuiAction>>>);

    impl Observer for Recorder {
        fn entry_updated(&mut self, action: GuiAction, _uuid: &Uuid, _field: Option<FieldType>) {
            self.0.borrow_mut().push(action);
        }

        fn groups_updated(&mut self, action: GuiAction, _groups: &[String]) {
            self.0.borrow_mut().push(action);
        }
    }

    #[test]
    fn test_fires_by_phase() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut store = test_store();
        store.set_observer(Box::new(Recorder(seen.clone())));

        store.execute(UpdateGui::groups(GuiAction::RefreshTree, GuiWhen::Undo));
        assert!(seen.borrow().is_empty());
        store.undo();
        assert_eq!(*seen.borrow(), vec![GuiAction::RefreshTree]);

        store.execute(UpdateGui::new(GuiAction::RefreshEntry, &Uuid::new_v4(), GuiWhen::ExecuteRedo));
        store.undo();
        store.redo();
        assert_eq!(
            *seen.borrow(),
            vec![GuiAction::RefreshTree, GuiAction::RefreshEntry, GuiAction::RefreshEntry]
        );
    }

    #[test]
    fn test_silent_when_read_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut store = test_store();
        store.set_observer(Box::new(Recorder(seen.clone())));
        store.set_read_only(true);

        store.execute(UpdateGui::groups(GuiAction::RefreshTree, GuiWhen::Always));
        assert!(seen.borrow().is_empty());
    }
}
