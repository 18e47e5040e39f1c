use crate::store::{CommandInterface, GuiAction};

use super::{ChangeType, Command, CommandBase, CommandKind, MultiCommands, Outcome};

#[derive(Debug, Default)]
enum Plan {
    #[default]
    Unplanned,
    Planned(MultiCommands),
    Executed(MultiCommands),
}

/// Rename a group, moving every entry and empty group below it
///
/// The edits are planned against the store on first execute and reused
/// by redo.
#[derive(Debug)]
pub struct RenameGroup {
    base: CommandBase,
    old: String,
    new: String,
    plan: Plan,
}

impl RenameGroup {
    pub fn new(old: &str, new: &str) -> Self {
        Self {
            base: CommandBase::new(ChangeType::Db),
            old: old.to_string(),
            new: new.to_string(),
            plan: Plan::Unplanned,
        }
    }

    /// Number of commands in the plan, once planned
    pub fn plan_len(&self) -> Option<usize> {
        match &self.plan {
            Plan::Unplanned => None,
            Plan::Planned(plan) | Plan::Executed(plan) => Some(plan.len()),
        }
    }

    fn run(&mut self, core: &mut dyn CommandInterface, redo: bool) -> Outcome {
        if !self.base.begin(core) {
            return Outcome::Done;
        }
        let (mut plan, replay) = match std::mem::take(&mut self.plan) {
            Plan::Unplanned => (core.do_rename_group(&self.old, &self.new), false),
            Plan::Planned(plan) | Plan::Executed(plan) => (plan, redo),
        };
        if plan.is_empty() {
            self.plan = Plan::Planned(plan);
            self.base.skip();
            return Outcome::NothingToDo;
        }

        plan.set_nested(true);
        let rc = if replay { plan.redo(core) } else { plan.execute(core) };
        self.plan = Plan::Executed(plan);
        log::info!("Renamed group '{}' to '{}'", self.old, self.new);
        if self.base.notify_gui {
            core.notify_groups(GuiAction::RefreshGroups, &[self.old.clone(), self.new.clone()]);
        }
        rc
    }
}

impl Command for RenameGroup {
    fn kind(&self) -> CommandKind {
        CommandKind::RenameGroup
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
        if let Plan::Executed(mut plan) = std::mem::take(&mut self.plan) {
            plan.undo(core);
            self.plan = Plan::Planned(plan);
        }
        self.base.restore(core);
        if self.base.notify_gui {
            core.notify_groups(GuiAction::RefreshGroups, &[self.old.clone(), self.new.clone()]);
        }
    }

    fn redo(&mut self, core: &mut dyn CommandInterface) -> Outcome {
        self.run(core, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::store::tests::{add_plain, test_store};

    #[test]
    fn test_rename_group_undo_redo() {
        let mut store = test_store();
        let a = add_plain(&mut store, "Work", "a", "", "");
        let b = add_plain(&mut store, "Work.Sub", "b", "", "");
        let c = add_plain(&mut store, "Workshop", "c", "", "");
        store.empty_groups.insert("Work.Empty".to_string());
        let before = store.content_snapshot();

        assert_eq!(store.execute(RenameGroup::new("Work", "Job")), Outcome::Done);
        assert_eq!(store.get(&a).unwrap().group(), "Job");
        assert_eq!(store.get(&b).unwrap().group(), "Job.Sub");
        assert_eq!(store.get(&c).unwrap().group(), "Workshop");
        assert!(store.empty_groups().contains("Job.Empty"));
        let after = store.content_snapshot();

        store.undo();
        assert_eq!(store.content_snapshot(), before);
        store.redo();
        assert_eq!(store.content_snapshot(), after);
        assert_eq!(
            store.last_command().and_then(|c| c.downcast_ref::<RenameGroup>()).and_then(|r| r.plan_len()),
            Some(4)
        );
    }

    #[test]
    fn test_rename_to_same_name() {
        let mut store = test_store();
        add_plain(&mut store, "Work", "a", "", "");
        assert_eq!(store.execute(RenameGroup::new("Work", "Work")), Outcome::NothingToDo);
        assert!(!store.is_db_changed());
    }
}
