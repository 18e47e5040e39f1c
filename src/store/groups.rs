//! Group paths

use std::collections::BTreeSet;

use crate::command::{DbEmptyGroups, EditEntry, GuiWhen, MultiCommands, UpdateGui};
use crate::utils::{group_with_ancestors, is_in_group, rebase_group};

use super::interface::GuiAction;
use super::store::Store;

impl Store {
    /// Every group path in use, including ancestors and empty groups
    pub fn groups(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .map(|e| e.group())
            .chain(self.empty_groups.iter().cloned())
            .flat_map(|g| group_with_ancestors(&g))
            .collect()
    }

    /// True if no entry lives in or below `group`
    pub fn is_group_empty(&self, group: &str) -> bool {
        !self.entries.values().any(|e| is_in_group(&e.group(), group))
    }

    /// Build the commands renaming `old` to `new`
    ///
    /// Each entry in or below `old` gets an edit, matching empty groups are
    /// renamed and the tree is refreshed. The plan is empty when nothing
    /// would change.
    pub(crate) fn plan_group_rename(&self, old: &str, new: &str) -> MultiCommands {
        let mut plan = MultiCommands::new();
        if old.is_empty() || old == new {
            return plan;
        }

        for entry in self.entries.values() {
            if let Some(group) = rebase_group(&entry.group(), old, new) {
                let mut renamed = entry.clone();
                renamed.set_group(&group);
                renamed.touch_status();
                plan.add(EditEntry::new(entry, renamed));
            }
        }
        if self.empty_groups.iter().any(|g| is_in_group(g, old)) {
            plan.add(DbEmptyGroups::rename(old, new));
        }
        if !plan.is_empty() {
            plan.add(UpdateGui::groups(GuiAction::RefreshTree, GuiWhen::Always));
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use crate::store::store::tests::{add_plain, test_store};

    #[test]
    fn test_groups_with_ancestors() {
        let mut store = test_store();
        add_plain(&mut store, "A.B", "t", "", "");
        store.empty_groups.insert("C".to_string());
        let groups: Vec<String> = store.groups().into_iter().collect();
        assert_eq!(groups, vec!["A", "A.B", "C"]);
        assert!(!store.is_group_empty("A"));
        assert!(store.is_group_empty("C"));
    }

    #[test]
    fn test_plan_group_rename() {
        let mut store = test_store();
        add_plain(&mut store, "Work", "a", "", "");
        add_plain(&mut store, "Work.Sub", "b", "", "");
        add_plain(&mut store, "Workshop", "c", "", "");
        store.empty_groups.insert("Work.Empty".to_string());

        let plan = store.plan_group_rename("Work", "Job");
        // two edits, the empty group rename and the refresh
        assert_eq!(plan.len(), 4);
        assert!(store.plan_group_rename("Work", "Work").is_empty());
        assert!(store.plan_group_rename("Nothing", "X").is_empty());
    }
}
