//! # pwstore
//!
//! In-memory core of an encrypted password database.
//!
//! ## Features
//!
//! - Per-entry AES-256-CBC encryption of every field value, under a random
//!   key that lives only as long as the entry
//! - Aliases and shortcuts: entries that borrow fields from a base entry
//! - Every change is an undoable command; composites undo as one step
//! - Password history, named password policies, expiry tracking
//! - Filters with the XML form used by exported filter files
//!
//! ## Example
//!
//! ```
//! use pwstore::{AddEntry, DeleteEntry, Entry, Preferences, Store};
//!
//! let mut store = Store::new(Preferences::default());
//! let mut entry = Entry::new();
//! entry.set_group("Web");
//! entry.set_title("Mail");
//! entry.set_password("secret");
//! let uuid = entry.uuid();
//!
//! store.execute(AddEntry::new(entry));
//! store.execute(DeleteEntry::new(&uuid));
//! assert!(store.get(&uuid).is_none());
//!
//! store.undo();
//! assert_eq!(store.get(&uuid).map(|e| e.password()), Some("secret".to_string()));
//! ```

pub mod command;
pub mod crypto;
pub mod error;
pub mod filter;
pub mod import;
pub mod item;
pub mod prefs;
pub mod report;
pub mod store;
pub mod utils;

// Re-export main types
pub use command::{
    AddDependentEntries, AddDependentEntry, AddEntry, ChangeDbHeader, Command, CommandKind, DbEmptyGroups, DbFilters,
    DbPolicyNames, DbPrefs, DeleteEntry, EditEntry, GuiWhen, MoveDependentEntries, MultiCommands, Outcome,
    RemoveDependentEntry, RenameGroup, UpdateEntry, UpdateGui, UpdatePassword, UpdatePasswordHistory,
};
pub use error::{Result, StoreError};
pub use filter::{Filter, FilterMap, FilterPool};
pub use import::{import_entries, ImportPlan, ImportStats, ImportedEntry};
pub use item::{Attachment, DependentKind, Entry, EntryStatus, EntryType, FieldType, PasswordPolicy, PwhAction};
pub use prefs::Preferences;
pub use report::{Asker, Reporter};
pub use store::{CommandInterface, DbHeader, GuiAction, HeaderType, LoadReport, Observer, ResolveBy, Store};
