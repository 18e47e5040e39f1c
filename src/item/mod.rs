//! Records kept in the store: entries, attachments and their field values

mod attachment;
mod entry;
mod field;
mod field_type;
#[allow(clippy::module_inception)]
mod item;
pub mod matching;
pub mod policy;
mod pwhistory;

pub use attachment::Attachment;
pub use entry::{
    DependentKind, Entry, EntryStatus, EntryType, HistoryDefaults, TOTP_DEFAULT_LENGTH,
    TOTP_DEFAULT_TIME_STEP,
};
pub use field::ItemField;
pub use field_type::{AttField, FieldType, ValueKind};
pub use item::Item;
pub use matching::MatchRule;
pub use policy::PasswordPolicy;
pub use pwhistory::{PwHistEntry, PwHistory, PwhAction, PwhError, PwhValidation, MAX_HISTORY};
