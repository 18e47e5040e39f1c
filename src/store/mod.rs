//! The password store and its side tables
//!
//! - `store` - the [`Store`] itself and read access
//! - `interface` - [`CommandInterface`], the mutation surface for commands
//! - `undo` - command execution and the undo/redo history
//! - `alias` - resolving the base entry named by a dependent's password
//! - `load` - populating a store from loaded records

mod alias;
mod dependents;
mod expired;
mod groups;
mod header;
mod interface;
mod linking;
mod load;
mod pwhistory;
mod rue;
#[allow(clippy::module_inception)]
pub(crate) mod store;
mod undo;

pub use alias::{parse_alias_password, parse_uuid_marker, BaseEntryError, BaseLookup, ResolveBy};
pub use dependents::DependentMap;
pub use expired::ExpiredList;
pub use header::{decode_policies, encode_policies, DbHeader, HeaderType, DEFAULT_HASH_ITERATIONS};
pub use interface::{CommandInterface, GuiAction, Observer};
pub use linking::{DependentsResult, DependentsUndo};
pub use load::LoadReport;
pub use rue::{RueList, DEFAULT_RUE_SIZE};
pub use store::{RawRecords, Store, StoreSnapshot};
