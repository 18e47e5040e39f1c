//! Base entry resolution for alias and shortcut passwords
//!
//! A password of the form `[title]`, `[group:title]` or
//! `[group:title:user]` names the base entry of a dependent. The number of
//! fields selects the lookup: a unique title, a unique group and title
//! pair, or an exact group/title/user match. The stored form
//! `[[<uuid>]]` (alias) or `[~<uuid>~]` (shortcut) names the base directly.

use thiserror::Error;
use uuid::Uuid;

use crate::item::{DependentKind, EntryType};

use super::store::Store;

/// Why a base reference was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BaseEntryError {
    #[error("An entry cannot be its own base")]
    SelfReference,

    #[error("Entry cannot be the base of this {}: it must be a normal entry or {} base", .0.name(), .0.name())]
    WrongTargetType(DependentKind),

    #[error("No entry matches '{0}'")]
    NotFound(String),

    #[error("More than one entry matches '{0}'")]
    Ambiguous(String),

    #[error("Entry is already the base of other entries")]
    DependentIsBase,
}

/// How a dependent's base is named when linking in bulk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveBy {
    /// `[[<uuid>]]` / `[~<uuid>~]` markers, as stored on disk
    Uuid,
    /// `[group:title:user]` references, as typed or imported
    Gtu,
}

/// Result of looking up a bracketed password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseLookup {
    /// The password is not a base reference
    NotAliasShaped,
    /// Exactly one base matched
    Found { uuid: Uuid, fields: usize },
    /// Nothing matched
    NotFound { fields: usize },
    /// More than one entry matched
    Ambiguous { fields: usize },
}

impl BaseLookup {
    /// `+n` when found, `0` when not alias-shaped and `-n` otherwise,
    /// where `n` is the number of fields in the reference
    pub fn code(&self) -> i32 {
        match *self {
            BaseLookup::NotAliasShaped => 0,
            BaseLookup::Found { fields, .. } => fields as i32,
            BaseLookup::NotFound { fields } | BaseLookup::Ambiguous { fields } => -(fields as i32),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, BaseLookup::Found { .. })
    }
}

/// Split a bracketed reference into its fields
///
/// Returns `None` for anything that is not a base reference: no brackets,
/// more than three fields or an empty title.
pub fn parse_alias_password(password: &str) -> Option<Vec<String>> {
    let inner = [("[[", "]]"), ("[~", "~]"), ("[", "]")]
        .into_iter()
        .find_map(|(open, close)| password.strip_prefix(open)?.strip_suffix(close))?;

    let fields: Vec<String> = inner.split(':').map(str::to_string).collect();
    let title = match fields.len() {
        1 => &fields[0],
        2 | 3 => &fields[1],
        _ => return None,
    };
    if title.is_empty() {
        return None;
    }
    Some(fields)
}

/// Extract the base UUID from a stored dependent marker
pub fn parse_uuid_marker(password: &str, kind: DependentKind) -> Option<Uuid> {
    let (open, close) = kind.markers();
    let hex = password.strip_prefix(open)?.strip_suffix(close)?;
    Uuid::try_parse(hex).ok()
}

impl Store {
    /// Look up the entry a bracketed password refers to
    pub fn lookup_base(&self, password: &str) -> BaseLookup {
        let Some(fields) = parse_alias_password(password) else {
            return BaseLookup::NotAliasShaped;
        };
        let n = fields.len();
        let (group, title, user) = match n {
            1 => ("", fields[0].as_str(), ""),
            2 => (fields[0].as_str(), fields[1].as_str(), ""),
            _ => (fields[0].as_str(), fields[1].as_str(), fields[2].as_str()),
        };

        if let Some(entry) = self.find_gtu(group, title, user) {
            return BaseLookup::Found { uuid: entry.uuid(), fields: n };
        }
        if n == 3 {
            return BaseLookup::NotFound { fields: n };
        }

        let mut matches = self
            .entries
            .values()
            .filter(|e| e.title() == title && (n == 1 || e.group() == group));
        match (matches.next(), matches.next()) {
            (Some(entry), None) => BaseLookup::Found { uuid: entry.uuid(), fields: n },
            (None, _) => BaseLookup::NotFound { fields: n },
            (Some(_), Some(_)) => BaseLookup::Ambiguous { fields: n },
        }
    }

    /// Check that `base` may serve as the base of `dependent`
    ///
    /// An alias pointed at another alias is redirected to that alias's
    /// base. A dependent that is itself a base is refused, so links never
    /// chain. Returns the base that should be used.
    pub fn check_base(&self, dependent: &Uuid, base: &Uuid, kind: DependentKind) -> Result<Uuid, BaseEntryError> {
        if self.entries.get(dependent).is_some_and(|e| e.is_base()) {
            return Err(BaseEntryError::DependentIsBase);
        }
        let Some(target) = self.entries.get(base) else {
            return Err(BaseEntryError::NotFound(base.simple().to_string()));
        };

        let resolved = match (kind, target.entry_type()) {
            (DependentKind::Alias, EntryType::Normal | EntryType::AliasBase) => *base,
            (DependentKind::Alias, EntryType::Alias) => target
                .base_uuid()
                .ok_or_else(|| BaseEntryError::NotFound(base.simple().to_string()))?,
            (DependentKind::Shortcut, EntryType::Normal | EntryType::ShortcutBase) => *base,
            _ => return Err(BaseEntryError::WrongTargetType(kind)),
        };

        if resolved == *dependent {
            return Err(BaseEntryError::SelfReference);
        }
        Ok(resolved)
    }

    /// Resolve and validate the base named by a dependent's password
    ///
    /// `Ok(None)` means the password is not a base reference at all.
    pub fn check_alias_password(
        &self,
        password: &str,
        dependent: &Uuid,
        kind: DependentKind,
    ) -> Result<Option<Uuid>, BaseEntryError> {
        if let Some(uuid) = parse_uuid_marker(password, kind) {
            return self.check_base(dependent, &uuid, kind).map(Some);
        }
        match self.lookup_base(password) {
            BaseLookup::NotAliasShaped => Ok(None),
            BaseLookup::Found { uuid, .. } => self.check_base(dependent, &uuid, kind).map(Some),
            BaseLookup::NotFound { .. } => Err(BaseEntryError::NotFound(password.to_string())),
            BaseLookup::Ambiguous { .. } => Err(BaseEntryError::Ambiguous(password.to_string())),
        }
    }

    /// Resolve a base reference the way bulk linking does
    pub(crate) fn resolve_base(
        &self,
        password: &str,
        dependent: &Uuid,
        kind: DependentKind,
        via: ResolveBy,
    ) -> Result<Option<Uuid>, BaseEntryError> {
        match via {
            ResolveBy::Uuid => match parse_uuid_marker(password, kind) {
                Some(uuid) => self.check_base(dependent, &uuid, kind).map(Some),
                None => Ok(None),
            },
            ResolveBy::Gtu => self.check_alias_password(password, dependent, kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Entry;
    use crate::store::store::tests::{add_plain, test_store};

    #[test]
    fn test_parse_alias_password() {
        assert_eq!(parse_alias_password("[t]"), Some(vec!["t".to_string()]));
        assert_eq!(parse_alias_password("[g:t]").map(|f| f.len()), Some(2));
        assert_eq!(parse_alias_password("[g:t:u]").map(|f| f.len()), Some(3));
        assert_eq!(parse_alias_password("[[g:t:u]]").map(|f| f.len()), Some(3));
        assert_eq!(parse_alias_password("[~t~]"), Some(vec!["t".to_string()]));
        assert_eq!(parse_alias_password("notbracketed"), None);
        assert_eq!(parse_alias_password("[a:b:c:d]"), None);
        assert_eq!(parse_alias_password("[g::u]"), None);
        assert_eq!(parse_alias_password("[]"), None);
    }

    #[test]
    fn test_parse_uuid_marker() {
        let uuid = Uuid::new_v4();
        let alias = format!("[[{}]]", uuid.simple());
        assert_eq!(parse_uuid_marker(&alias, DependentKind::Alias), Some(uuid));
        assert_eq!(parse_uuid_marker(&alias, DependentKind::Shortcut), None);
        assert_eq!(parse_uuid_marker("[[zz]]", DependentKind::Alias), None);
    }

    #[test]
    fn test_lookup_unique_title() {
        let mut store = test_store();
        let base = add_plain(&mut store, "Web", "MyTitle", "bob", "pw");

        let found = store.lookup_base("[MyTitle]");
        assert_eq!(found, BaseLookup::Found { uuid: base, fields: 1 });
        assert_eq!(found.code(), 1);
    }

    #[test]
    fn test_lookup_ambiguous_title() {
        let mut store = test_store();
        add_plain(&mut store, "A", "MyTitle", "", "pw");
        add_plain(&mut store, "B", "MyTitle", "", "pw");

        let lookup = store.lookup_base("[MyTitle]");
        assert_eq!(lookup, BaseLookup::Ambiguous { fields: 1 });
        assert_eq!(lookup.code(), -1);
    }

    #[test]
    fn test_lookup_exact_triple() {
        let mut store = test_store();
        let base = add_plain(&mut store, "Group", "Title", "User", "pw");
        add_plain(&mut store, "Group", "Title", "Other", "pw");

        let lookup = store.lookup_base("[Group:Title:User]");
        assert_eq!(lookup, BaseLookup::Found { uuid: base, fields: 3 });
        assert_eq!(lookup.code(), 3);
        assert_eq!(store.lookup_base("[Group:Title:Nobody]").code(), -3);
        assert_eq!(store.lookup_base("[Group:Title]").code(), -2);
    }

    #[test]
    fn test_lookup_not_alias_shaped() {
        let store = test_store();
        assert_eq!(store.lookup_base("notbracketed").code(), 0);
        assert!(!store.lookup_base("notbracketed").is_found());
    }

    #[test]
    fn test_check_base_rules() {
        let mut store = test_store();
        let normal = add_plain(&mut store, "G", "Normal", "", "pw");
        let dep = add_plain(&mut store, "G", "Dep", "", "[Normal]");

        assert_eq!(store.check_base(&dep, &normal, DependentKind::Alias), Ok(normal));
        assert_eq!(store.check_base(&dep, &dep, DependentKind::Alias), Err(BaseEntryError::SelfReference));

        let mut shortcut = Entry::new();
        shortcut.set_title("Sc");
        shortcut.make_dependent(DependentKind::Shortcut, &normal);
        let sc = shortcut.uuid();
        store.entries.insert(sc, shortcut);
        assert_eq!(
            store.check_base(&dep, &sc, DependentKind::Alias),
            Err(BaseEntryError::WrongTargetType(DependentKind::Alias))
        );
    }

    #[test]
    fn test_alias_of_alias_collapses() {
        let mut store = test_store();
        let base = add_plain(&mut store, "G", "Base", "", "pw");
        let mut alias = Entry::new();
        alias.make_dependent(DependentKind::Alias, &base);
        let alias_uuid = alias.uuid();
        store.entries.insert(alias_uuid, alias);

        let dep = Uuid::new_v4();
        assert_eq!(store.check_base(&dep, &alias_uuid, DependentKind::Alias), Ok(base));
    }

    #[test]
    fn test_base_cannot_become_dependent() {
        let mut store = test_store();
        let target = add_plain(&mut store, "G", "Target", "", "pw");
        let base = add_plain(&mut store, "G", "Base", "", "[Target]");
        let mut alias = Entry::new();
        alias.make_dependent(DependentKind::Alias, &base);
        store.entries.insert(alias.uuid(), alias);
        if let Some(e) = store.entries.get_mut(&base) {
            e.set_entry_type(EntryType::AliasBase);
        }

        assert_eq!(
            store.check_base(&base, &target, DependentKind::Alias),
            Err(BaseEntryError::DependentIsBase)
        );
        assert_eq!(
            store.check_alias_password("[Target]", &base, DependentKind::Shortcut),
            Err(BaseEntryError::DependentIsBase)
        );
    }

    #[test]
    fn test_check_alias_password() {
        let mut store = test_store();
        let base = add_plain(&mut store, "G", "Base", "", "pw");
        let dep = add_plain(&mut store, "G", "Dep", "", "");

        assert_eq!(store.check_alias_password("plain", &dep, DependentKind::Alias), Ok(None));
        assert_eq!(store.check_alias_password("[G:Base]", &dep, DependentKind::Alias), Ok(Some(base)));
        assert_eq!(
            store.check_alias_password("[Missing]", &dep, DependentKind::Alias),
            Err(BaseEntryError::NotFound("[Missing]".to_string()))
        );
        let err = store.check_alias_password("[Dep]", &dep, DependentKind::Shortcut).unwrap_err();
        assert_eq!(err, BaseEntryError::SelfReference);
        assert!(err.to_string().contains("own base"));
    }
}
