//! Password entries
//!
//! An [`Entry`] is an encrypted [`Item`] plus its role in the alias/shortcut
//! graph and its session status. Dependent entries (aliases and shortcuts)
//! only name their base through the base UUID field; the store keeps the
//! reverse direction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::utils::{format_time, now_time, SECONDS_PER_DAY};
use super::field_type::{FieldType, ValueKind};
use super::item::Item;
use super::matching::{self, MatchRule};
use super::policy::PasswordPolicy;
use super::pwhistory::{PwHistory, PwhError, PwhValidation};

/// Default TOTP code length
pub const TOTP_DEFAULT_LENGTH: u8 = 6;

/// Default TOTP time step in seconds
pub const TOTP_DEFAULT_TIME_STEP: u8 = 30;

/// Role of an entry in the alias/shortcut graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    Normal,
    AliasBase,
    Alias,
    ShortcutBase,
    Shortcut,
}

impl EntryType {
    pub fn is_dependent(self) -> bool {
        matches!(self, EntryType::Alias | EntryType::Shortcut)
    }

    pub fn is_base(self) -> bool {
        matches!(self, EntryType::AliasBase | EntryType::ShortcutBase)
    }

    /// Kind of dependent this entry is, or is the base of
    pub fn dependent_kind(self) -> Option<DependentKind> {
        match self {
            EntryType::Alias | EntryType::AliasBase => Some(DependentKind::Alias),
            EntryType::Shortcut | EntryType::ShortcutBase => Some(DependentKind::Shortcut),
            EntryType::Normal => None,
        }
    }
}

/// The two kinds of dependent entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependentKind {
    Alias,
    Shortcut,
}

impl DependentKind {
    pub fn name(self) -> &'static str {
        match self {
            DependentKind::Alias => "alias",
            DependentKind::Shortcut => "shortcut",
        }
    }

    pub fn dependent_type(self) -> EntryType {
        match self {
            DependentKind::Alias => EntryType::Alias,
            DependentKind::Shortcut => EntryType::Shortcut,
        }
    }

    pub fn base_type(self) -> EntryType {
        match self {
            DependentKind::Alias => EntryType::AliasBase,
            DependentKind::Shortcut => EntryType::ShortcutBase,
        }
    }

    /// True if a dependent of this kind reads `ft` from its base
    pub fn base_supplies(self, ft: FieldType) -> bool {
        match self {
            DependentKind::Alias => matches!(
                ft,
                FieldType::Password
                    | FieldType::PwHistory
                    | FieldType::PMTime
                    | FieldType::XTime
                    | FieldType::XTimeInterval
                    | FieldType::Policy
                    | FieldType::PolicyName
                    | FieldType::Symbols
            ),
            DependentKind::Shortcut => !matches!(
                ft,
                FieldType::GroupTitle
                    | FieldType::Group
                    | FieldType::Title
                    | FieldType::User
                    | FieldType::Uuid
                    | FieldType::BaseUuid
                    | FieldType::CTime
                    | FieldType::ATime
                    | FieldType::RMTime
            ),
        }
    }

    /// On-disk password marker wrapping a base reference
    pub fn markers(self) -> (&'static str, &'static str) {
        match self {
            DependentKind::Alias => ("[[", "]]"),
            DependentKind::Shortcut => ("[~", "~]"),
        }
    }
}

/// Session status of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryStatus {
    Clean,
    Added,
    Modified,
    Deleted,
}

/// History settings applied when an entry has no history of its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryDefaults {
    pub save: bool,
    pub max: usize,
}

/// Password record, possibly a base or dependent of other records
#[derive(Clone, Debug)]
pub struct Entry {
    item: Item,
    entry_type: EntryType,
    status: EntryStatus,
}

impl Default for Entry {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.entry_type == other.entry_type && self.status == other.status && self.item == other.item
    }
}

impl Entry {
    /// Create a normal entry with a fresh UUID
    pub fn new() -> Self {
        let mut entry = Self {
            item: Item::new(),
            entry_type: EntryType::Normal,
            status: EntryStatus::Clean,
        };
        entry.create_uuid();
        entry
    }

    /// Underlying encrypted item
    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn item_mut(&mut self) -> &mut Item {
        &mut self.item
    }

    pub fn uuid(&self) -> Uuid {
        self.item.get_uuid(FieldType::Uuid.code()).unwrap_or_else(Uuid::nil)
    }

    pub fn set_uuid(&mut self, uuid: &Uuid) {
        self.item.set_uuid(FieldType::Uuid.code(), uuid);
    }

    pub fn create_uuid(&mut self) {
        self.set_uuid(&Uuid::new_v4());
    }

    /// Decrypted raw bytes of a field
    pub fn raw_field(&self, ft: FieldType) -> Zeroizing<Vec<u8>> {
        self.item.get_field(ft.code())
    }

    pub fn is_field_set(&self, ft: FieldType) -> bool {
        if ft == FieldType::GroupTitle {
            return self.is_field_set(FieldType::Group) || self.is_field_set(FieldType::Title);
        }
        self.item.is_field_set(ft.code())
    }

    pub fn clear_field(&mut self, ft: FieldType) {
        self.item.clear_field(ft.code());
    }

    /// A text field's value
    pub fn field(&self, ft: FieldType) -> String {
        self.item.get_text(ft.code())
    }

    /// Set a text field; an empty value clears it
    pub fn set_field(&mut self, ft: FieldType, value: &str) {
        self.item.set_text(ft.code(), value);
    }

    /// Any field rendered as text: times formatted, numbers in decimal
    pub fn field_value(&self, ft: FieldType) -> String {
        let code = ft.code();
        match ft.value_kind() {
            _ if ft == FieldType::GroupTitle => self.group_title(),
            ValueKind::Text => self.item.get_text(code),
            ValueKind::Time => {
                let t = self.item.get_time(code);
                if t == 0 { String::new() } else { format_time(t) }
            }
            ValueKind::Uuid => self.item.get_uuid(code).map(|u| u.to_string()).unwrap_or_default(),
            ValueKind::Byte => self.item.get_byte(code).map(|v| v.to_string()).unwrap_or_default(),
            ValueKind::Short => self.item.get_short(code).map(|v| v.to_string()).unwrap_or_default(),
            ValueKind::Int => self.item.get_int(code).map(|v| v.to_string()).unwrap_or_default(),
            ValueKind::Binary => self.raw_field(ft).iter().map(|b| format!("{:02x}", b)).collect(),
        }
    }

    /// Set any field from its text rendering, as produced by [`Entry::field_value`]
    ///
    /// Returns false if the text does not parse for the field's kind.
    pub fn set_field_value(&mut self, ft: FieldType, value: &str) -> bool {
        let code = ft.code();
        if value.is_empty() {
            self.item.clear_field(code);
            return true;
        }
        match ft.value_kind() {
            _ if ft == FieldType::GroupTitle => return false,
            ValueKind::Text => self.item.set_text(code, value),
            ValueKind::Time => match crate::utils::parse_time(value) {
                Some(t) => self.item.set_time(code, t),
                None => return false,
            },
            ValueKind::Uuid => match Uuid::parse_str(value) {
                Ok(u) => self.item.set_uuid(code, &u),
                Err(_) => return false,
            },
            ValueKind::Byte => match value.parse::<u8>() {
                Ok(v) => self.item.set_byte(code, v),
                Err(_) => return false,
            },
            ValueKind::Short => match value.parse::<i16>() {
                Ok(v) => self.item.set_short(code, v),
                Err(_) => return false,
            },
            ValueKind::Int => match value.parse::<i32>() {
                Ok(v) => self.item.set_int(code, v),
                Err(_) => return false,
            },
            ValueKind::Binary => {
                let bytes: Option<Vec<u8>> = (0..value.len())
                    .step_by(2)
                    .map(|i| value.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok()))
                    .collect();
                match bytes {
                    Some(b) => self.item.set_field(code, &b),
                    None => return false,
                }
            }
        }
        true
    }

    pub fn group(&self) -> String {
        self.field(FieldType::Group)
    }

    pub fn title(&self) -> String {
        self.field(FieldType::Title)
    }

    pub fn user(&self) -> String {
        self.field(FieldType::User)
    }

    /// The entry's own password; for dependents see [`Entry::effective_field_value`]
    pub fn password(&self) -> String {
        self.field(FieldType::Password)
    }

    pub fn notes(&self) -> String {
        self.field(FieldType::Notes)
    }

    pub fn url(&self) -> String {
        self.field(FieldType::Url)
    }

    pub fn email(&self) -> String {
        self.field(FieldType::Email)
    }

    pub fn set_group(&mut self, value: &str) {
        self.set_field(FieldType::Group, value);
    }

    pub fn set_title(&mut self, value: &str) {
        self.set_field(FieldType::Title, value);
    }

    pub fn set_user(&mut self, value: &str) {
        self.set_field(FieldType::User, value);
    }

    pub fn set_password(&mut self, value: &str) {
        self.set_field(FieldType::Password, value);
    }

    pub fn set_notes(&mut self, value: &str) {
        self.set_field(FieldType::Notes, value);
    }

    /// `group.title`, or just the title for ungrouped entries
    pub fn group_title(&self) -> String {
        let group = self.group();
        if group.is_empty() {
            self.title()
        } else {
            format!("{}.{}", group, self.title())
        }
    }

    pub fn time(&self, ft: FieldType) -> i64 {
        self.item.get_time(ft.code())
    }

    pub fn set_time(&mut self, ft: FieldType, t: i64) {
        self.item.set_time(ft.code(), t);
    }

    pub fn xtime(&self) -> i64 {
        self.time(FieldType::XTime)
    }

    pub fn set_xtime(&mut self, t: i64) {
        self.set_time(FieldType::XTime, t);
    }

    /// Password expiry interval in days, 0 if unset
    pub fn xtime_interval(&self) -> i32 {
        self.item.get_int(FieldType::XTimeInterval.code()).unwrap_or(0)
    }

    pub fn set_xtime_interval(&mut self, days: i32) {
        if days <= 0 {
            self.clear_field(FieldType::XTimeInterval);
        } else {
            self.item.set_int(FieldType::XTimeInterval.code(), days);
        }
    }

    /// True once the expiry time has passed
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_time())
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        let xtime = self.xtime();
        xtime != 0 && xtime <= now
    }

    /// True if the entry expires within `days` days, including already expired
    pub fn will_expire(&self, days: i64) -> bool {
        self.will_expire_at(days, now_time())
    }

    pub fn will_expire_at(&self, days: i64, now: i64) -> bool {
        let xtime = self.xtime();
        xtime != 0 && xtime < now + days * SECONDS_PER_DAY
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn set_entry_type(&mut self, entry_type: EntryType) {
        self.entry_type = entry_type;
    }

    pub fn is_normal(&self) -> bool {
        self.entry_type == EntryType::Normal
    }

    pub fn is_alias(&self) -> bool {
        self.entry_type == EntryType::Alias
    }

    pub fn is_shortcut(&self) -> bool {
        self.entry_type == EntryType::Shortcut
    }

    pub fn is_alias_base(&self) -> bool {
        self.entry_type == EntryType::AliasBase
    }

    pub fn is_shortcut_base(&self) -> bool {
        self.entry_type == EntryType::ShortcutBase
    }

    pub fn is_base(&self) -> bool {
        self.entry_type.is_base()
    }

    pub fn is_dependent(&self) -> bool {
        self.entry_type.is_dependent()
    }

    /// Turn into a dependent of `base`; the password becomes the base's
    pub fn make_dependent(&mut self, kind: DependentKind, base: &Uuid) {
        self.entry_type = kind.dependent_type();
        self.item.set_uuid(FieldType::BaseUuid.code(), base);
        self.clear_field(FieldType::Password);
    }

    /// Drop any dependent link and become a normal entry
    pub fn make_normal(&mut self) {
        self.entry_type = EntryType::Normal;
        self.clear_field(FieldType::BaseUuid);
    }

    pub fn base_uuid(&self) -> Option<Uuid> {
        self.item.get_uuid(FieldType::BaseUuid.code())
    }

    pub fn set_base_uuid(&mut self, uuid: &Uuid) {
        self.item.set_uuid(FieldType::BaseUuid.code(), uuid);
    }

    pub fn status(&self) -> EntryStatus {
        self.status
    }

    pub fn set_status(&mut self, status: EntryStatus) {
        self.status = status;
    }

    /// Mark modified unless the entry is new this session
    pub fn touch_status(&mut self) {
        if self.status == EntryStatus::Clean {
            self.status = EntryStatus::Modified;
        }
    }

    pub fn is_protected(&self) -> bool {
        self.item.get_byte(FieldType::Protected.code()).is_some_and(|b| b != 0)
    }

    pub fn set_protected(&mut self, protected: bool) {
        if protected {
            self.item.set_byte(FieldType::Protected.code(), 1);
        } else {
            self.clear_field(FieldType::Protected);
        }
    }

    pub fn attachment_ref(&self) -> Option<Uuid> {
        self.item.get_uuid(FieldType::AttRef.code())
    }

    pub fn set_attachment_ref(&mut self, uuid: Option<&Uuid>) {
        match uuid {
            Some(u) => self.item.set_uuid(FieldType::AttRef.code(), u),
            None => self.clear_field(FieldType::AttRef),
        }
    }

    pub fn has_attachment(&self) -> bool {
        self.attachment_ref().is_some()
    }

    /// Value used at display/use time
    ///
    /// Normal and base entries return their own value. Dependents read the
    /// fields their kind delegates from `base`; without a base they yield an
    /// empty value.
    pub fn effective_field_value(&self, ft: FieldType, base: Option<&Entry>) -> String {
        let Some(kind) = self.entry_type.dependent_kind().filter(|_| self.is_dependent()) else {
            return self.field_value(ft);
        };
        let Some(base) = base else {
            log::warn!("No base supplied for dependent entry {}", self.uuid());
            return String::new();
        };
        if kind.base_supplies(ft) {
            base.field_value(ft)
        } else {
            self.field_value(ft)
        }
    }

    pub fn pw_history_string(&self) -> String {
        self.field(FieldType::PwHistory)
    }

    pub fn pw_history(&self) -> Result<PwHistory, PwhError> {
        PwHistory::parse(&self.pw_history_string())
    }

    pub fn set_pw_history(&mut self, history: &PwHistory) {
        self.set_field(FieldType::PwHistory, &history.serialize());
    }

    /// The password replaced most recently, if history kept it
    pub fn previous_password(&self) -> Option<String> {
        self.pw_history()
            .ok()
            .and_then(|h| h.previous_password().map(str::to_string))
    }

    /// Check the history field for self-consistency
    ///
    /// A maximum smaller than the number of kept entries is raised to fit and
    /// reported as [`PwhValidation::Repaired`]. Anything unparseable is removed
    /// and reported as [`PwhValidation::Discarded`].
    pub fn validate_pw_history(&mut self) -> PwhValidation {
        match self.pw_history() {
            Ok(history) if history.max >= history.entries.len() => PwhValidation::Valid,
            Ok(mut history) => {
                history.max = history.entries.len();
                self.set_pw_history(&history);
                PwhValidation::Repaired
            }
            Err(e) => {
                log::warn!("Discarding password history of {}: {}", self.uuid(), e);
                self.clear_field(FieldType::PwHistory);
                PwhValidation::Discarded(e)
            }
        }
    }

    /// Replace the password, rolling the current one into history
    ///
    /// Also stamps the password modification time and, when an expiry
    /// interval is set, moves the expiry time forward. An unreadable history
    /// is restarted empty and comes back as [`PwhValidation::Discarded`].
    pub fn update_password(&mut self, password: &str, defaults: &HistoryDefaults) -> PwhValidation {
        self.update_password_at(password, defaults, now_time())
    }

    pub fn update_password_at(&mut self, password: &str, defaults: &HistoryDefaults, now: i64) -> PwhValidation {
        let mut validation = PwhValidation::Valid;
        let mut history = if self.is_field_set(FieldType::PwHistory) {
            match self.pw_history() {
                Ok(history) => history,
                Err(e) => {
                    log::warn!("Password history of {} unreadable, restarting it: {}", self.uuid(), e);
                    validation = PwhValidation::Discarded(e);
                    PwHistory::default()
                }
            }
        } else if defaults.save {
            PwHistory::enabled_with(defaults.max)
        } else {
            PwHistory::default()
        };

        let old = Zeroizing::new(self.password());
        if history.enabled && !old.is_empty() {
            let mut changed = self.time(FieldType::PMTime);
            if changed == 0 {
                changed = self.time(FieldType::CTime);
            }
            if changed == 0 {
                changed = now;
            }
            history.push(&old, changed);
        }

        let interval = self.xtime_interval();

        // All values computed; apply together
        self.set_pw_history(&history);
        self.set_password(password);
        self.set_time(FieldType::PMTime, now);
        if interval > 0 {
            self.set_xtime(now + interval as i64 * SECONDS_PER_DAY);
        }
        validation
    }

    /// Inline policy, if the entry carries one
    pub fn policy(&self) -> Option<PasswordPolicy> {
        let s = self.field(FieldType::Policy);
        if s.is_empty() {
            return None;
        }
        PasswordPolicy::parse(&s, &self.field(FieldType::Symbols)).ok()
    }

    pub fn set_policy(&mut self, policy: Option<&PasswordPolicy>) {
        match policy {
            Some(p) => {
                self.set_field(FieldType::Policy, &p.serialize());
                self.set_field(FieldType::Symbols, &p.symbols);
            }
            None => {
                self.clear_field(FieldType::Policy);
                self.clear_field(FieldType::Symbols);
            }
        }
    }

    pub fn policy_name(&self) -> String {
        self.field(FieldType::PolicyName)
    }

    pub fn set_policy_name(&mut self, name: &str) {
        self.set_field(FieldType::PolicyName, name);
    }

    pub fn two_factor_key(&self) -> Zeroizing<Vec<u8>> {
        self.raw_field(FieldType::TwoFactorKey)
    }

    pub fn set_two_factor_key(&mut self, key: &[u8]) {
        self.item.set_field(FieldType::TwoFactorKey.code(), key);
    }

    pub fn totp_config(&self) -> u8 {
        self.item.get_byte(FieldType::TotpConfig.code()).unwrap_or(0)
    }

    pub fn set_totp_config(&mut self, config: u8) {
        self.item.set_byte(FieldType::TotpConfig.code(), config);
    }

    pub fn totp_length(&self) -> u8 {
        self.item.get_byte(FieldType::TotpLength.code()).unwrap_or(TOTP_DEFAULT_LENGTH)
    }

    pub fn set_totp_length(&mut self, length: u8) {
        self.item.set_byte(FieldType::TotpLength.code(), length);
    }

    pub fn totp_time_step(&self) -> u8 {
        self.item.get_byte(FieldType::TotpTimeStep.code()).unwrap_or(TOTP_DEFAULT_TIME_STEP)
    }

    pub fn set_totp_time_step(&mut self, step: u8) {
        self.item.set_byte(FieldType::TotpTimeStep.code(), step);
    }

    pub fn totp_start_time(&self) -> i64 {
        self.time(FieldType::TotpStartTime)
    }

    pub fn set_totp_start_time(&mut self, t: i64) {
        self.set_time(FieldType::TotpStartTime, t);
    }

    /// Match a text field, reading delegated fields from `base`
    pub fn matches_string(
        &self,
        value: &str,
        case_sensitive: bool,
        ft: FieldType,
        rule: MatchRule,
        base: Option<&Entry>,
    ) -> bool {
        let field_value = Zeroizing::new(self.effective_field_value(ft, base));
        matching::match_string(value, case_sensitive, &field_value, rule)
    }

    /// Match a numeric field
    pub fn matches_integer(&self, num1: i64, num2: i64, ft: FieldType, rule: MatchRule) -> bool {
        let code = ft.code();
        let value = match ft.value_kind() {
            ValueKind::Byte => self.item.get_byte(code).map(i64::from),
            ValueKind::Short => self.item.get_short(code).map(i64::from),
            ValueKind::Int => self.item.get_int(code).map(i64::from),
            _ => Some(self.item.field_len(code) as i64),
        }
        .unwrap_or(0);
        matching::match_integer(num1, num2, value, rule)
    }

    /// Match a time field at day granularity
    pub fn matches_date(&self, t1: i64, t2: i64, ft: FieldType, rule: MatchRule, base: Option<&Entry>) -> bool {
        let source = match (self.entry_type.dependent_kind(), base) {
            (Some(kind), Some(b)) if self.is_dependent() && kind.base_supplies(ft) => b,
            _ => self,
        };
        let value = source.time(ft);
        match rule {
            MatchRule::Expired => source.is_expired(),
            MatchRule::WillExpire => source.will_expire(t1),
            _ => matching::match_date(t1, t2, value, rule),
        }
    }

    /// Match field presence, or the protected flag for [`FieldType::Protected`]
    pub fn matches_bool(&self, ft: FieldType, rule: MatchRule) -> bool {
        let value = if ft == FieldType::Protected {
            self.is_protected()
        } else {
            self.is_field_set(ft)
        };
        matching::match_bool(value, rule)
    }

    pub fn matches_entry_type(&self, entry_type: EntryType, rule: MatchRule) -> bool {
        matching::match_bool(self.entry_type == entry_type, rule)
    }

    pub fn matches_entry_status(&self, status: EntryStatus, rule: MatchRule) -> bool {
        matching::match_bool(self.status == status, rule)
    }

    /// Build an entry from ordered `(type, bytes)` records
    ///
    /// Unrecognised types are kept for passthrough. The result is always a
    /// normal entry; dependent markers in the password are resolved by the
    /// store after loading.
    pub fn from_raw_fields<'a, I>(records: I) -> Entry
    where
        I: IntoIterator<Item = (u8, &'a [u8])>,
    {
        let mut entry = Entry {
            item: Item::new(),
            entry_type: EntryType::Normal,
            status: EntryStatus::Clean,
        };
        for (code, value) in records {
            match FieldType::from_code(code) {
                Some(ft) if ft != FieldType::GroupTitle && ft != FieldType::BaseUuid => {
                    entry.item.set_field(code, value)
                }
                _ => entry.item.add_unknown_field(code, value),
            }
        }
        if entry.uuid().is_nil() {
            entry.create_uuid();
        }
        entry
    }

    /// Serialize to ordered `(type, bytes)` records
    ///
    /// Known fields come first in code order, then unknown fields in their
    /// original order. Dependents store their base reference in the password
    /// as `[[<uuid>]]` for aliases and `[~<uuid>~]` for shortcuts.
    pub fn to_raw_fields(&self) -> Vec<(u8, Zeroizing<Vec<u8>>)> {
        let mut out = Vec::with_capacity(self.item.num_fields() + self.item.num_unknown_fields());
        let dependent = self
            .entry_type
            .dependent_kind()
            .filter(|_| self.is_dependent())
            .zip(self.base_uuid());

        for code in self.item.field_types() {
            if code == FieldType::BaseUuid.code() {
                continue;
            }
            out.push((code, self.item.get_field(code)));
        }

        if let Some((kind, base)) = dependent {
            let (open, close) = kind.markers();
            let marker = format!("{}{}{}", open, base.simple(), close);
            out.retain(|(code, _)| *code != FieldType::Password.code());
            out.push((FieldType::Password.code(), Zeroizing::new(marker.into_bytes())));
            out.sort_by_key(|(code, _)| *code);
        }

        out.extend(self.item.unknown_fields());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        let mut entry = Entry::new();
        entry.set_group("Banking");
        entry.set_title("MyBank");
        entry.set_user("alice");
        entry.set_password("s3cret");
        entry
    }

    const DEFAULTS: HistoryDefaults = HistoryDefaults { save: true, max: 3 };

    #[test]
    fn test_new_has_uuid() {
        let entry = Entry::new();
        assert!(!entry.uuid().is_nil());
        assert!(entry.is_normal());
        assert_eq!(entry.status(), EntryStatus::Clean);
    }

    #[test]
    fn test_field_roundtrip_all_text_fields() {
        let mut entry = Entry::new();
        for ft in FieldType::ALL.iter().filter(|f| f.value_kind() == ValueKind::Text) {
            entry.set_field(*ft, "value\0with null");
            assert_eq!(entry.field(*ft), "value\0with null", "field {:?}", ft);
            entry.set_field(*ft, "");
            assert_eq!(entry.field(*ft), "");
        }
    }

    #[test]
    fn test_group_title() {
        let entry = sample();
        assert_eq!(entry.group_title(), "Banking.MyBank");
        assert_eq!(entry.field_value(FieldType::GroupTitle), "Banking.MyBank");
    }

    #[test]
    fn test_set_field_value_by_kind() {
        let mut entry = Entry::new();
        assert!(entry.set_field_value(FieldType::XTimeInterval, "30"));
        assert_eq!(entry.xtime_interval(), 30);
        assert!(entry.set_field_value(FieldType::Protected, "1"));
        assert!(entry.is_protected());
        assert!(!entry.set_field_value(FieldType::Dca, "x"));
        assert!(entry.set_field_value(FieldType::TwoFactorKey, "00ff10"));
        assert_eq!(entry.two_factor_key().as_slice(), &[0x00, 0xff, 0x10]);
        assert_eq!(entry.field_value(FieldType::TwoFactorKey), "00ff10");
    }

    #[test]
    fn test_update_password_evicts_oldest() {
        let mut entry = sample();
        let mut history = PwHistory::enabled_with(3);
        history.push("one", 1);
        history.push("two", 2);
        history.push("three", 3);
        entry.set_pw_history(&history);

        entry.update_password_at("new", &DEFAULTS, 1_000);

        let history = entry.pw_history().unwrap();
        assert_eq!(history.entries.len(), 3);
        assert_eq!(history.entries[0].password, "two");
        assert_eq!(history.entries[2].password, "s3cret");
        assert_eq!(entry.previous_password().as_deref(), Some("s3cret"));
        assert_eq!(entry.password(), "new");
        assert_eq!(entry.time(FieldType::PMTime), 1_000);
    }

    #[test]
    fn test_update_password_uses_defaults_when_unset() {
        let mut entry = sample();
        entry.update_password_at("new", &DEFAULTS, 50);
        let history = entry.pw_history().unwrap();
        assert!(history.enabled);
        assert_eq!(history.max, 3);
        assert_eq!(history.entries[0].changed, 50);

        let mut entry = sample();
        entry.update_password_at("new", &HistoryDefaults { save: false, max: 3 }, 50);
        assert!(!entry.is_field_set(FieldType::PwHistory));
        assert_eq!(entry.previous_password(), None);
    }

    #[test]
    fn test_update_password_history_disabled() {
        let mut entry = sample();
        entry.set_pw_history(&PwHistory { enabled: false, max: 3, entries: Vec::new() });
        entry.update_password_at("new", &DEFAULTS, 10);
        assert!(entry.pw_history().unwrap().entries.is_empty());
    }

    #[test]
    fn test_update_password_moves_expiry() {
        let mut entry = sample();
        entry.set_xtime_interval(10);
        entry.update_password_at("new", &DEFAULTS, 1_000);
        assert_eq!(entry.xtime(), 1_000 + 10 * SECONDS_PER_DAY);
    }

    #[test]
    fn test_update_password_reports_discarded_history() {
        let mut entry = sample();
        entry.set_field(FieldType::PwHistory, "1zz");
        assert_eq!(
            entry.update_password_at("new", &DEFAULTS, 10),
            PwhValidation::Discarded(PwhError::InvalidHeader)
        );
        assert_eq!(entry.password(), "new");
        assert!(entry.pw_history().unwrap().entries.is_empty());

        assert_eq!(entry.update_password_at("newer", &DEFAULTS, 20), PwhValidation::Valid);
    }

    #[test]
    fn test_validate_pw_history() {
        let mut entry = sample();
        assert_eq!(entry.validate_pw_history(), PwhValidation::Valid);

        entry.set_field(FieldType::PwHistory, "10102499602d00001a499602d00001b");
        assert_eq!(entry.validate_pw_history(), PwhValidation::Repaired);
        assert_eq!(entry.pw_history().unwrap().max, 2);

        entry.set_field(FieldType::PwHistory, "1zz");
        assert_eq!(entry.validate_pw_history(), PwhValidation::Discarded(PwhError::InvalidHeader));
        assert!(!entry.is_field_set(FieldType::PwHistory));
    }

    #[test]
    fn test_expiry() {
        let mut entry = sample();
        assert!(!entry.is_expired_at(100));
        entry.set_xtime(100);
        assert!(entry.is_expired_at(100));
        assert!(!entry.is_expired_at(99));
        assert!(entry.will_expire_at(1, 99));
        assert!(!entry.will_expire_at(0, 99 - SECONDS_PER_DAY));
    }

    #[test]
    fn test_effective_value_alias() {
        let base = sample();
        let mut alias = Entry::new();
        alias.set_title("Alias");
        alias.set_notes("alias notes");
        alias.make_dependent(DependentKind::Alias, &base.uuid());

        assert_eq!(alias.effective_field_value(FieldType::Password, Some(&base)), "s3cret");
        assert_eq!(alias.effective_field_value(FieldType::Title, Some(&base)), "Alias");
        assert_eq!(alias.effective_field_value(FieldType::Notes, Some(&base)), "alias notes");
        assert_eq!(alias.effective_field_value(FieldType::Password, None), "");
    }

    #[test]
    fn test_effective_value_shortcut() {
        let mut base = sample();
        base.set_notes("base notes");
        let mut shortcut = Entry::new();
        shortcut.set_title("Short");
        shortcut.make_dependent(DependentKind::Shortcut, &base.uuid());

        assert_eq!(shortcut.effective_field_value(FieldType::Notes, Some(&base)), "base notes");
        assert_eq!(shortcut.effective_field_value(FieldType::Password, Some(&base)), "s3cret");
        assert_eq!(shortcut.effective_field_value(FieldType::Title, Some(&base)), "Short");
    }

    #[test]
    fn test_matches() {
        let entry = sample();
        assert!(entry.matches_string("bank", false, FieldType::Title, MatchRule::Contains, None));
        assert!(!entry.matches_string("bank", true, FieldType::Title, MatchRule::Contains, None));
        assert!(entry.matches_bool(FieldType::Url, MatchRule::NotPresent));
        assert!(entry.matches_entry_type(EntryType::Normal, MatchRule::Is));
        assert!(entry.matches_entry_status(EntryStatus::Added, MatchRule::IsNot));
        assert!(entry.matches_integer(6, 0, FieldType::Password, MatchRule::Equals));
    }

    #[test]
    fn test_raw_fields_preserve_unknown() {
        let uuid = Uuid::new_v4();
        let records: Vec<(u8, Vec<u8>)> = vec![
            (0x01, uuid.as_bytes().to_vec()),
            (0x03, b"Title".to_vec()),
            (0xd0, vec![9, 8, 7, 0, 6]),
            (0x06, b"pw".to_vec()),
        ];
        let mut entry = Entry::from_raw_fields(records.iter().map(|(c, v)| (*c, v.as_slice())));
        assert_eq!(entry.uuid(), uuid);
        assert_eq!(entry.item().num_unknown_fields(), 1);

        entry.set_notes("edited");
        entry.update_password_at("pw2", &DEFAULTS, 5);

        let out = entry.to_raw_fields();
        let unknown: Vec<_> = out.iter().filter(|(c, _)| *c == 0xd0).collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].1.as_slice(), &[9, 8, 7, 0, 6]);
        assert_eq!(out.last().map(|(c, _)| *c), Some(0xd0));
    }

    #[test]
    fn test_raw_fields_dependent_marker() {
        let base = Uuid::new_v4();
        let mut alias = sample();
        alias.make_dependent(DependentKind::Alias, &base);
        let out = alias.to_raw_fields();
        let pw = out.iter().find(|(c, _)| *c == FieldType::Password.code()).unwrap();
        assert_eq!(pw.1.as_slice(), format!("[[{}]]", base.simple()).as_bytes());
        assert!(!out.iter().any(|(c, _)| *c == FieldType::BaseUuid.code()));
    }
}
