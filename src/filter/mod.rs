//! Entry filters
//!
//! A [`Filter`] is a list of rows, each testing one property of an entry with
//! a [`MatchRule`]. Rows are joined by `and`/`or` where `and` binds tighter:
//! the filter passes if every row of at least one `and`-group passes.
//! Password history, password policy and attachment properties are tested by
//! separate row lists, referenced from the main list by a marker row.

mod xml;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::item::{
    Attachment, Entry, EntryStatus, EntryType, FieldType, MatchRule, PasswordPolicy, PwHistEntry,
};
use crate::item::matching::{match_bool, match_date, match_integer, match_string};

pub use xml::{merge_filters, parse_filters, write_filters, FilterImport};

/// Where a filter is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FilterPool {
    Database,
    Application,
    Imported,
}

/// Filters keyed by pool and name
pub type FilterMap = BTreeMap<(FilterPool, String), Filter>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterLogic {
    And,
    Or,
}

/// What a row tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterField {
    Field(FieldType),
    EntryType,
    EntryStatus,
    EntrySize,
    UnknownFields,
    /// Marker: apply the history rows
    PasswordHistory,
    /// Marker: apply the policy rows
    PasswordPolicy,
    /// Marker: apply the attachment rows
    Attachment,

    HistoryPresent,
    HistoryActive,
    HistoryNumber,
    HistoryMax,
    HistoryChangeDate,
    HistoryPassword,

    PolicyPresent,
    PolicyLength,
    PolicyLowercase,
    PolicyUppercase,
    PolicyDigits,
    PolicySymbols,
    PolicyHexDigits,
    PolicyEasyVision,
    PolicyPronounceable,

    AttachmentPresent,
    AttachmentTitle,
    AttachmentFileName,
    AttachmentMediaType,
}

const PSEUDO_FIELD_NAMES: &[(FilterField, &str)] = &[
    (FilterField::EntryType, "entrytype"),
    (FilterField::EntryStatus, "entrystatus"),
    (FilterField::EntrySize, "entrysize"),
    (FilterField::UnknownFields, "unknownfields"),
    (FilterField::PasswordHistory, "password_history"),
    (FilterField::PasswordPolicy, "password_policy"),
    (FilterField::Attachment, "attachment_filter"),
    (FilterField::HistoryPresent, "history_present"),
    (FilterField::HistoryActive, "history_active"),
    (FilterField::HistoryNumber, "history_number"),
    (FilterField::HistoryMax, "history_maximum"),
    (FilterField::HistoryChangeDate, "history_changedate"),
    (FilterField::HistoryPassword, "history_passwords"),
    (FilterField::PolicyPresent, "policy_present"),
    (FilterField::PolicyLength, "policy_length"),
    (FilterField::PolicyLowercase, "policy_lowercase"),
    (FilterField::PolicyUppercase, "policy_uppercase"),
    (FilterField::PolicyDigits, "policy_digits"),
    (FilterField::PolicySymbols, "policy_symbols"),
    (FilterField::PolicyHexDigits, "policy_hexadecimal"),
    (FilterField::PolicyEasyVision, "policy_easyvision"),
    (FilterField::PolicyPronounceable, "policy_pronounceable"),
    (FilterField::AttachmentPresent, "attachment_present"),
    (FilterField::AttachmentTitle, "attachment_title"),
    (FilterField::AttachmentFileName, "attachment_filename"),
    (FilterField::AttachmentMediaType, "attachment_mediatype"),
];

/// Which row list a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Main,
    History,
    Policy,
    Attachment,
}

impl FilterField {
    /// Element name used in filter XML
    pub fn name(self) -> &'static str {
        match self {
            FilterField::Field(ft) => ft.name(),
            other => PSEUDO_FIELD_NAMES
                .iter()
                .find(|(f, _)| *f == other)
                .map(|(_, n)| *n)
                .unwrap_or(""),
        }
    }

    pub fn from_name(name: &str) -> Option<FilterField> {
        PSEUDO_FIELD_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(f, _)| *f)
            .or_else(|| FieldType::from_name(name).map(FilterField::Field))
    }

    pub fn row_kind(self) -> RowKind {
        use FilterField::*;
        match self {
            HistoryPresent | HistoryActive | HistoryNumber | HistoryMax | HistoryChangeDate
            | HistoryPassword => RowKind::History,
            PolicyPresent | PolicyLength | PolicyLowercase | PolicyUppercase | PolicyDigits
            | PolicySymbols | PolicyHexDigits | PolicyEasyVision | PolicyPronounceable => {
                RowKind::Policy
            }
            AttachmentPresent | AttachmentTitle | AttachmentFileName | AttachmentMediaType => {
                RowKind::Attachment
            }
            _ => RowKind::Main,
        }
    }
}

/// Operand of a row's rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterTest {
    /// Presence and yes/no rules carry no operand
    None,
    Text { value: String, case_sensitive: bool },
    Integer { num1: i64, num2: i64 },
    /// Epoch seconds; compared at day granularity
    Date { date1: i64, date2: i64 },
    EntryType(EntryType),
    EntryStatus(EntryStatus),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRow {
    pub active: bool,
    pub field: FilterField,
    pub rule: MatchRule,
    /// Join with the previous row; ignored on the first active row
    pub logic: FilterLogic,
    pub test: FilterTest,
}

impl FilterRow {
    pub fn new(field: FilterField, rule: MatchRule, test: FilterTest) -> Self {
        Self {
            active: true,
            field,
            rule,
            logic: FilterLogic::And,
            test,
        }
    }

    pub fn or(mut self) -> Self {
        self.logic = FilterLogic::Or;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub rows: Vec<FilterRow>,
    pub history_rows: Vec<FilterRow>,
    pub policy_rows: Vec<FilterRow>,
    pub attachment_rows: Vec<FilterRow>,
}

/// Evaluate rows joined by and/or, `and` binding tighter
fn evaluate<F>(rows: &[FilterRow], mut test: F) -> bool
where
    F: FnMut(&FilterRow) -> bool,
{
    let mut any_active = false;
    let mut group = true;
    for row in rows.iter().filter(|r| r.active) {
        if any_active && row.logic == FilterLogic::Or {
            if group {
                return true;
            }
            group = true;
        }
        any_active = true;
        if group {
            group = test(row);
        }
    }
    // No active rows: everything passes
    !any_active || group
}

impl Filter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a row to the list its field belongs to
    pub fn push(&mut self, row: FilterRow) {
        match row.field.row_kind() {
            RowKind::Main => self.rows.push(row),
            RowKind::History => self.history_rows.push(row),
            RowKind::Policy => self.policy_rows.push(row),
            RowKind::Attachment => self.attachment_rows.push(row),
        }
    }

    pub fn num_active(&self) -> usize {
        self.rows.iter().filter(|r| r.active).count()
    }

    /// Test an entry; dependents read delegated fields from `base`
    pub fn matches(&self, entry: &Entry, base: Option<&Entry>, attachment: Option<&Attachment>) -> bool {
        evaluate(&self.rows, |row| self.row_matches(row, entry, base, attachment))
    }

    fn row_matches(
        &self,
        row: &FilterRow,
        entry: &Entry,
        base: Option<&Entry>,
        attachment: Option<&Attachment>,
    ) -> bool {
        let rule = row.rule;
        match (row.field, &row.test) {
            (FilterField::Field(ft), FilterTest::Text { value, case_sensitive }) => {
                entry.matches_string(value, *case_sensitive, ft, rule, base)
            }
            (FilterField::Field(ft), FilterTest::Integer { num1, num2 }) => {
                entry.matches_integer(*num1, *num2, ft, rule)
            }
            (FilterField::Field(ft), FilterTest::Date { date1, date2 }) => {
                entry.matches_date(*date1, *date2, ft, rule, base)
            }
            (FilterField::Field(ft), FilterTest::None) => match rule {
                MatchRule::Expired | MatchRule::WillExpire => entry.matches_date(0, 0, ft, rule, base),
                _ => match_bool(source_for(entry, base, ft).is_field_set(ft), rule),
            },
            (FilterField::EntryType, FilterTest::EntryType(t)) => entry.matches_entry_type(*t, rule),
            (FilterField::EntryStatus, FilterTest::EntryStatus(s)) => entry.matches_entry_status(*s, rule),
            (FilterField::EntrySize, FilterTest::Integer { num1, num2 }) => {
                let size: usize = entry.to_raw_fields().iter().map(|(_, v)| v.len()).sum();
                match_integer(*num1, *num2, size as i64, rule)
            }
            (FilterField::UnknownFields, _) => match_bool(entry.item().num_unknown_fields() > 0, rule),
            (FilterField::PasswordHistory, _) => {
                let source = source_for(entry, base, FieldType::PwHistory);
                self.marker_matches(rule, &self.history_rows, source.is_field_set(FieldType::PwHistory), |r| {
                    history_row_matches(r, source)
                })
            }
            (FilterField::PasswordPolicy, _) => {
                let source = source_for(entry, base, FieldType::Policy);
                self.marker_matches(rule, &self.policy_rows, source.policy().is_some(), |r| {
                    policy_row_matches(r, source)
                })
            }
            (FilterField::Attachment, _) => {
                self.marker_matches(rule, &self.attachment_rows, attachment.is_some(), |r| {
                    attachment_row_matches(r, attachment)
                })
            }
            (field, test) => {
                log::debug!("Filter row {:?} has no test for {:?}", field, test);
                false
            }
        }
    }

    /// A marker row either tests presence or runs its sub-filter
    fn marker_matches<F>(&self, rule: MatchRule, rows: &[FilterRow], present: bool, test: F) -> bool
    where
        F: FnMut(&FilterRow) -> bool,
    {
        match rule {
            MatchRule::Present | MatchRule::NotPresent => match_bool(present, rule),
            _ => evaluate(rows, test),
        }
    }
}

/// The entry that holds `ft` for display: the base for delegated fields
fn source_for<'a>(entry: &'a Entry, base: Option<&'a Entry>, ft: FieldType) -> &'a Entry {
    match (entry.entry_type().dependent_kind(), base) {
        (Some(kind), Some(b)) if entry.is_dependent() && kind.base_supplies(ft) => b,
        _ => entry,
    }
}

fn history_row_matches(row: &FilterRow, entry: &Entry) -> bool {
    let present = entry.is_field_set(FieldType::PwHistory);
    let history = entry.pw_history().unwrap_or_default();
    match (row.field, &row.test) {
        (FilterField::HistoryPresent, _) => match_bool(present, row.rule),
        (FilterField::HistoryActive, _) => match_bool(history.enabled, row.rule),
        (FilterField::HistoryNumber, FilterTest::Integer { num1, num2 }) => {
            match_integer(*num1, *num2, history.entries.len() as i64, row.rule)
        }
        (FilterField::HistoryMax, FilterTest::Integer { num1, num2 }) => {
            match_integer(*num1, *num2, history.max as i64, row.rule)
        }
        (FilterField::HistoryChangeDate, FilterTest::Date { date1, date2 }) => history
            .entries
            .iter()
            .any(|h| match_date(*date1, *date2, h.changed, row.rule)),
        (FilterField::HistoryPassword, FilterTest::Text { value, case_sensitive }) => {
            let negated = row.rule.is_negated();
            let hit = |h: &PwHistEntry| match_string(value, *case_sensitive, &h.password, row.rule);
            if negated {
                history.entries.iter().all(hit)
            } else {
                history.entries.iter().any(hit)
            }
        }
        _ => false,
    }
}

fn policy_row_matches(row: &FilterRow, entry: &Entry) -> bool {
    let policy = entry.policy();
    let flag = |f: fn(&PasswordPolicy) -> bool| policy.as_ref().is_some_and(f);
    match (row.field, &row.test) {
        (FilterField::PolicyPresent, _) => match_bool(policy.is_some(), row.rule),
        (FilterField::PolicyLength, FilterTest::Integer { num1, num2 }) => {
            let len = policy.as_ref().map(|p| p.length as i64).unwrap_or(0);
            match_integer(*num1, *num2, len, row.rule)
        }
        (FilterField::PolicyLowercase, _) => match_bool(flag(PasswordPolicy::use_lowercase), row.rule),
        (FilterField::PolicyUppercase, _) => match_bool(flag(PasswordPolicy::use_uppercase), row.rule),
        (FilterField::PolicyDigits, _) => match_bool(flag(PasswordPolicy::use_digits), row.rule),
        (FilterField::PolicySymbols, _) => match_bool(flag(PasswordPolicy::use_symbols), row.rule),
        (FilterField::PolicyHexDigits, _) => match_bool(flag(PasswordPolicy::use_hex_digits), row.rule),
        (FilterField::PolicyEasyVision, _) => match_bool(flag(PasswordPolicy::use_easy_vision), row.rule),
        (FilterField::PolicyPronounceable, _) => match_bool(flag(PasswordPolicy::make_pronounceable), row.rule),
        _ => false,
    }
}

fn attachment_row_matches(row: &FilterRow, attachment: Option<&Attachment>) -> bool {
    let text = |value: &str, case_sensitive: bool, field: String| {
        match_string(value, case_sensitive, &field, row.rule)
    };
    match (row.field, &row.test, attachment) {
        (FilterField::AttachmentPresent, _, att) => match_bool(att.is_some(), row.rule),
        (FilterField::AttachmentTitle, FilterTest::Text { value, case_sensitive }, Some(att)) => {
            text(value, *case_sensitive, att.title())
        }
        (FilterField::AttachmentFileName, FilterTest::Text { value, case_sensitive }, Some(att)) => {
            text(value, *case_sensitive, att.file_name())
        }
        (FilterField::AttachmentMediaType, FilterTest::Text { value, case_sensitive }, Some(att)) => {
            text(value, *case_sensitive, att.media_type())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{DependentKind, HistoryDefaults};

    fn entry(group: &str, title: &str) -> Entry {
        let mut e = Entry::new();
        e.set_group(group);
        e.set_title(title);
        e.set_password("pw");
        e
    }

    fn text(field: FieldType, rule: MatchRule, value: &str) -> FilterRow {
        FilterRow::new(
            FilterField::Field(field),
            rule,
            FilterTest::Text { value: value.to_string(), case_sensitive: false },
        )
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let mut filter = Filter::new("f");
        filter.push(text(FieldType::Group, MatchRule::Equals, "work"));
        filter.push(text(FieldType::Title, MatchRule::Equals, "mail"));
        filter.push(text(FieldType::Title, MatchRule::Equals, "bank").or());

        assert!(filter.matches(&entry("Work", "Mail"), None, None));
        assert!(filter.matches(&entry("Home", "Bank"), None, None));
        assert!(!filter.matches(&entry("Home", "Mail"), None, None));
    }

    #[test]
    fn test_inactive_rows_ignored() {
        let mut filter = Filter::new("f");
        let mut row = text(FieldType::Title, MatchRule::Equals, "nothing");
        row.active = false;
        filter.push(row);
        assert!(filter.matches(&entry("a", "b"), None, None));
    }

    #[test]
    fn test_entry_type_row() {
        let mut filter = Filter::new("aliases");
        filter.push(FilterRow::new(
            FilterField::EntryType,
            MatchRule::Is,
            FilterTest::EntryType(EntryType::Alias),
        ));
        let base = entry("g", "base");
        let mut alias = entry("g", "alias");
        alias.make_dependent(DependentKind::Alias, &base.uuid());
        assert!(filter.matches(&alias, Some(&base), None));
        assert!(!filter.matches(&base, None, None));
    }

    #[test]
    fn test_history_subfilter() {
        let mut filter = Filter::new("history");
        filter.push(FilterRow::new(FilterField::PasswordHistory, MatchRule::Active, FilterTest::None));
        filter.push(FilterRow::new(
            FilterField::HistoryNumber,
            MatchRule::GreaterEqual,
            FilterTest::Integer { num1: 1, num2: 0 },
        ));

        let mut e = entry("g", "t");
        assert!(!filter.matches(&e, None, None));
        e.update_password("next", &HistoryDefaults { save: true, max: 3 });
        assert!(filter.matches(&e, None, None));
    }

    #[test]
    fn test_policy_subfilter() {
        let mut filter = Filter::new("policy");
        filter.push(FilterRow::new(FilterField::PasswordPolicy, MatchRule::Active, FilterTest::None));
        filter.push(FilterRow::new(FilterField::PolicyDigits, MatchRule::Set, FilterTest::None));

        let mut e = entry("g", "t");
        assert!(!filter.matches(&e, None, None));
        e.set_policy(Some(&PasswordPolicy::default()));
        assert!(filter.matches(&e, None, None));
    }

    #[test]
    fn test_attachment_subfilter() {
        let mut filter = Filter::new("att");
        filter.push(FilterRow::new(FilterField::Attachment, MatchRule::Active, FilterTest::None));
        filter.push(FilterRow::new(
            FilterField::AttachmentFileName,
            MatchRule::Ends,
            FilterTest::Text { value: ".pdf".to_string(), case_sensitive: false },
        ));

        let e = entry("g", "t");
        let mut att = Attachment::new();
        att.set_text(crate::item::AttField::FileName, "Scan.PDF");
        assert!(filter.matches(&e, None, Some(&att)));
        assert!(!filter.matches(&e, None, None));
    }

    #[test]
    fn test_alias_reads_password_from_base() {
        let mut filter = Filter::new("pw");
        filter.push(text(FieldType::Password, MatchRule::Equals, "pw"));
        let base = entry("g", "base");
        let mut alias = Entry::new();
        alias.make_dependent(DependentKind::Alias, &base.uuid());
        assert!(filter.matches(&alias, Some(&base), None));
        assert!(!filter.matches(&alias, None, None));
    }

    #[test]
    fn test_field_names() {
        assert_eq!(FilterField::Field(FieldType::Title).name(), "title");
        assert_eq!(FilterField::from_name("history_number"), Some(FilterField::HistoryNumber));
        assert_eq!(FilterField::from_name("grouptitle"), Some(FilterField::Field(FieldType::GroupTitle)));
        assert_eq!(FilterField::from_name("bogus"), None);
    }
}
