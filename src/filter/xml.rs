//! Filter XML reader and writer
//!
//! ```xml
//! <filters>
//!     <filter filtername="Banking">
//!         <filter_entry active="yes">
//!             <group>
//!                 <rule>BE</rule>
//!                 <logic>and</logic>
//!                 <test>
//!                     <string>Bank</string>
//!                     <case>0</case>
//!                 </test>
//!             </group>
//!         </filter_entry>
//!     </filter>
//! </filters>
//! ```

use std::io::Cursor;
use std::str;

use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Result, StoreError};
use crate::item::{EntryStatus, EntryType, MatchRule};
use crate::report::{self, Asker};
use super::{Filter, FilterField, FilterLogic, FilterMap, FilterPool, FilterRow, FilterTest};

const DATE_FORMAT: &str = "%Y-%m-%d";

const ENTRY_TYPES: &[(EntryType, &str)] = &[
    (EntryType::Normal, "normal"),
    (EntryType::AliasBase, "aliasbase"),
    (EntryType::Alias, "alias"),
    (EntryType::ShortcutBase, "shortcutbase"),
    (EntryType::Shortcut, "shortcut"),
];

const ENTRY_STATUSES: &[(EntryStatus, &str)] = &[
    (EntryStatus::Clean, "clean"),
    (EntryStatus::Added, "added"),
    (EntryStatus::Modified, "modified"),
    (EntryStatus::Deleted, "deleted"),
];

/// Counts from merging imported filters into a filter map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterImport {
    pub added: usize,
    pub replaced: usize,
    pub skipped: usize,
}

fn write_err<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::XmlWrite(e.to_string())
}

fn write_text_element<W: std::io::Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name))).map_err(write_err)?;
    writer.write_event(Event::Text(BytesText::new(value))).map_err(write_err)?;
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(write_err)?;
    Ok(())
}

fn format_date(t: i64) -> String {
    chrono::DateTime::from_timestamp(t, 0)
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn parse_date(s: &str) -> Option<i64> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc().timestamp())
}

/// Render the filters of one pool, or of all pools, as XML
pub fn write_filters(filters: &FilterMap, pool: Option<FilterPool>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(write_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("filters")))
        .map_err(write_err)?;

    for ((filter_pool, _), filter) in filters {
        if pool.is_some_and(|p| p != *filter_pool) {
            continue;
        }
        write_filter(&mut writer, filter)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("filters")))
        .map_err(write_err)?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).map_err(write_err)
}

fn write_filter<W: std::io::Write>(writer: &mut Writer<W>, filter: &Filter) -> Result<()> {
    let mut elem = BytesStart::new("filter");
    elem.push_attribute(("filtername", filter.name.as_str()));
    writer.write_event(Event::Start(elem)).map_err(write_err)?;

    let rows = filter
        .rows
        .iter()
        .chain(&filter.history_rows)
        .chain(&filter.policy_rows)
        .chain(&filter.attachment_rows);
    for row in rows {
        write_row(writer, row)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("filter")))
        .map_err(write_err)?;
    Ok(())
}

fn write_row<W: std::io::Write>(writer: &mut Writer<W>, row: &FilterRow) -> Result<()> {
    let mut entry = BytesStart::new("filter_entry");
    entry.push_attribute(("active", if row.active { "yes" } else { "no" }));
    writer.write_event(Event::Start(entry)).map_err(write_err)?;

    let field = row.field.name();
    writer.write_event(Event::Start(BytesStart::new(field))).map_err(write_err)?;

    write_text_element(writer, "rule", row.rule.code())?;
    let logic = match row.logic {
        FilterLogic::And => "and",
        FilterLogic::Or => "or",
    };
    write_text_element(writer, "logic", logic)?;

    if row.test != FilterTest::None {
        writer.write_event(Event::Start(BytesStart::new("test"))).map_err(write_err)?;
        match &row.test {
            FilterTest::None => {}
            FilterTest::Text { value, case_sensitive } => {
                write_text_element(writer, "string", value)?;
                write_text_element(writer, "case", if *case_sensitive { "1" } else { "0" })?;
            }
            FilterTest::Integer { num1, num2 } => {
                write_text_element(writer, "num1", &num1.to_string())?;
                write_text_element(writer, "num2", &num2.to_string())?;
            }
            FilterTest::Date { date1, date2 } => {
                write_text_element(writer, "date1", &format_date(*date1))?;
                write_text_element(writer, "date2", &format_date(*date2))?;
            }
            FilterTest::EntryType(t) => {
                let name = ENTRY_TYPES.iter().find(|(et, _)| et == t).map(|(_, n)| *n).unwrap_or("normal");
                write_text_element(writer, "type", name)?;
            }
            FilterTest::EntryStatus(s) => {
                let name = ENTRY_STATUSES.iter().find(|(es, _)| es == s).map(|(_, n)| *n).unwrap_or("clean");
                write_text_element(writer, "status", name)?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new("test"))).map_err(write_err)?;
    }

    writer.write_event(Event::End(BytesEnd::new(field))).map_err(write_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("filter_entry")))
        .map_err(write_err)?;
    Ok(())
}

/// Values collected for one `<filter_entry>`
#[derive(Default)]
struct RowBuilder {
    active: bool,
    field: Option<FilterField>,
    field_name: String,
    rule: Option<MatchRule>,
    logic: Option<FilterLogic>,
    string: Option<String>,
    case: bool,
    num1: Option<i64>,
    num2: Option<i64>,
    date1: Option<i64>,
    date2: Option<i64>,
    entry_type: Option<EntryType>,
    entry_status: Option<EntryStatus>,
}

impl RowBuilder {
    fn set(&mut self, tag: &str, value: &str) -> Result<()> {
        let bad = || StoreError::XmlParse(format!("Invalid <{}> value '{}'", tag, value));
        match tag {
            "rule" => self.rule = Some(MatchRule::from_code(value)),
            "logic" => {
                self.logic = Some(match value {
                    "or" => FilterLogic::Or,
                    "and" => FilterLogic::And,
                    _ => return Err(bad()),
                })
            }
            "string" => self.string = Some(value.to_string()),
            "case" => self.case = value == "1",
            "num1" => self.num1 = Some(value.parse().map_err(|_| bad())?),
            "num2" => self.num2 = Some(value.parse().map_err(|_| bad())?),
            "date1" => self.date1 = Some(parse_date(value).ok_or_else(bad)?),
            "date2" => self.date2 = Some(parse_date(value).ok_or_else(bad)?),
            "type" => {
                self.entry_type = ENTRY_TYPES.iter().find(|(_, n)| *n == value).map(|(t, _)| *t);
                if self.entry_type.is_none() {
                    return Err(bad());
                }
            }
            "status" => {
                self.entry_status = ENTRY_STATUSES.iter().find(|(_, n)| *n == value).map(|(s, _)| *s);
                if self.entry_status.is_none() {
                    return Err(bad());
                }
            }
            _ => log::debug!("Ignoring filter element <{}>", tag),
        }
        Ok(())
    }

    fn build(self) -> Option<FilterRow> {
        let Some(field) = self.field else {
            log::warn!("Skipping filter row with unknown field '{}'", self.field_name);
            return None;
        };
        let test = if let Some(value) = self.string {
            FilterTest::Text { value, case_sensitive: self.case }
        } else if self.num1.is_some() || self.num2.is_some() {
            FilterTest::Integer {
                num1: self.num1.unwrap_or(0),
                num2: self.num2.unwrap_or(0),
            }
        } else if self.date1.is_some() || self.date2.is_some() {
            FilterTest::Date {
                date1: self.date1.unwrap_or(0),
                date2: self.date2.unwrap_or(0),
            }
        } else if let Some(t) = self.entry_type {
            FilterTest::EntryType(t)
        } else if let Some(s) = self.entry_status {
            FilterTest::EntryStatus(s)
        } else {
            FilterTest::None
        };
        Some(FilterRow {
            active: self.active,
            field,
            rule: self.rule.unwrap_or(MatchRule::Invalid),
            logic: self.logic.unwrap_or(FilterLogic::And),
            test,
        })
    }
}

fn tag_name(name: &[u8]) -> Result<String> {
    str::from_utf8(name)
        .map(str::to_string)
        .map_err(|_| StoreError::XmlParse("Invalid UTF-8 in tag name".into()))
}

fn filter_name(e: &BytesStart) -> Result<String> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"filtername" {
            return Ok(attr.unescape_value()?.to_string());
        }
    }
    Err(StoreError::XmlParse("<filter> without filtername".into()))
}

fn is_active(e: &BytesStart) -> Result<bool> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"active" {
            return Ok(attr.unescape_value()?.as_ref() != "no");
        }
    }
    Ok(true)
}

/// Parse filter XML into filters, in document order
pub fn parse_filters(xml: &str) -> Result<Vec<Filter>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut filters = Vec::new();
    let mut current: Option<Filter> = None;
    let mut row: Option<RowBuilder> = None;
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let tag = tag_name(e.name().as_ref())?;
                match tag.as_str() {
                    "filter" => current = Some(Filter::new(&filter_name(e)?)),
                    "filter_entry" => {
                        row = Some(RowBuilder {
                            active: is_active(e)?,
                            ..Default::default()
                        })
                    }
                    // <string></string> carries no text event
                    "string" => {
                        if let Some(r) = row.as_mut() {
                            r.string = Some(String::new());
                        }
                    }
                    _ => {
                        if let (Some(r), Some("filter_entry")) = (row.as_mut(), stack.last().map(String::as_str)) {
                            r.field = FilterField::from_name(&tag);
                            r.field_name = tag.clone();
                        }
                    }
                }
                stack.push(tag);
            }
            Ok(Event::Empty(ref e)) => {
                let tag = tag_name(e.name().as_ref())?;
                match tag.as_str() {
                    "filter" => filters.push(Filter::new(&filter_name(e)?)),
                    "string" => {
                        if let Some(r) = row.as_mut() {
                            r.set("string", "")?;
                        }
                    }
                    _ => {
                        if let (Some(r), Some("filter_entry")) = (row.as_mut(), stack.last().map(String::as_str)) {
                            r.field = FilterField::from_name(&tag);
                            r.field_name = tag;
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let value = e.unescape()?;
                if let (Some(r), Some(tag)) = (row.as_mut(), stack.last()) {
                    r.set(tag, &value)?;
                }
            }
            Ok(Event::End(ref e)) => {
                let tag = tag_name(e.name().as_ref())?;
                stack.pop();
                match tag.as_str() {
                    "filter_entry" => {
                        if let (Some(r), Some(f)) = (row.take(), current.as_mut()) {
                            if let Some(built) = r.build() {
                                f.push(built);
                            }
                        }
                    }
                    "filter" => {
                        if let Some(f) = current.take() {
                            filters.push(f);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(StoreError::XmlParse(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(filters)
}

/// Merge filters into `map` under `pool`, asking before replacing a namesake
pub fn merge_filters(
    map: &mut FilterMap,
    filters: Vec<Filter>,
    pool: FilterPool,
    mut asker: Option<&mut dyn Asker>,
) -> FilterImport {
    let mut stats = FilterImport::default();
    for filter in filters {
        let key = (pool, filter.name.clone());
        if map.contains_key(&key) {
            let question = format!("Filter '{}' already exists. Overwrite?", filter.name);
            if !report::ask(&mut asker, &question) {
                stats.skipped += 1;
                continue;
            }
            stats.replaced += 1;
        } else {
            stats.added += 1;
        }
        map.insert(key, filter);
    }
    stats
}
