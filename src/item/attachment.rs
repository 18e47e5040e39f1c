//! File attachments referenced by entries

use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::md5_hex;
use super::entry::EntryStatus;
use super::field_type::AttField;
use super::item::Item;

/// Encrypted file attachment
///
/// An entry refers to its attachment through the attachment reference field;
/// the attachment keeps a count of referring entries.
#[derive(Clone, Debug)]
pub struct Attachment {
    item: Item,
    status: EntryStatus,
    ref_count: u32,
}

impl Default for Attachment {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Attachment {
    fn eq(&self, other: &Self) -> bool {
        self.ref_count == other.ref_count && self.status == other.status && self.item == other.item
    }
}

impl Attachment {
    pub fn new() -> Self {
        let mut att = Self {
            item: Item::new(),
            status: EntryStatus::Clean,
            ref_count: 0,
        };
        att.item.set_uuid(AttField::Uuid.code(), &Uuid::new_v4());
        att
    }

    pub fn uuid(&self) -> Uuid {
        self.item.get_uuid(AttField::Uuid.code()).unwrap_or_else(Uuid::nil)
    }

    pub fn set_uuid(&mut self, uuid: &Uuid) {
        self.item.set_uuid(AttField::Uuid.code(), uuid);
    }

    pub fn text(&self, field: AttField) -> String {
        self.item.get_text(field.code())
    }

    pub fn set_text(&mut self, field: AttField, value: &str) {
        self.item.set_text(field.code(), value);
    }

    pub fn title(&self) -> String {
        self.text(AttField::Title)
    }

    pub fn file_name(&self) -> String {
        self.text(AttField::FileName)
    }

    pub fn media_type(&self) -> String {
        self.text(AttField::MediaType)
    }

    pub fn time(&self, field: AttField) -> i64 {
        self.item.get_time(field.code())
    }

    pub fn set_time(&mut self, field: AttField, t: i64) {
        self.item.set_time(field.code(), t);
    }

    pub fn content(&self) -> Zeroizing<Vec<u8>> {
        self.item.get_field(AttField::Content.code())
    }

    /// Replace the content and its stored hash
    pub fn set_content(&mut self, data: &[u8]) {
        self.item.set_field(AttField::Content.code(), data);
        if data.is_empty() {
            self.item.clear_field(AttField::ContentHash.code());
        } else {
            self.item.set_text(AttField::ContentHash.code(), &md5_hex(data));
        }
    }

    pub fn content_len(&self) -> usize {
        self.item.field_len(AttField::Content.code())
    }

    /// True if the stored hash matches the content
    pub fn is_content_valid(&self) -> bool {
        let content = self.content();
        let stored = self.item.get_text(AttField::ContentHash.code());
        if content.is_empty() {
            return stored.is_empty();
        }
        stored == md5_hex(&content)
    }

    pub fn status(&self) -> EntryStatus {
        self.status
    }

    pub fn set_status(&mut self, status: EntryStatus) {
        self.status = status;
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn inc_ref(&mut self) {
        self.ref_count += 1;
    }

    pub fn dec_ref(&mut self) {
        self.ref_count = self.ref_count.saturating_sub(1);
    }

    /// Build from ordered `(type, bytes)` records, keeping unknown types
    pub fn from_raw_fields<'a, I>(records: I) -> Attachment
    where
        I: IntoIterator<Item = (u8, &'a [u8])>,
    {
        let mut att = Attachment {
            item: Item::new(),
            status: EntryStatus::Clean,
            ref_count: 0,
        };
        for (code, value) in records {
            if AttField::from_code(code).is_some() {
                att.item.set_field(code, value);
            } else {
                att.item.add_unknown_field(code, value);
            }
        }
        if att.uuid().is_nil() {
            att.set_uuid(&Uuid::new_v4());
        }
        att
    }

    pub fn to_raw_fields(&self) -> Vec<(u8, Zeroizing<Vec<u8>>)> {
        let mut out: Vec<_> = self
            .item
            .field_types()
            .into_iter()
            .map(|code| (code, self.item.get_field(code)))
            .collect();
        out.extend(self.item.unknown_fields());
        out
    }
}
