//! Encrypted item shared by entries and attachments

use std::collections::BTreeMap;

use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::InstanceKey;
use super::field::ItemField;

/// Record made of individually encrypted fields
///
/// Every value is encrypted under the item's own [`InstanceKey`] and only
/// decrypted for the duration of an accessor call. Fields whose type code the
/// current schema does not recognise are kept, in order, in a separate list
/// and are written back untouched.
#[derive(Clone)]
pub struct Item {
    fields: BTreeMap<u8, ItemField>,
    unknown: Vec<ItemField>,
    key: InstanceKey,
}

impl Default for Item {
    fn default() -> Self {
        Self::new()
    }
}

impl Item {
    /// Create an empty item with fresh key material
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
            unknown: Vec::new(),
            key: InstanceKey::generate(),
        }
    }

    /// Set a field's value, replacing any previous value
    ///
    /// An empty value removes the field.
    pub fn set_field(&mut self, ftype: u8, value: &[u8]) {
        if value.is_empty() {
            self.fields.remove(&ftype);
            return;
        }
        match ItemField::encrypted(ftype, value, &self.key) {
            Ok(field) => {
                self.fields.insert(ftype, field);
            }
            Err(e) => log::error!("Failed to encrypt field 0x{:02x}: {}", ftype, e),
        }
    }

    /// Decrypt a field's value, empty if the field is not set
    pub fn get_field(&self, ftype: u8) -> Zeroizing<Vec<u8>> {
        match self.fields.get(&ftype) {
            Some(field) => field.get(&self.key).unwrap_or_else(|e| {
                log::warn!("Failed to decrypt field 0x{:02x}: {}", ftype, e);
                Zeroizing::new(Vec::new())
            }),
            None => Zeroizing::new(Vec::new()),
        }
    }

    /// Check whether a field holds a value
    pub fn is_field_set(&self, ftype: u8) -> bool {
        self.fields.get(&ftype).is_some_and(|f| !f.is_empty())
    }

    /// Remove a field, wiping its ciphertext
    pub fn clear_field(&mut self, ftype: u8) {
        self.fields.remove(&ftype);
    }

    /// Type codes of all set fields, ascending
    pub fn field_types(&self) -> Vec<u8> {
        self.fields.keys().copied().collect()
    }

    /// Number of set fields
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Plaintext length of a field, 0 if unset
    pub fn field_len(&self, ftype: u8) -> usize {
        self.fields.get(&ftype).map(|f| f.len()).unwrap_or(0)
    }

    pub fn set_text(&mut self, ftype: u8, value: &str) {
        self.set_field(ftype, value.as_bytes());
    }

    pub fn get_text(&self, ftype: u8) -> String {
        let bytes = self.get_field(ftype);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Store a timestamp; zero clears the field
    pub fn set_time(&mut self, ftype: u8, t: i64) {
        if t == 0 {
            self.clear_field(ftype);
        } else {
            self.set_field(ftype, &t.to_le_bytes());
        }
    }

    /// Read a timestamp, accepting both 32- and 64-bit encodings; 0 if unset
    pub fn get_time(&self, ftype: u8) -> i64 {
        let bytes = self.get_field(ftype);
        match bytes.len() {
            4 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64,
            8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes);
                i64::from_le_bytes(buf)
            }
            _ => 0,
        }
    }

    pub fn set_uuid(&mut self, ftype: u8, uuid: &Uuid) {
        if uuid.is_nil() {
            self.clear_field(ftype);
        } else {
            self.set_field(ftype, uuid.as_bytes());
        }
    }

    pub fn get_uuid(&self, ftype: u8) -> Option<Uuid> {
        let bytes = self.get_field(ftype);
        Uuid::from_slice(&bytes).ok().filter(|u| !u.is_nil())
    }

    pub fn set_byte(&mut self, ftype: u8, value: u8) {
        self.set_field(ftype, &[value]);
    }

    pub fn get_byte(&self, ftype: u8) -> Option<u8> {
        self.get_field(ftype).first().copied()
    }

    pub fn set_short(&mut self, ftype: u8, value: i16) {
        self.set_field(ftype, &value.to_le_bytes());
    }

    pub fn get_short(&self, ftype: u8) -> Option<i16> {
        let bytes = self.get_field(ftype);
        (bytes.len() == 2).then(|| i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn set_int(&mut self, ftype: u8, value: i32) {
        self.set_field(ftype, &value.to_le_bytes());
    }

    pub fn get_int(&self, ftype: u8) -> Option<i32> {
        let bytes = self.get_field(ftype);
        (bytes.len() == 4).then(|| i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Append a field of unrecognised type, preserving arrival order
    pub fn add_unknown_field(&mut self, ftype: u8, value: &[u8]) {
        match ItemField::encrypted(ftype, value, &self.key) {
            Ok(field) => self.unknown.push(field),
            Err(e) => log::error!("Failed to encrypt unknown field 0x{:02x}: {}", ftype, e),
        }
    }

    /// Decrypted unknown fields in arrival order
    pub fn unknown_fields(&self) -> Vec<(u8, Zeroizing<Vec<u8>>)> {
        self.unknown
            .iter()
            .map(|f| {
                let value = f.get(&self.key).unwrap_or_else(|e| {
                    log::warn!("Failed to decrypt unknown field 0x{:02x}: {}", f.field_type(), e);
                    Zeroizing::new(Vec::new())
                });
                (f.field_type(), value)
            })
            .collect()
    }

    pub fn num_unknown_fields(&self) -> usize {
        self.unknown.len()
    }

    pub fn clear_unknown_fields(&mut self) {
        self.unknown.clear();
    }
}

impl PartialEq for Item {
    /// Compares decrypted contents; keys are ignored
    fn eq(&self, other: &Self) -> bool {
        if self.fields.len() != other.fields.len() || self.unknown.len() != other.unknown.len() {
            return false;
        }
        let fields_match = self.fields.keys().all(|ft| {
            other.fields.contains_key(ft) && self.get_field(*ft) == other.get_field(*ft)
        });
        fields_match && self.unknown_fields() == other.unknown_fields()
    }
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Item")
            .field("fields", &self.field_types())
            .field("unknown", &self.unknown.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_roundtrip() {
        let mut item = Item::new();
        item.set_text(0x03, "Title");
        assert!(item.is_field_set(0x03));
        assert_eq!(item.get_text(0x03), "Title");
        assert_eq!(item.get_text(0x04), "");
    }

    #[test]
    fn test_empty_value_clears() {
        let mut item = Item::new();
        item.set_text(0x05, "notes");
        item.set_text(0x05, "");
        assert!(!item.is_field_set(0x05));
        assert_eq!(item.num_fields(), 0);
    }

    #[test]
    fn test_embedded_nulls_and_long_values() {
        let mut item = Item::new();
        item.set_field(0x1b, &[0, 0, 1, 0, 2]);
        assert_eq!(item.get_field(0x1b).as_slice(), &[0, 0, 1, 0, 2]);

        let long = "x".repeat(65_536);
        item.set_text(0x05, &long);
        assert_eq!(item.get_text(0x05), long);
    }

    #[test]
    fn test_time_encodings() {
        let mut item = Item::new();
        item.set_time(0x07, 1_700_000_000);
        assert_eq!(item.get_time(0x07), 1_700_000_000);

        item.set_field(0x08, &1_600_000_000u32.to_le_bytes());
        assert_eq!(item.get_time(0x08), 1_600_000_000);

        item.set_time(0x07, 0);
        assert!(!item.is_field_set(0x07));
        assert_eq!(item.get_time(0x07), 0);
    }

    #[test]
    fn test_uuid_and_integers() {
        let mut item = Item::new();
        let uuid = Uuid::new_v4();
        item.set_uuid(0x01, &uuid);
        assert_eq!(item.get_uuid(0x01), Some(uuid));

        item.set_byte(0x15, 1);
        item.set_short(0x13, -1);
        item.set_int(0x11, 90);
        assert_eq!(item.get_byte(0x15), Some(1));
        assert_eq!(item.get_short(0x13), Some(-1));
        assert_eq!(item.get_int(0x11), Some(90));
        assert_eq!(item.get_int(0x12), None);
    }

    #[test]
    fn test_clone_decrypts_independently() {
        let mut item = Item::new();
        item.set_text(0x06, "secret");
        let copy = item.clone();
        drop(item);
        assert_eq!(copy.get_text(0x06), "secret");
    }

    #[test]
    fn test_equality_ignores_keys() {
        let mut a = Item::new();
        let mut b = Item::new();
        a.set_text(0x03, "same");
        b.set_text(0x03, "same");
        assert_eq!(a, b);

        b.set_text(0x04, "user");
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_fields_preserved_in_order() {
        let mut item = Item::new();
        item.add_unknown_field(0xdd, &[1, 2, 3]);
        item.add_unknown_field(0xde, b"later");
        let unknown = item.unknown_fields();
        assert_eq!(unknown.len(), 2);
        assert_eq!(unknown[0].0, 0xdd);
        assert_eq!(unknown[0].1.as_slice(), &[1, 2, 3]);
        assert_eq!(unknown[1].1.as_slice(), b"later");
    }
}
