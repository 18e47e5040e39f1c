//! Database header fields
//!
//! Header records are `(type, bytes)` pairs like entry fields. Text types
//! hold UTF-8; binary types are kept as lowercase hex so every header value
//! can be read and changed as a string.

use std::collections::BTreeMap;

use crate::error::{Result, StoreError};
use crate::item::policy::POLICY_STRING_LEN;
use crate::item::PasswordPolicy;

/// Default key-stretching iteration count
pub const DEFAULT_HASH_ITERATIONS: u32 = 2048;

macro_rules! header_types {
    ($( $(#[$doc:meta])* $variant:ident = $code:literal, $binary:literal; )*) => {
        /// Header field type
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum HeaderType {
            $( $(#[$doc])* $variant, )*
        }

        impl HeaderType {
            pub const ALL: &'static [HeaderType] = &[ $( HeaderType::$variant, )* ];

            pub fn code(self) -> u8 {
                match self { $( HeaderType::$variant => $code, )* }
            }

            pub fn from_code(code: u8) -> Option<HeaderType> {
                match code {
                    $( $code => Some(HeaderType::$variant), )*
                    _ => None,
                }
            }

            /// True if the value is raw bytes rather than text
            pub fn is_binary(self) -> bool {
                match self { $( HeaderType::$variant => $binary, )* }
            }
        }
    };
}

header_types! {
    Version = 0x00, true;
    Uuid = 0x01, true;
    /// Database preference string
    NdPrefs = 0x02, false;
    /// Tree expansion state
    DispStat = 0x03, false;
    LastUpdateTime = 0x04, true;
    LastUpdateUserHost = 0x05, false;
    LastUpdateApp = 0x06, false;
    LastUpdateUser = 0x07, false;
    LastUpdateHost = 0x08, false;
    DbName = 0x09, false;
    DbDesc = 0x0a, false;
    /// Database filters as XML
    Filters = 0x0b, false;
    Reserved1 = 0x0c, true;
    Reserved2 = 0x0d, true;
    Reserved3 = 0x0e, true;
    /// Recently used entries
    Rue = 0x0f, false;
    /// Named password policies
    PswdPolicies = 0x10, false;
    /// One record per empty group
    EmptyGroup = 0x11, false;
    YubiSk = 0x12, true;
    LastPwdUpdateTime = 0x13, true;
}

impl HeaderType {
    /// Types whose value lives in a store side table rather than the
    /// header map; they change through their own commands
    pub fn is_side_table(self) -> bool {
        matches!(
            self,
            HeaderType::NdPrefs
                | HeaderType::Filters
                | HeaderType::Rue
                | HeaderType::PswdPolicies
                | HeaderType::EmptyGroup
        )
    }
}

/// Parsed database header
#[derive(Clone, PartialEq, Eq)]
pub struct DbHeader {
    pub(crate) fields: BTreeMap<HeaderType, String>,
    pub(crate) empty_groups: Vec<String>,
    pub(crate) hash_iterations: u32,
    pub(crate) unknown: Vec<(u8, Vec<u8>)>,
}

impl Default for DbHeader {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            empty_groups: Vec::new(),
            hash_iterations: DEFAULT_HASH_ITERATIONS,
            unknown: Vec::new(),
        }
    }
}

impl std::fmt::Debug for DbHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types: Vec<HeaderType> = self.fields.keys().copied().collect();
        f.debug_struct("DbHeader")
            .field("fields", &types)
            .field("empty_groups", &self.empty_groups.len())
            .field("hash_iterations", &self.hash_iterations)
            .field("unknown", &self.unknown.len())
            .finish()
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| s.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok()))
        .collect()
}

impl DbHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from ordered header records
    pub fn from_records<'a, I>(records: I) -> DbHeader
    where
        I: IntoIterator<Item = (u8, &'a [u8])>,
    {
        let mut header = DbHeader::new();
        for (code, value) in records {
            match HeaderType::from_code(code) {
                Some(HeaderType::EmptyGroup) => {
                    header.empty_groups.push(String::from_utf8_lossy(value).into_owned());
                }
                Some(ht) if ht.is_binary() => {
                    header.fields.insert(ht, to_hex(value));
                }
                Some(ht) => {
                    header.fields.insert(ht, String::from_utf8_lossy(value).into_owned());
                }
                None => header.unknown.push((code, value.to_vec())),
            }
        }
        header
    }

    /// Serialize to header records, known types first in code order
    pub fn to_records(&self) -> Vec<(u8, Vec<u8>)> {
        let mut out = Vec::with_capacity(self.fields.len() + self.empty_groups.len() + self.unknown.len());
        for (ht, value) in &self.fields {
            let bytes = if ht.is_binary() {
                from_hex(value).unwrap_or_else(|| {
                    log::warn!("Header field {:?} is not valid hex, writing it empty", ht);
                    Vec::new()
                })
            } else {
                value.as_bytes().to_vec()
            };
            out.push((ht.code(), bytes));
        }
        for group in &self.empty_groups {
            out.push((HeaderType::EmptyGroup.code(), group.as_bytes().to_vec()));
        }
        out.sort_by_key(|(code, _)| *code);
        out.extend(self.unknown.iter().cloned());
        out
    }

    pub fn get(&self, ht: HeaderType) -> Option<&str> {
        self.fields.get(&ht).map(String::as_str)
    }

    /// Set a value; an empty value removes the field
    pub fn set(&mut self, ht: HeaderType, value: &str) {
        if value.is_empty() {
            self.fields.remove(&ht);
        } else {
            self.fields.insert(ht, value.to_string());
        }
    }

    pub(crate) fn take(&mut self, ht: HeaderType) -> Option<String> {
        self.fields.remove(&ht)
    }

    pub fn hash_iterations(&self) -> u32 {
        self.hash_iterations
    }

    pub fn set_hash_iterations(&mut self, n: u32) {
        self.hash_iterations = n;
    }

    pub fn empty_groups(&self) -> &[String] {
        &self.empty_groups
    }

    pub fn num_unknown(&self) -> usize {
        self.unknown.len()
    }
}

/// Encode named policies for the header
///
/// Layout: a two-digit hex count, then per policy a two-digit hex name
/// length, the name, the policy string, a two-digit hex symbol count and
/// the symbols.
pub fn encode_policies(policies: &BTreeMap<String, PasswordPolicy>) -> String {
    let mut out = format!("{:02x}", policies.len().min(0xff));
    for (name, policy) in policies.iter().take(0xff) {
        let name: String = name.chars().take(0xff).collect();
        let symbols: String = policy.symbols.chars().take(0xff).collect();
        out.push_str(&format!("{:02x}", name.chars().count()));
        out.push_str(&name);
        out.push_str(&policy.serialize());
        out.push_str(&format!("{:02x}", symbols.chars().count()));
        out.push_str(&symbols);
    }
    out
}

/// Decode the header form written by [`encode_policies`]
pub fn decode_policies(s: &str) -> Result<BTreeMap<String, PasswordPolicy>> {
    let chars: Vec<char> = s.chars().collect();
    let mut pos = 0;
    let invalid = || StoreError::InvalidPolicy(format!("named policy list '{}'", s));

    let mut take = |n: usize| -> Result<String> {
        let part = chars.get(pos..pos + n).ok_or_else(invalid)?;
        pos += n;
        Ok(part.iter().collect())
    };
    let hex_len = |h: String| usize::from_str_radix(&h, 16).map_err(|_| invalid());

    let mut policies = BTreeMap::new();
    let count = hex_len(take(2)?)?;
    for _ in 0..count {
        let name_len = hex_len(take(2)?)?;
        let name = take(name_len)?;
        let policy_str = take(POLICY_STRING_LEN)?;
        let symbols_len = hex_len(take(2)?)?;
        let symbols = take(symbols_len)?;
        policies.insert(name, PasswordPolicy::parse(&policy_str, &symbols)?);
    }
    if take(1).is_ok() {
        return Err(invalid());
    }
    Ok(policies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_type_codes() {
        for ht in HeaderType::ALL {
            assert_eq!(HeaderType::from_code(ht.code()), Some(*ht));
        }
        assert_eq!(HeaderType::Rue.code(), 0x0f);
        assert_eq!(HeaderType::LastPwdUpdateTime.code(), 0x13);
        assert_eq!(HeaderType::from_code(0x14), None);
    }

    #[test]
    fn test_records_roundtrip() {
        let records: Vec<(u8, Vec<u8>)> = vec![
            (0x00, vec![0x0e, 0x03]),
            (0x09, b"My DB".to_vec()),
            (0x11, b"Empty.One".to_vec()),
            (0x11, b"Empty.Two".to_vec()),
            (0x7f, vec![1, 2, 3]),
        ];
        let header = DbHeader::from_records(records.iter().map(|(c, v)| (*c, v.as_slice())));

        assert_eq!(header.get(HeaderType::Version), Some("0e03"));
        assert_eq!(header.get(HeaderType::DbName), Some("My DB"));
        assert_eq!(header.empty_groups().len(), 2);
        assert_eq!(header.num_unknown(), 1);
        assert_eq!(header.to_records(), records);
    }

    #[test]
    fn test_set_empty_removes() {
        let mut header = DbHeader::new();
        header.set(HeaderType::DbDesc, "desc");
        assert_eq!(header.get(HeaderType::DbDesc), Some("desc"));
        header.set(HeaderType::DbDesc, "");
        assert_eq!(header.get(HeaderType::DbDesc), None);
    }

    #[test]
    fn test_debug_hides_values() {
        let mut header = DbHeader::new();
        header.set(HeaderType::YubiSk, "00112233");
        assert!(!format!("{:?}", header).contains("00112233"));
    }

    #[test]
    fn test_policies_roundtrip() {
        let mut policies = BTreeMap::new();
        let mut strong = PasswordPolicy::default();
        strong.length = 24;
        strong.symbols = "!@#".to_string();
        policies.insert("Strong".to_string(), strong);
        policies.insert("Pin".to_string(), PasswordPolicy::default());

        let encoded = encode_policies(&policies);
        assert!(encoded.starts_with("02"));
        assert_eq!(decode_policies(&encoded).unwrap(), policies);
    }

    #[test]
    fn test_decode_policies_errors() {
        assert!(decode_policies("").is_err());
        assert!(decode_policies("01").is_err());
        assert!(decode_policies("zz").is_err());
        assert_eq!(decode_policies("00").unwrap().len(), 0);
        assert!(decode_policies("00x").is_err());
    }
}
