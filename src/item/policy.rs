//! Password policies
//!
//! A policy serializes to 19 hex digits: flags (4), length (3), then the
//! minimum lowercase, uppercase, digit and symbol counts (3 each). Symbols
//! live in their own field.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, Result};

pub const USE_LOWERCASE: u16 = 0x8000;
pub const USE_UPPERCASE: u16 = 0x4000;
pub const USE_DIGITS: u16 = 0x2000;
pub const USE_SYMBOLS: u16 = 0x1000;
pub const USE_HEX_DIGITS: u16 = 0x0800;
pub const USE_EASY_VISION: u16 = 0x0400;
pub const MAKE_PRONOUNCEABLE: u16 = 0x0200;

/// Serialized policy length in characters
pub const POLICY_STRING_LEN: usize = 19;

/// Password generation rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub flags: u16,
    pub length: usize,
    pub lower_min_length: usize,
    pub upper_min_length: usize,
    pub digit_min_length: usize,
    pub symbol_min_length: usize,
    /// Symbol set; empty means the default set
    #[serde(default)]
    pub symbols: String,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            flags: USE_LOWERCASE | USE_UPPERCASE | USE_DIGITS,
            length: 12,
            lower_min_length: 1,
            upper_min_length: 1,
            digit_min_length: 1,
            symbol_min_length: 0,
            symbols: String::new(),
        }
    }
}

fn field(s: &str, range: std::ops::Range<usize>) -> Result<usize> {
    usize::from_str_radix(&s[range], 16)
        .map_err(|_| StoreError::InvalidPolicy(s.to_string()))
}

impl PasswordPolicy {
    pub fn use_lowercase(&self) -> bool {
        self.flags & USE_LOWERCASE != 0
    }

    pub fn use_uppercase(&self) -> bool {
        self.flags & USE_UPPERCASE != 0
    }

    pub fn use_digits(&self) -> bool {
        self.flags & USE_DIGITS != 0
    }

    pub fn use_symbols(&self) -> bool {
        self.flags & USE_SYMBOLS != 0
    }

    pub fn use_hex_digits(&self) -> bool {
        self.flags & USE_HEX_DIGITS != 0
    }

    pub fn use_easy_vision(&self) -> bool {
        self.flags & USE_EASY_VISION != 0
    }

    pub fn make_pronounceable(&self) -> bool {
        self.flags & MAKE_PRONOUNCEABLE != 0
    }

    /// Parse the 19-digit serialized form; symbols are supplied separately
    pub fn parse(s: &str, symbols: &str) -> Result<PasswordPolicy> {
        if s.len() != POLICY_STRING_LEN || !s.is_ascii() {
            return Err(StoreError::InvalidPolicy(s.to_string()));
        }
        Ok(PasswordPolicy {
            flags: field(s, 0..4)? as u16,
            length: field(s, 4..7)?,
            lower_min_length: field(s, 7..10)?,
            upper_min_length: field(s, 10..13)?,
            digit_min_length: field(s, 13..16)?,
            symbol_min_length: field(s, 16..19)?,
            symbols: symbols.to_string(),
        })
    }

    /// The 19-digit serialized form
    pub fn serialize(&self) -> String {
        format!(
            "{:04x}{:03x}{:03x}{:03x}{:03x}{:03x}",
            self.flags,
            self.length.min(0xfff),
            self.lower_min_length.min(0xfff),
            self.upper_min_length.min(0xfff),
            self.digit_min_length.min(0xfff),
            self.symbol_min_length.min(0xfff)
        )
    }

    /// Generate a password satisfying this policy
    pub fn generate(&self) -> String {
        crate::crypto::generate_password(self)
    }
}
