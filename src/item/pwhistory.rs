//! Password history
//!
//! The history is stored in a single text field:
//!
//! ```text
//! s mm nn [tttttttt llll <password>]*
//! ```
//!
//! `s` is `0` or `1` (history disabled/enabled), `mm` the maximum number of
//! kept passwords and `nn` the number that follow, both two hex digits. Each
//! entry is the change time as eight hex digits, the password length in
//! characters as four hex digits and then the password itself.

use thiserror::Error;

const HEADER_LEN: usize = 5;

/// Largest history size the two-digit header can express
pub const MAX_HISTORY: usize = 255;

/// Why a serialized history could not be parsed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwhError {
    #[error("Password history header is invalid")]
    InvalidHeader,

    #[error("Password history status is not 0 or 1")]
    InvalidStatus,

    #[error("Password history entry count is not hex")]
    InvalidCount,

    #[error("Password history timestamp is not hex")]
    InvalidDateTime,

    #[error("Password history entry length is not hex")]
    LengthNotHex,

    #[error("Password history entry length exceeds remaining data")]
    InvalidLength,

    #[error("Password history holds fewer entries than its header claims")]
    TooShort,

    #[error("Password history has data past its last entry")]
    TooLong,
}

/// One previous password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PwHistEntry {
    /// When this password stopped being current
    pub changed: i64,
    pub password: String,
}

/// Parsed password history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PwHistory {
    pub enabled: bool,
    pub max: usize,
    /// Oldest first
    pub entries: Vec<PwHistEntry>,
}

/// Outcome of checking an entry's history field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwhValidation {
    /// Empty or well formed
    Valid,
    /// Well formed but the maximum was below the entry count; raised to fit
    Repaired,
    /// Unparseable and discarded
    Discarded(PwhError),
}

impl PwhValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, PwhValidation::Valid)
    }
}

/// Bulk change applied to every entry's history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwhAction {
    /// Disable history on entries that have it enabled
    Stop,
    /// Enable history on entries that have it disabled or unset
    Start,
    /// Set the maximum on entries with history enabled
    SetMax,
    /// Remove all kept passwords, keeping status and maximum
    Clear,
}

fn hex_value(chars: &[char]) -> Option<usize> {
    let s: String = chars.iter().collect();
    usize::from_str_radix(&s, 16).ok()
}

impl PwHistory {
    /// History enabled with the given maximum and no entries
    pub fn enabled_with(max: usize) -> Self {
        Self {
            enabled: true,
            max: max.min(MAX_HISTORY),
            entries: Vec::new(),
        }
    }

    /// Parse a serialized history
    ///
    /// An empty string is a valid, disabled history.
    pub fn parse(s: &str) -> Result<PwHistory, PwhError> {
        if s.is_empty() {
            return Ok(PwHistory::default());
        }

        let chars: Vec<char> = s.chars().collect();
        if chars.len() < HEADER_LEN {
            return Err(PwhError::InvalidHeader);
        }

        let enabled = match chars[0] {
            '0' => false,
            '1' => true,
            _ => return Err(PwhError::InvalidStatus),
        };
        let max = hex_value(&chars[1..3]).ok_or(PwhError::InvalidHeader)?;
        let count = hex_value(&chars[3..5]).ok_or(PwhError::InvalidCount)?;

        let mut pos = HEADER_LEN;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            if chars.len() < pos + 12 {
                return Err(PwhError::TooShort);
            }
            let changed = hex_value(&chars[pos..pos + 8]).ok_or(PwhError::InvalidDateTime)? as i64;
            let len = hex_value(&chars[pos + 8..pos + 12]).ok_or(PwhError::LengthNotHex)?;
            pos += 12;
            if chars.len() < pos + len {
                return Err(PwhError::InvalidLength);
            }
            let password: String = chars[pos..pos + len].iter().collect();
            pos += len;
            entries.push(PwHistEntry { changed, password });
        }

        if pos != chars.len() {
            return Err(PwhError::TooLong);
        }

        Ok(PwHistory { enabled, max, entries })
    }

    /// Serialize; a disabled history with nothing in it serializes to empty
    pub fn serialize(&self) -> String {
        if !self.enabled && self.max == 0 && self.entries.is_empty() {
            return String::new();
        }
        let mut out = format!(
            "{}{:02x}{:02x}",
            if self.enabled { '1' } else { '0' },
            self.max.min(MAX_HISTORY),
            self.entries.len().min(MAX_HISTORY)
        );
        for entry in self.entries.iter().take(MAX_HISTORY) {
            out.push_str(&format!(
                "{:08x}{:04x}{}",
                entry.changed as u32,
                entry.password.chars().count(),
                entry.password
            ));
        }
        out
    }

    /// Append a previous password, evicting the oldest beyond the maximum
    pub fn push(&mut self, password: &str, changed: i64) {
        self.entries.push(PwHistEntry {
            changed,
            password: password.to_string(),
        });
        self.trim();
    }

    /// Drop the oldest entries until at most `max` remain
    pub fn trim(&mut self) {
        if self.entries.len() > self.max {
            let excess = self.entries.len() - self.max;
            self.entries.drain(..excess);
        }
    }

    /// The most recently replaced password
    pub fn previous_password(&self) -> Option<&str> {
        self.entries.last().map(|e| e.password.as_str())
    }

    /// Apply a bulk action; returns true if anything changed
    pub fn apply(&mut self, action: PwhAction, new_max: usize) -> bool {
        let before = self.clone();
        match action {
            PwhAction::Stop => self.enabled = false,
            PwhAction::Start => {
                if !self.enabled {
                    self.enabled = true;
                    if self.max == 0 {
                        self.max = new_max.min(MAX_HISTORY);
                    }
                    self.trim();
                }
            }
            PwhAction::SetMax => {
                if self.enabled {
                    self.max = new_max.min(MAX_HISTORY);
                    self.trim();
                }
            }
            PwhAction::Clear => self.entries.clear(),
        }
        *self != before
    }
}
