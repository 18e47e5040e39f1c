//! Store preferences
//!
//! Preferences are an explicit value passed to the store rather than global
//! state. They load from JSON for application configuration and convert to
//! and from the compact preference string kept in the database header:
//!
//! ```text
//! B 1 1 I 1 5 S 1 "bob"
//! ```
//!
//! Each token triple is a kind (`B`ool, `I`nteger, `S`tring), a numeric id
//! and a value. Only values that differ from the defaults are written.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::item::{HistoryDefaults, PasswordPolicy, MAX_HISTORY};

const BOOL_SAVE_PW_HISTORY: u32 = 1;
const BOOL_MAINTAIN_TIMESTAMPS: u32 = 2;
const BOOL_SHOW_PASSWORD_IN_TREE: u32 = 3;

const INT_PW_HISTORY_DEFAULT_MAX: u32 = 1;
const INT_PRE_EXPIRY_WARN_DAYS: u32 = 2;

const STRING_DEFAULT_USER: u32 = 1;
const STRING_DEFAULT_SYMBOLS: u32 = 2;
const STRING_DEFAULT_POLICY: u32 = 3;

/// Database-level preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Keep password history on entries that have none configured
    pub save_pw_history: bool,
    /// History size for entries that start keeping history
    pub pw_history_default_max: usize,
    /// Update access times on read
    pub maintain_timestamps: bool,
    /// Days ahead of expiry at which entries count as expiring
    pub pre_expiry_warn_days: u32,
    pub show_password_in_tree: bool,
    pub default_user: String,
    pub default_symbols: String,
    pub default_policy: PasswordPolicy,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            save_pw_history: true,
            pw_history_default_max: 3,
            maintain_timestamps: false,
            pre_expiry_warn_days: 1,
            show_password_in_tree: false,
            default_user: String::new(),
            default_symbols: String::new(),
            default_policy: PasswordPolicy::default(),
        }
    }
}

impl Preferences {
    /// Load from a JSON document; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let prefs: Preferences = serde_json::from_str(json)?;
        prefs.validated()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validated(mut self) -> Result<Self> {
        if self.pw_history_default_max > MAX_HISTORY {
            return Err(StoreError::ConfigError(format!(
                "pw_history_default_max must be at most {}",
                MAX_HISTORY
            )));
        }
        self.default_policy.symbols = self.default_symbols.clone();
        Ok(self)
    }

    /// History settings for entries without their own
    pub fn history_defaults(&self) -> HistoryDefaults {
        HistoryDefaults {
            save: self.save_pw_history,
            max: self.pw_history_default_max,
        }
    }

    /// Render as a database preference string
    pub fn to_pref_string(&self) -> String {
        let defaults = Preferences::default();
        let mut out: Vec<String> = Vec::new();

        let bools = [
            (BOOL_SAVE_PW_HISTORY, self.save_pw_history, defaults.save_pw_history),
            (BOOL_MAINTAIN_TIMESTAMPS, self.maintain_timestamps, defaults.maintain_timestamps),
            (BOOL_SHOW_PASSWORD_IN_TREE, self.show_password_in_tree, defaults.show_password_in_tree),
        ];
        for (id, value, default) in bools {
            if value != default {
                out.push(format!("B {} {}", id, u8::from(value)));
            }
        }

        let ints = [
            (INT_PW_HISTORY_DEFAULT_MAX, self.pw_history_default_max as i64, defaults.pw_history_default_max as i64),
            (INT_PRE_EXPIRY_WARN_DAYS, self.pre_expiry_warn_days as i64, defaults.pre_expiry_warn_days as i64),
        ];
        for (id, value, default) in ints {
            if value != default {
                out.push(format!("I {} {}", id, value));
            }
        }

        let policy = self.default_policy.serialize();
        let strings = [
            (STRING_DEFAULT_USER, self.default_user.clone(), defaults.default_user),
            (STRING_DEFAULT_SYMBOLS, self.default_symbols.clone(), defaults.default_symbols),
            (STRING_DEFAULT_POLICY, policy, defaults.default_policy.serialize()),
        ];
        for (id, value, default) in strings {
            if value != default {
                out.push(format!("S {} \"{}\"", id, escape(&value)));
            }
        }

        out.join(" ")
    }

    /// Parse a database preference string; unknown ids are ignored
    pub fn from_pref_string(s: &str) -> Result<Self> {
        let mut prefs = Preferences::default();
        let mut tokens = Tokenizer::new(s);

        while let Some(kind) = tokens.next_word() {
            let id: u32 = tokens
                .next_word()
                .and_then(|w| w.parse().ok())
                .ok_or_else(|| StoreError::InvalidPreferences(s.to_string()))?;
            match kind.as_str() {
                "B" => {
                    let value = match tokens.next_word().as_deref() {
                        Some("0") => false,
                        Some("1") => true,
                        _ => return Err(StoreError::InvalidPreferences(s.to_string())),
                    };
                    match id {
                        BOOL_SAVE_PW_HISTORY => prefs.save_pw_history = value,
                        BOOL_MAINTAIN_TIMESTAMPS => prefs.maintain_timestamps = value,
                        BOOL_SHOW_PASSWORD_IN_TREE => prefs.show_password_in_tree = value,
                        _ => log::debug!("Ignoring unknown bool preference {}", id),
                    }
                }
                "I" => {
                    let value: i64 = tokens
                        .next_word()
                        .and_then(|w| w.parse().ok())
                        .ok_or_else(|| StoreError::InvalidPreferences(s.to_string()))?;
                    match id {
                        INT_PW_HISTORY_DEFAULT_MAX => {
                            prefs.pw_history_default_max = value.clamp(0, MAX_HISTORY as i64) as usize
                        }
                        INT_PRE_EXPIRY_WARN_DAYS => prefs.pre_expiry_warn_days = value.max(0) as u32,
                        _ => log::debug!("Ignoring unknown int preference {}", id),
                    }
                }
                "S" => {
                    let value = tokens
                        .next_quoted()
                        .ok_or_else(|| StoreError::InvalidPreferences(s.to_string()))?;
                    match id {
                        STRING_DEFAULT_USER => prefs.default_user = value,
                        STRING_DEFAULT_SYMBOLS => prefs.default_symbols = value,
                        STRING_DEFAULT_POLICY => prefs.default_policy = PasswordPolicy::parse(&value, "")?,
                        _ => log::debug!("Ignoring unknown string preference {}", id),
                    }
                }
                _ => return Err(StoreError::InvalidPreferences(s.to_string())),
            }
        }

        prefs.default_policy.symbols = prefs.default_symbols.clone();
        Ok(prefs)
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

struct Tokenizer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Tokenizer<'a> {
    fn new(s: &'a str) -> Self {
        Self { chars: s.chars().peekable() }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn next_word(&mut self) -> Option<String> {
        self.skip_whitespace();
        let mut word = String::new();
        while let Some(c) = self.chars.next_if(|c| !c.is_whitespace()) {
            word.push(c);
        }
        (!word.is_empty()).then_some(word)
    }

    fn next_quoted(&mut self) -> Option<String> {
        self.skip_whitespace();
        if self.chars.next()? != '"' {
            return None;
        }
        let mut value = String::new();
        loop {
            match self.chars.next()? {
                '"' => return Some(value),
                '\\' => value.push(self.chars.next()?),
                c => value.push(c),
            }
        }
    }
}
