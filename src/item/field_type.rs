//! Field catalogue for entries and attachments
//!
//! The numeric codes are part of the file format and must never change.
//! The field names are used by filter XML and must not be renamed.

use serde::{Deserialize, Serialize};

/// How a field's bytes are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// UTF-8 text
    Text,
    /// Seconds since the epoch, stored little-endian
    Time,
    /// 16-byte UUID
    Uuid,
    /// Single byte
    Byte,
    /// Little-endian 16-bit integer
    Short,
    /// Little-endian 32-bit integer
    Int,
    /// Opaque bytes
    Binary,
}

macro_rules! field_types {
    ($( $(#[$doc:meta])* $variant:ident = $code:literal, $name:literal, $kind:ident; )*) => {
        /// Entry field type
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum FieldType {
            $( $(#[$doc])* $variant, )*
        }

        impl FieldType {
            /// All known entry field types in code order
            pub const ALL: &'static [FieldType] = &[ $( FieldType::$variant, )* ];

            /// Stable numeric code
            pub fn code(self) -> u8 {
                match self { $( FieldType::$variant => $code, )* }
            }

            /// Look up a field type by its numeric code
            pub fn from_code(code: u8) -> Option<FieldType> {
                match code {
                    $( $code => Some(FieldType::$variant), )*
                    _ => None,
                }
            }

            /// Field name used in filter XML
            pub fn name(self) -> &'static str {
                match self { $( FieldType::$variant => $name, )* }
            }

            /// Look up a field type by its XML name
            pub fn from_name(name: &str) -> Option<FieldType> {
                match name {
                    $( $name => Some(FieldType::$variant), )*
                    _ => None,
                }
            }

            /// How the field's bytes are interpreted
            pub fn value_kind(self) -> ValueKind {
                match self { $( FieldType::$variant => ValueKind::$kind, )* }
            }
        }
    };
}

field_types! {
    /// Pseudo-field combining group and title, used only for matching
    GroupTitle = 0x00, "grouptitle", Text;
    Uuid = 0x01, "uuid", Uuid;
    Group = 0x02, "group", Text;
    Title = 0x03, "title", Text;
    User = 0x04, "user", Text;
    Notes = 0x05, "notes", Text;
    Password = 0x06, "password", Text;
    /// Creation time
    CTime = 0x07, "create_time", Time;
    /// Password modification time
    PMTime = 0x08, "password_modified_time", Time;
    /// Last access time
    ATime = 0x09, "last_access_time", Time;
    /// Password expiry time
    XTime = 0x0a, "expiry_time", Time;
    /// Record modification time
    RMTime = 0x0c, "last_modification_time", Time;
    Url = 0x0d, "url", Text;
    Autotype = 0x0e, "autotype", Text;
    PwHistory = 0x0f, "password_history", Text;
    Policy = 0x10, "password_policy", Text;
    /// Password expiry interval in days
    XTimeInterval = 0x11, "password_expiry_interval", Int;
    RunCommand = 0x12, "run_command", Text;
    /// Double-click action
    Dca = 0x13, "dca", Short;
    Email = 0x14, "email", Text;
    Protected = 0x15, "protected", Byte;
    Symbols = 0x16, "symbols", Text;
    ShiftDca = 0x17, "shift_dca", Short;
    PolicyName = 0x18, "policy_name", Text;
    KbShortcut = 0x19, "kbshortcut", Int;
    /// Reference to the entry's attachment
    AttRef = 0x1a, "attachment", Uuid;
    TwoFactorKey = 0x1b, "two_factor_key", Binary;
    CreditCardNumber = 0x1c, "credit_card_number", Text;
    CreditCardExpiration = 0x1d, "credit_card_expiration", Text;
    CreditCardVerifValue = 0x1e, "credit_card_verif_value", Text;
    CreditCardPin = 0x1f, "credit_card_pin", Text;
    QrCode = 0x20, "qr_code", Text;
    TotpConfig = 0x21, "totp_config", Byte;
    TotpLength = 0x22, "totp_length", Byte;
    TotpTimeStep = 0x23, "totp_time_step", Byte;
    TotpStartTime = 0x24, "totp_start_time", Time;
    /// Base entry of an alias or shortcut
    BaseUuid = 0x41, "base_uuid", Uuid;
}

impl FieldType {
    /// True for fields holding secrets that callers should scrub after use
    pub fn is_sensitive(self) -> bool {
        matches!(
            self,
            FieldType::Password
                | FieldType::PwHistory
                | FieldType::TwoFactorKey
                | FieldType::CreditCardNumber
                | FieldType::CreditCardVerifValue
                | FieldType::CreditCardPin
        )
    }

    /// True for fields that carry a timestamp
    pub fn is_time(self) -> bool {
        self.value_kind() == ValueKind::Time
    }
}

/// Attachment field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttField {
    Uuid,
    Title,
    CTime,
    MediaType,
    FileName,
    FilePath,
    FileCTime,
    FileMTime,
    FileATime,
    ContentHash,
    Content,
}

impl AttField {
    /// All known attachment field types in code order
    pub const ALL: &'static [AttField] = &[
        AttField::Uuid,
        AttField::Title,
        AttField::CTime,
        AttField::MediaType,
        AttField::FileName,
        AttField::FilePath,
        AttField::FileCTime,
        AttField::FileMTime,
        AttField::FileATime,
        AttField::ContentHash,
        AttField::Content,
    ];

    /// Stable numeric code
    pub fn code(self) -> u8 {
        match self {
            AttField::Uuid => 0x60,
            AttField::Title => 0x03,
            AttField::CTime => 0x04,
            AttField::MediaType => 0x65,
            AttField::FileName => 0x66,
            AttField::FilePath => 0x67,
            AttField::FileCTime => 0x68,
            AttField::FileMTime => 0x69,
            AttField::FileATime => 0x6a,
            AttField::ContentHash => 0x6d,
            AttField::Content => 0x70,
        }
    }

    /// Look up an attachment field type by its numeric code
    pub fn from_code(code: u8) -> Option<AttField> {
        AttField::ALL.iter().copied().find(|f| f.code() == code)
    }
}
