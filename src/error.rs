//! Error types for the password store core

use thiserror::Error;

/// Main error type for store operations that can fail at the crate's edges
///
/// The primitive store operations used by commands never return this type;
/// they signal absence or no-ops through `Option`, `bool` and counts.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Encryption of a field value failed
    #[error("Encryption error: {0}")]
    EncryptionError(String),

    /// Decryption of a field value failed - data may be corrupted
    #[error("Decryption error: {0}")]
    DecryptionError(String),

    /// Entry not found
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Attachment not found
    #[error("Attachment not found: {0}")]
    AttachmentNotFound(String),

    /// Store is read-only
    #[error("Store is read-only")]
    ReadOnly,

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Raw field record could not be decoded
    #[error("Invalid field record: {0}")]
    InvalidField(String),

    /// Preference string could not be parsed
    #[error("Invalid preference string: {0}")]
    InvalidPreferences(String),

    /// Password policy string could not be parsed
    #[error("Invalid password policy: {0}")]
    InvalidPolicy(String),

    /// Filter XML could not be parsed
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// Filter XML could not be written
    #[error("XML write error: {0}")]
    XmlWrite(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<quick_xml::Error> for StoreError {
    fn from(err: quick_xml::Error) -> Self {
        StoreError::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for StoreError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        StoreError::XmlParse(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::ConfigError(err.to_string())
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::EntryNotFound("0123abcd".to_string());
        assert!(err.to_string().contains("0123abcd"));

        let err = StoreError::ReadOnly;
        assert_eq!(err.to_string(), "Store is read-only");

        let err = StoreError::EncryptionError("test error".to_string());
        assert!(err.to_string().contains("test error"));

        let err = StoreError::InvalidPolicy("zz".to_string());
        assert!(err.to_string().contains("zz"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: StoreError = json_err.into();
        match err {
            StoreError::ConfigError(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected ConfigError"),
        }
    }
}
