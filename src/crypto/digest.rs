//! Content digests for attachments

use md5::{Digest, Md5};

/// Lowercase hex MD5 of `data`, 32 characters
///
/// Stored alongside attachment content so a damaged blob is noticed after
/// load. Not used for anything secret.
///
/// ```
/// use pwstore::crypto::md5_hex;
///
/// assert_eq!(md5_hex(b"attachment body"), "93d6349732e1cc3ca0229df3e631b802");
/// ```
pub fn md5_hex(data: &[u8]) -> String {
    Md5::digest(data).iter().map(|b| format!("{:02x}", b)).collect()
}
