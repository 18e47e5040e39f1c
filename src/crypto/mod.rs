//! Cryptographic operations for the password store
//!
//! Every field of every item is kept encrypted in memory with AES-256-CBC
//! under a key that belongs to the item instance. This module provides the
//! per-instance key, the field cipher, content digests for attachments and
//! policy-driven password generation.

mod cipher;
mod digest;
pub mod password;

pub use cipher::{InstanceKey, encrypt, decrypt, BLOCK_SIZE, KEY_LENGTH, IV_SIZE};
pub use digest::md5_hex;
pub use password::{generate_password, generate_pronounceable_password};
