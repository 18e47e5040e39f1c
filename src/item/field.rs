//! A single encrypted field value

use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{self, InstanceKey};

/// One named, in-memory encrypted byte blob
///
/// `length` is the plaintext length. It is zero exactly when the ciphertext is
/// empty. The ciphertext is wiped whenever the field is dropped, which includes
/// being overwritten by assignment.
#[derive(Clone, PartialEq, Eq)]
pub struct ItemField {
    ftype: u8,
    length: usize,
    data: Vec<u8>,
}

impl ItemField {
    /// Create an empty field of the given type
    pub fn new(ftype: u8) -> Self {
        Self {
            ftype,
            length: 0,
            data: Vec::new(),
        }
    }

    /// Encrypt `value` into a new field
    pub fn encrypted(ftype: u8, value: &[u8], key: &InstanceKey) -> Result<Self, String> {
        let mut field = Self::new(ftype);
        field.set(value, key)?;
        Ok(field)
    }

    /// Field type code
    pub fn field_type(&self) -> u8 {
        self.ftype
    }

    /// Plaintext length
    pub fn len(&self) -> usize {
        self.length
    }

    /// True if the field holds no value
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Size of the stored ciphertext
    pub fn stored_len(&self) -> usize {
        self.data.len()
    }

    /// Replace the value, wiping the previous ciphertext first
    pub fn set(&mut self, value: &[u8], key: &InstanceKey) -> Result<(), String> {
        let data = crypto::encrypt(value, key)?;
        self.data.zeroize();
        self.data = data;
        self.length = value.len();
        Ok(())
    }

    /// Decrypt the value
    ///
    /// Returns an empty buffer for an unset field. The caller owns the plaintext,
    /// which is wiped when the buffer is dropped.
    pub fn get(&self, key: &InstanceKey) -> Result<Zeroizing<Vec<u8>>, String> {
        if self.length == 0 {
            return Ok(Zeroizing::new(Vec::new()));
        }
        let plain = crypto::decrypt(&self.data, key)?;
        if plain.len() != self.length {
            return Err(format!(
                "Field 0x{:02x} decrypted to {} bytes, expected {}",
                self.ftype,
                plain.len(),
                self.length
            ));
        }
        Ok(plain)
    }

    /// Wipe the value
    pub fn clear(&mut self) {
        self.data.zeroize();
        self.data = Vec::new();
        self.length = 0;
    }
}

impl Drop for ItemField {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl std::fmt::Debug for ItemField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemField")
            .field("ftype", &format_args!("0x{:02x}", self.ftype))
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}
