//! AES-256-CBC field cipher keyed per item instance
//!
//! Each item owns an [`InstanceKey`] generated at construction. Field values are
//! encrypted with AES-256-CBC and PKCS7 padding under that key, so stored
//! ciphertext is always a multiple of the block size. A zero-length plaintext
//! maps to zero-length ciphertext and back.

use aes::Aes256;
use cbc::{Encryptor, Decryptor};
use cbc::cipher::{BlockEncryptMut, BlockDecryptMut, KeyIvInit};
use block_padding::Pkcs7;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Key length for AES-256 (32 bytes = 256 bits)
pub const KEY_LENGTH: usize = 32;

/// IV size for AES-CBC (16 bytes = 128 bits)
pub const IV_SIZE: usize = 16;

/// AES block size
pub const BLOCK_SIZE: usize = 16;

type Aes256CbcEnc = Encryptor<Aes256>;
type Aes256CbcDec = Decryptor<Aes256>;

/// Random key material owned by a single item instance
///
/// Cloning an item clones its key, so copies decrypt on their own. The key is
/// wiped when dropped and never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct InstanceKey {
    key: [u8; KEY_LENGTH],
    iv: [u8; IV_SIZE],
}

impl InstanceKey {
    /// Generate fresh random key material
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut key = [0u8; KEY_LENGTH];
        let mut iv = [0u8; IV_SIZE];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut iv);
        Self { key, iv }
    }
}

impl std::fmt::Debug for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("InstanceKey(****)")
    }
}

/// Encrypt a field value under an instance key
///
/// # Returns
///
/// Ciphertext whose length is a multiple of [`BLOCK_SIZE`], or an empty vector
/// for an empty plaintext.
pub fn encrypt(plaintext: &[u8], key: &InstanceKey) -> Result<Vec<u8>, String> {
    if plaintext.is_empty() {
        return Ok(Vec::new());
    }

    let padded_len = ((plaintext.len() / BLOCK_SIZE) + 1) * BLOCK_SIZE;

    // Plaintext is copied into the work buffer, wipe it when done
    let mut buffer = Zeroizing::new(vec![0u8; padded_len]);
    buffer[..plaintext.len()].copy_from_slice(plaintext);

    let encryptor = Aes256CbcEnc::new(&key.key.into(), &key.iv.into());

    let encrypted = encryptor
        .encrypt_padded_mut::<Pkcs7>(&mut buffer, plaintext.len())
        .map_err(|e| format!("Encryption failed: {:?}", e))?;

    Ok(encrypted.to_vec())
}

/// Decrypt a field value with an instance key
///
/// The returned buffer is wiped when the caller drops it.
pub fn decrypt(ciphertext: &[u8], key: &InstanceKey) -> Result<Zeroizing<Vec<u8>>, String> {
    if ciphertext.is_empty() {
        return Ok(Zeroizing::new(Vec::new()));
    }

    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(format!("Ciphertext length {} is not block aligned", ciphertext.len()));
    }

    let mut buffer = Zeroizing::new(ciphertext.to_vec());

    let decryptor = Aes256CbcDec::new(&key.key.into(), &key.iv.into());

    let decrypted = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|e| format!("Decryption failed: {:?}", e))?;

    Ok(Zeroizing::new(decrypted.to_vec()))
}
