//! Symmetric encryption of persisted records.
//!
//! A sealed record is laid out as `MAGIC || nonce || ciphertext`, where the ciphertext carries
//! the AES-GCM authentication tag. The key is compiled in: it keeps casual readers from editing
//! the data files and is not meant as a security boundary.

use aes_gcm::{
    Aes128Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const MAGIC: &[u8; 4] = b"SCR1";
pub const NONCE_LEN: usize = 12;
const KEY: &[u8; 16] = b"SocialNetwork202";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum CipherError {
    #[error("The record is not in the encrypted format")]
    NotEncrypted,
    #[error("The encrypted record failed authentication")]
    Corrupted,
    #[error("Encrypting the record failed")]
    Encrypt,
}

#[derive(Clone)]
pub struct RecordCipher {
    cipher: Aes128Gcm,
}

impl RecordCipher {
    #[must_use]
    pub fn new() -> Self {
        Self::with_key(KEY)
    }

    #[must_use]
    pub fn with_key(key: &[u8; 16]) -> Self {
        Self {
            cipher: Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(key)),
        }
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| CipherError::Encrypt)?;

        let mut sealed = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(MAGIC);
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Distinguishes data that was never sealed ([`CipherError::NotEncrypted`]) from sealed data
    /// that no longer authenticates ([`CipherError::Corrupted`]).
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CipherError> {
        let body = sealed
            .strip_prefix(MAGIC.as_slice())
            .ok_or(CipherError::NotEncrypted)?;
        if body.len() < NONCE_LEN {
            return Err(CipherError::Corrupted);
        }
        let (nonce, ciphertext) = body.split_at(NONCE_LEN);

        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Corrupted)
    }
}

impl Default for RecordCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for RecordCipher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCipher")
            .field("key", &"[redacted]")
            .finish()
    }
}
