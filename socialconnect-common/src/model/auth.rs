use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const PASSWORD_MIN_LEN: usize = 6;
/// Length of a SHA-256 digest rendered as lowercase hex.
pub const PASSWORD_DIGEST_LEN: usize = 64;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The password must be at least {PASSWORD_MIN_LEN} characters long")]
pub struct InvalidPasswordError;

/// A plaintext password as entered by a user. Never persisted.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Result<Self, InvalidPasswordError> {
        if password.chars().count() >= PASSWORD_MIN_LEN {
            Ok(Self(password))
        } else {
            Err(InvalidPasswordError)
        }
    }

    #[must_use]
    pub fn digest(&self) -> PasswordDigest {
        PasswordDigest::of(&self.0)
    }
}

/// SHA-256 hex digest of a password.
///
/// Records written by older releases stored the plaintext in this position. Such values are
/// recognised by their length and can be upgraded in place with [`PasswordDigest::migrate_legacy`].
#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    #[must_use]
    pub fn of(password: &str) -> Self {
        Self(hex::encode(Sha256::digest(password.as_bytes())))
    }

    #[must_use]
    pub fn matches(&self, password: &str) -> bool {
        *self == Self::of(password)
    }

    #[must_use]
    pub fn is_legacy_plaintext(&self) -> bool {
        self.0.len() != PASSWORD_DIGEST_LEN
    }

    /// Re-hashes a legacy plaintext value. Returns whether anything changed.
    pub fn migrate_legacy(&mut self) -> bool {
        if self.is_legacy_plaintext() {
            *self = Self::of(&self.0);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

impl Debug for PasswordDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordDigest").field(&"[redacted]").finish()
    }
}
