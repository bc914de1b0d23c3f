//! Argon2id key derivation from a shared secret and a per-archive salt.

use crate::config::{argon2_params, KdfParams};
use crate::error::{Error, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::Zeroizing;

/// A derived 256-bit archive key, wiped on drop.
pub type DerivedKey = Zeroizing<[u8; argon2_params::OUTPUT_LENGTH]>;

/// Key derivation using Argon2id.
#[derive(Debug, Clone)]
pub struct KeyDerivation {
    salt: [u8; argon2_params::SALT_LENGTH],
    params: KdfParams,
}

impl KeyDerivation {
    /// Create a new KDF with a random salt.
    pub fn new(params: KdfParams) -> Self {
        let mut salt = [0u8; argon2_params::SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        Self { salt, params }
    }

    /// Create a KDF from an existing salt (for reading).
    pub fn from_salt(salt: [u8; argon2_params::SALT_LENGTH], params: KdfParams) -> Self {
        Self { salt, params }
    }

    /// Get the salt for storage.
    pub fn salt(&self) -> &[u8; argon2_params::SALT_LENGTH] {
        &self.salt
    }

    /// Derive the archive key from the secret.
    ///
    /// Same (secret, salt, params) always yields the same key.
    pub fn derive_key(&self, secret: &[u8]) -> Result<DerivedKey> {
        if secret.is_empty() {
            return Err(Error::EmptySecret);
        }

        let params = Params::new(
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            Some(argon2_params::OUTPUT_LENGTH),
        )
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; argon2_params::OUTPUT_LENGTH]);
        argon2
            .hash_password_into(secret, &self.salt, &mut *key)
            .map_err(|e| Error::KeyDerivation(e.to_string()))?;

        Ok(key)
    }
}
