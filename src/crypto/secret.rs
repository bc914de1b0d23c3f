//! The packaging secret shared by every archive of one build.

use crate::config::SECRET_LENGTH;
use crate::error::{Error, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroize;

/// Raw secret bytes. Wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Wrap existing bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short, non-reversible identifier safe to print or log.
    ///
    /// First 8 bytes of the SHA-256 of the secret, hex encoded.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.0);
        hex::encode(&digest[..8])
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.0.len())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Generate a fresh 32-byte secret from the operating system's random source.
pub fn generate_secret() -> Result<Secret> {
    let mut bytes = vec![0u8; SECRET_LENGTH];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::RandomSource(e.to_string()))?;
    Ok(Secret(bytes))
}
