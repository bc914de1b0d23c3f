//! Secret trailer appended to the runner executable.
//!
//! ```text
//! [executable bytes][secret: key_length bytes][footer: 25 bytes]
//! ```
//!
//! The footer is packed: magic (9) + version (u32) + key_length (u32) +
//! reserved (u64), little-endian. The runner finds its secret by seeking
//! backwards from the end of its own file.

use crate::config::{FORMAT_VERSION, KEY_MAGIC, MAX_EMBEDDED_KEY_LENGTH};
use crate::crypto::Secret;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info};

/// Encoded size of [`EmbeddedFooter`].
pub const FOOTER_SIZE: u64 = 25;

/// Footer written after the secret bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedFooter {
    pub magic: [u8; 9],
    pub version: u32,
    pub key_length: u32,
    pub reserved: u64,
}

impl EmbeddedFooter {
    pub fn new(key_length: u32) -> Self {
        Self {
            magic: KEY_MAGIC,
            version: FORMAT_VERSION,
            key_length,
            reserved: 0,
        }
    }

    /// Check magic, version and the key length bound.
    pub fn validate(&self) -> Result<()> {
        if self.magic != KEY_MAGIC {
            return Err(Error::InvalidMagic {
                what: "embedded footer",
            });
        }
        if self.version != FORMAT_VERSION {
            return Err(Error::VersionMismatch {
                expected: FORMAT_VERSION,
                found: self.version,
            });
        }
        if self.key_length == 0 || self.key_length > MAX_EMBEDDED_KEY_LENGTH {
            return Err(Error::InvalidKeyLength(self.key_length));
        }
        Ok(())
    }
}

/// Append `secret` and a footer to the end of `executable_path`.
///
/// An empty secret fails before the file is opened.
pub fn append_secret_trailer(executable_path: &Path, secret: &Secret) -> Result<()> {
    if secret.is_empty() {
        return Err(Error::EmptySecret);
    }

    let key_length = u32::try_from(secret.len())
        .ok()
        .filter(|&len| len <= MAX_EMBEDDED_KEY_LENGTH)
        .ok_or(Error::InvalidKeyLength(u32::MAX))?;

    let mut trailer = Vec::with_capacity(secret.len() + FOOTER_SIZE as usize);
    trailer.extend_from_slice(secret.as_bytes());
    bincode::serialize_into(&mut trailer, &EmbeddedFooter::new(key_length))?;

    let mut file = OpenOptions::new()
        .append(true)
        .open(executable_path)
        .map_err(|e| Error::io_at(executable_path, e))?;
    file.write_all(&trailer)
        .and_then(|()| file.flush())
        .map_err(|e| Error::io_at(executable_path, e))?;

    info!(
        path = %executable_path.display(),
        fingerprint = %secret.fingerprint(),
        "secret trailer appended"
    );

    Ok(())
}

/// Read the secret embedded at the end of `executable_path`.
pub fn read_embedded_secret(executable_path: &Path) -> Result<Secret> {
    let mut file = File::open(executable_path).map_err(|e| Error::io_at(executable_path, e))?;
    let file_len = file
        .metadata()
        .map_err(|e| Error::io_at(executable_path, e))?
        .len();

    if file_len < FOOTER_SIZE {
        return Err(Error::InvalidFooter(format!(
            "{} is too small to carry a footer",
            executable_path.display()
        )));
    }

    file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))
        .map_err(|e| Error::io_at(executable_path, e))?;
    let footer: EmbeddedFooter = bincode::deserialize_from(&mut file)?;
    footer.validate()?;

    let key_length = u64::from(footer.key_length);
    if file_len < FOOTER_SIZE + key_length {
        return Err(Error::InvalidFooter(format!(
            "key length {} exceeds file size",
            key_length
        )));
    }

    file.seek(SeekFrom::End(-((FOOTER_SIZE + key_length) as i64)))
        .map_err(|e| Error::io_at(executable_path, e))?;
    let mut key = vec![0u8; footer.key_length as usize];
    file.read_exact(&mut key)
        .map_err(|e| Error::io_at(executable_path, e))?;

    let secret = Secret::from_bytes(key);
    debug!(
        path = %executable_path.display(),
        fingerprint = %secret.fingerprint(),
        "embedded secret read"
    );

    Ok(secret)
}
