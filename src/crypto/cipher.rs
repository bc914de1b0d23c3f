//! XChaCha20-Poly1305 authenticated encryption.
//!
//! Every entry is sealed with its virtual path as associated data, so a
//! ciphertext only opens under the path it was written for.

use crate::config::{KEY_LENGTH, NONCE_LENGTH, TAG_LENGTH};
use crate::error::{Error, Result};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;

/// XChaCha20-Poly1305 cipher wrapper.
pub struct Cipher {
    cipher: XChaCha20Poly1305,
}

impl Cipher {
    /// Create a new cipher from a derived key.
    pub fn new(key: &[u8; KEY_LENGTH]) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Fresh random nonce for one entry.
    pub fn generate_nonce() -> [u8; NONCE_LENGTH] {
        let mut nonce = [0u8; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce);
        nonce
    }

    /// Encrypt `plaintext` bound to `path`.
    ///
    /// Returns: ciphertext || tag (16 bytes)
    pub fn seal(&self, nonce: &[u8; NONCE_LENGTH], path: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher
            .encrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: plaintext,
                    aad: path.as_bytes(),
                },
            )
            .map_err(|e| Error::Encryption(e.to_string()))
    }

    /// Decrypt data produced by `seal` for the same `path`.
    pub fn open(&self, nonce: &[u8; NONCE_LENGTH], path: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < TAG_LENGTH {
            return Err(Error::Decryption {
                path: path.to_string(),
            });
        }

        self.cipher
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: path.as_bytes(),
                },
            )
            .map_err(|_| Error::Decryption {
                path: path.to_string(),
            })
    }
}
