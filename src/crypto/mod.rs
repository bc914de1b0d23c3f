//! Cryptographic operations for Umbra archives.
//!
//! This module provides:
//! - XChaCha20-Poly1305 authenticated encryption bound to a virtual path
//! - Argon2id key derivation from a shared secret and a per-archive salt
//! - Secret generation and handling

mod cipher;
mod kdf;
mod secret;

pub use cipher::Cipher;
pub use kdf::{DerivedKey, KeyDerivation};
pub use secret::{generate_secret, Secret};
