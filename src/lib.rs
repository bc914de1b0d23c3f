//! Umbra Pak
//!
//! Encrypted, compressed archives for shipping application files, a secret
//! trailer that binds the archives to one executable, and a virtual file
//! system that serves archives and directories under scheme prefixes.
//!
//! # Features
//!
//! - **Pak archives**: zstd-compressed entries sealed with XChaCha20-Poly1305,
//!   each bound to its virtual path as associated data
//! - **Per-archive keys**: Argon2id over a shared secret and a random salt
//! - **Secret trailer**: the secret lives at the end of the runner executable
//! - **VFS**: `cfg://`, `src://`, `assets://`, `data://` and `user://` mounts
//!   with per-mount permission bits
//!
//! # Architecture
//!
//! ```text
//! File → Compress (zstd) → Encrypt (XChaCha20-Poly1305, AD = path) → Pak
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use umbra_pak::crypto::generate_secret;
//! use umbra_pak::pak::{PakReader, PakWriter};
//! use std::path::Path;
//!
//! let secret = generate_secret().unwrap();
//!
//! let mut writer = PakWriter::create(Path::new("game.pak"), &secret, Path::new("game")).unwrap();
//! writer.add_tree(Path::new("game")).unwrap();
//! writer.finish().unwrap();
//!
//! let reader = PakReader::open(Path::new("game.pak"), &secret).unwrap();
//! for path in reader.list() {
//!     println!("{} ({} bytes)", path, reader.read(&path).unwrap().len());
//! }
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod package;
pub mod pak;
pub mod runtime;
pub mod trailer;
pub mod vfs;

pub use config::{KdfParams, ProjectConfig};
pub use crypto::Secret;
pub use error::{Error, Result};
pub use pak::{PakReader, PakWriter};
pub use runtime::{Runtime, RuntimeOptions};
pub use vfs::{Mount, Permissions, Vfs};
