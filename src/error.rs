//! Error types for Umbra archives and the virtual file system.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Umbra operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while packaging, reading archives or routing VFS calls.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error without a known path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error on a specific file.
    #[error("I/O error on {}: {source}", .path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Virtual path not found.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// No mount matches the virtual path.
    #[error("No mount for path: {0}")]
    MountNotFound(String),

    /// Path already exists.
    #[error("Path already exists: {0}")]
    PathExists(String),

    /// Invalid path format.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Mount prefix does not end with `://`.
    #[error("Invalid mount prefix '{0}': must end with '://'")]
    InvalidMountPrefix(String),

    /// Operation not allowed by the mount's permission set.
    #[error("Permission denied: {operation} on '{path}'")]
    PermissionDenied { operation: &'static str, path: String },

    /// Operation not supported by the backing store.
    #[error("Unsupported operation: {operation} on '{path}'")]
    Unsupported { operation: &'static str, path: String },

    /// Wrong magic tag.
    #[error("Invalid {what}: bad magic tag")]
    InvalidMagic { what: &'static str },

    /// Header or index ended early.
    #[error("Truncated archive: {0}")]
    Truncated(String),

    /// Version mismatch.
    #[error("Version mismatch: expected {expected:#x}, found {found:#x}")]
    VersionMismatch { expected: u32, found: u32 },

    /// Embedded footer is malformed.
    #[error("Invalid embedded footer: {0}")]
    InvalidFooter(String),

    /// Embedded key length outside (0, 1 MiB].
    #[error("Invalid embedded key length: {0}")]
    InvalidKeyLength(u32),

    /// Secret has no bytes.
    #[error("Secret is empty")]
    EmptySecret,

    /// OS random source failed.
    #[error("Random source unavailable: {0}")]
    RandomSource(String),

    /// Key derivation error.
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Authentication failed (tampered entry, relabelled path or wrong secret).
    #[error("Decryption failed for '{path}': wrong secret or tampered data")]
    Decryption { path: String },

    /// zstd compression failure.
    #[error("Compression error: {0}")]
    Compression(String),

    /// zstd decompression failure.
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// Decompressed length differs from the recorded raw size.
    #[error("Size mismatch for '{path}': expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Project configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Script execution callback failed.
    #[error("Script error in '{path}': {message}")]
    Script { path: String, message: String },
}

impl Error {
    /// Attach a path to an I/O error.
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoAt {
            path: path.into(),
            source,
        }
    }

    /// True for "nothing there" errors that `exists` turns into `false`.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::FileNotFound(_) | Error::MountNotFound(_) => true,
            Error::IoAt { source, .. } | Error::Io(source) => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }

    /// True if the error signals a failed AEAD tag check.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Error::Decryption { .. })
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        match *e {
            bincode::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                Error::Truncated(io.to_string())
            }
            other => Error::Serialization(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
