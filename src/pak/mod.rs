//! The Umbra archive (`.pak`) codec.
//!
//! An archive is written once and read many times:
//!
//! ```text
//! [Header][Record#0][path#0]...[Record#N][path#N][ciphertext#0]...[ciphertext#N]
//! ```
//!
//! Each entry is zstd-compressed, then sealed with XChaCha20-Poly1305 under a
//! key derived from the shared secret and the archive's own salt, using the
//! entry's virtual path as associated data.

mod compression;
mod format;
mod reader;
mod writer;

pub use compression::{compress, decompress};
pub use format::{PakEntry, PakHeader, HEADER_SIZE, RECORD_SIZE};
pub use reader::{read_index, PakReader};
pub use writer::{PakSummary, PakWriter};
