//! On-disk layout of archive headers and index records.
//!
//! Records keep the natural alignment of the original C layout on 64-bit
//! little-endian targets, so explicit zero padding follows the magic tag and
//! the path length. bincode's fixed-int little-endian encoding writes the
//! fields back to back with no length prefixes for arrays.

use crate::config::{FORMAT_VERSION, NONCE_LENGTH, PAK_MAGIC, SALT_LENGTH};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// Encoded size of [`PakHeader`].
pub const HEADER_SIZE: u64 = 36;

/// Encoded size of one fixed index record, excluding the path bytes.
pub const RECORD_SIZE: u64 = 56;

/// Archive header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PakHeader {
    pub magic: [u8; 9],
    padding: [u8; 3],
    pub version: u32,
    pub file_count: u32,
    pub salt: [u8; SALT_LENGTH],
}

impl PakHeader {
    pub fn new(file_count: u32, salt: [u8; SALT_LENGTH]) -> Self {
        Self {
            magic: PAK_MAGIC,
            padding: [0; 3],
            version: FORMAT_VERSION,
            file_count,
            salt,
        }
    }

    /// Read and validate the magic tag.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let header: PakHeader =
            bincode::deserialize_from(reader).map_err(|e| truncated_as(e, "archive header"))?;

        if header.magic != PAK_MAGIC {
            return Err(Error::InvalidMagic { what: "archive" });
        }

        Ok(header)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        encode_into(writer, self)
    }
}

/// Serialize with bincode, surfacing failures as I/O errors so the caller can
/// attach the output path.
fn encode_into<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    bincode::serialize_into(writer, value).map_err(|e| match *e {
        bincode::ErrorKind::Io(source) => source,
        other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
    })
}

fn truncated_as(e: bincode::Error, what: &str) -> Error {
    match Error::from(e) {
        Error::Truncated(_) => Error::Truncated(what.to_string()),
        other => other,
    }
}

/// Fixed part of an index record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryRecord {
    offset: u64,
    cipher_size: u64,
    raw_size: u64,
    nonce: [u8; NONCE_LENGTH],
    path_length: u32,
    padding: [u8; 4],
}

/// One archive entry as held in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PakEntry {
    /// Absolute file offset of the ciphertext.
    pub offset: u64,
    /// Compressed size plus the AEAD tag.
    pub cipher_size: u64,
    /// Exact uncompressed size.
    pub raw_size: u64,
    #[serde(serialize_with = "hex_nonce")]
    pub nonce: [u8; NONCE_LENGTH],
    pub path: String,
}

fn hex_nonce<S: serde::Serializer>(
    nonce: &[u8; NONCE_LENGTH],
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(nonce))
}

impl PakEntry {
    /// Size of this entry's index record including its path bytes.
    pub fn index_size(&self) -> u64 {
        RECORD_SIZE + self.path.len() as u64
    }

    /// Read one record followed by its path bytes.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let record: EntryRecord =
            bincode::deserialize_from(&mut *reader).map_err(|e| truncated_as(e, "index record"))?;

        let mut path_bytes = Vec::new();
        (&mut *reader)
            .take(u64::from(record.path_length))
            .read_to_end(&mut path_bytes)?;
        if path_bytes.len() != record.path_length as usize {
            return Err(Error::Truncated("index path".to_string()));
        }

        let path = String::from_utf8(path_bytes)
            .map_err(|_| Error::Serialization("index path is not UTF-8".to_string()))?;

        Ok(Self {
            offset: record.offset,
            cipher_size: record.cipher_size,
            raw_size: record.raw_size,
            nonce: record.nonce,
            path,
        })
    }

    /// Write the record and the path bytes (no terminator).
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let path_length = u32::try_from(self.path.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path too long: {} bytes", self.path.len()),
            )
        })?;

        let record = EntryRecord {
            offset: self.offset,
            cipher_size: self.cipher_size,
            raw_size: self.raw_size,
            nonce: self.nonce,
            path_length,
            padding: [0; 4],
        };

        encode_into(&mut *writer, &record)?;
        writer.write_all(self.path.as_bytes())
    }
}
