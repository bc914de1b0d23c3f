//! zstd compression for archive entries.

use crate::config::COMPRESSION_LEVEL;
use crate::error::{Error, Result};
use std::io::Read;

/// Compress one entry at the fixed archive level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    zstd::bulk::compress(data, COMPRESSION_LEVEL)
        .map_err(|e| Error::Compression(e.to_string()))
}

/// Decompress one entry and check it against the recorded size.
///
/// `raw_size` comes from the unauthenticated index, so the output grows with
/// the decoded stream and is never preallocated from it. At most
/// `raw_size + 1` bytes are decoded; any other length is a size mismatch.
pub fn decompress(data: &[u8], raw_size: u64, path: &str) -> Result<Vec<u8>> {
    let decode_error =
        |e: std::io::Error| Error::Decompression(format!("zstd decompression of '{}' failed: {}", path, e));

    let decoder = zstd::stream::read::Decoder::new(data).map_err(decode_error)?;
    let mut out = Vec::new();
    decoder
        .take(raw_size.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(decode_error)?;

    if out.len() as u64 != raw_size {
        return Err(Error::SizeMismatch {
            path: path.to_string(),
            expected: raw_size,
            actual: out.len() as u64,
        });
    }

    Ok(out)
}
