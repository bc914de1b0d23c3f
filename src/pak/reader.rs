//! Archive reader.

use crate::config::{KdfParams, FORMAT_VERSION};
use crate::crypto::{Cipher, KeyDerivation, Secret};
use crate::error::{Error, Result};
use crate::pak::compression::decompress;
use crate::pak::format::{PakEntry, PakHeader};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Read-only view of one archive.
///
/// The index and the derived key are fixed after [`PakReader::open`]. Every
/// [`PakReader::read`] opens its own file handle, so one reader can be shared
/// across threads without locking.
pub struct PakReader {
    path: PathBuf,
    header: PakHeader,
    entries: Vec<PakEntry>,
    index: HashMap<String, usize>,
    cipher: Cipher,
}

impl PakReader {
    /// Open an archive written with the production KDF profile.
    pub fn open(path: &Path, secret: &Secret) -> Result<Self> {
        Self::open_with_params(path, secret, KdfParams::default())
    }

    /// Open an archive with an explicit KDF profile.
    pub fn open_with_params(path: &Path, secret: &Secret, params: KdfParams) -> Result<Self> {
        let (header, entries) = read_index(path)?;
        let key = KeyDerivation::from_salt(header.salt, params).derive_key(secret.as_bytes())?;

        let index = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.path.clone(), i))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            header,
            entries,
            index,
            cipher: Cipher::new(&key),
        })
    }

    /// Archive file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &PakHeader {
        &self.header
    }

    /// Check whether an entry exists.
    pub fn contains(&self, virtual_path: &str) -> bool {
        self.index.contains_key(virtual_path)
    }

    /// Index metadata for one entry.
    pub fn entry(&self, virtual_path: &str) -> Option<&PakEntry> {
        self.index.get(virtual_path).map(|&i| &self.entries[i])
    }

    /// All entries in index order. A path listed twice appears once, at its
    /// last record.
    pub fn entries(&self) -> impl Iterator<Item = &PakEntry> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(i, entry)| self.index.get(&entry.path) == Some(i))
            .map(|(_, entry)| entry)
    }

    /// All virtual paths in index order.
    pub fn list(&self) -> Vec<String> {
        self.entries().map(|entry| entry.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Decrypt and decompress one entry.
    pub fn read(&self, virtual_path: &str) -> Result<Vec<u8>> {
        let entry = self
            .entry(virtual_path)
            .ok_or_else(|| Error::FileNotFound(virtual_path.to_string()))?;

        let mut file = File::open(&self.path).map_err(|e| Error::io_at(&self.path, e))?;
        file.seek(SeekFrom::Start(entry.offset))
            .map_err(|e| Error::io_at(&self.path, e))?;

        let mut sealed = vec![0u8; entry.cipher_size as usize];
        file.read_exact(&mut sealed).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Truncated(format!("ciphertext of '{}'", entry.path))
            } else {
                Error::io_at(&self.path, e)
            }
        })?;

        let compressed = self.cipher.open(&entry.nonce, &entry.path, &sealed)?;
        decompress(&compressed, entry.raw_size, &entry.path)
    }
}

/// Parse the header and index of an archive without deriving a key.
///
/// Every entry's ciphertext range is checked against the file length.
pub fn read_index(path: &Path) -> Result<(PakHeader, Vec<PakEntry>)> {
    let file = File::open(path).map_err(|e| Error::io_at(path, e))?;
    let file_len = file.metadata().map_err(|e| Error::io_at(path, e))?.len();
    let mut reader = BufReader::new(file);

    let header = PakHeader::read_from(&mut reader)?;
    if header.version != FORMAT_VERSION {
        warn!(
            path = %path.display(),
            found = header.version,
            expected = FORMAT_VERSION,
            "pak version differs from this build"
        );
    }

    // Cap the preallocation; a corrupt count fails on the first short read.
    let mut entries = Vec::with_capacity(header.file_count.min(4096) as usize);
    for _ in 0..header.file_count {
        let entry = PakEntry::read_from(&mut reader)?;

        let end = entry.offset.checked_add(entry.cipher_size);
        if end.map_or(true, |end| end > file_len) {
            return Err(Error::Truncated(format!(
                "entry '{}' extends past end of file",
                entry.path
            )));
        }

        entries.push(entry);
    }

    debug!(
        path = %path.display(),
        entries = entries.len(),
        "pak index loaded"
    );

    Ok((header, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pak::PakWriter;
    use std::fs;
    use tempfile::TempDir;

    const FAST: KdfParams = KdfParams::testing();

    fn build(dir: &Path, secret: &Secret, files: &[(&str, &str)]) -> PathBuf {
        let out = dir.join("test.pak");
        let mut writer = PakWriter::with_params(&out, secret, dir, FAST).unwrap();
        for (path, data) in files {
            writer.add_bytes(path, data.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        out
    }

    #[test]
    fn test_roundtrip() {
        let dir = TempDir::new().unwrap();
        let secret = Secret::from_bytes(vec![1u8; 32]);
        let pak = build(dir.path(), &secret, &[("a.txt", "hello"), ("sub/b.txt", "world")]);

        let reader = PakReader::open_with_params(&pak, &secret, FAST).unwrap();
        assert_eq!(reader.len(), 2);
        assert!(reader.contains("a.txt"));
        assert_eq!(reader.read("a.txt").unwrap(), b"hello");
        assert_eq!(reader.read("sub/b.txt").unwrap(), b"world");
        assert_eq!(reader.list(), vec!["a.txt", "sub/b.txt"]);
    }

    #[test]
    fn test_missing_entry() {
        let dir = TempDir::new().unwrap();
        let secret = Secret::from_bytes(vec![1u8; 32]);
        let pak = build(dir.path(), &secret, &[("a.txt", "hello")]);

        let reader = PakReader::open_with_params(&pak, &secret, FAST).unwrap();
        assert!(matches!(reader.read("missing.txt"), Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_wrong_secret_is_auth_failure() {
        let dir = TempDir::new().unwrap();
        let pak = build(dir.path(), &Secret::from_bytes(vec![1u8; 32]), &[("a.txt", "hello")]);

        let reader =
            PakReader::open_with_params(&pak, &Secret::from_bytes(vec![2u8; 32]), FAST).unwrap();
        assert!(reader.read("a.txt").unwrap_err().is_authentication_failure());
    }

    #[test]
    fn test_bad_magic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.pak");
        fs::write(&path, vec![0u8; 64]).unwrap();

        let result = PakReader::open_with_params(&path, &Secret::from_bytes(vec![1u8; 32]), FAST);
        assert!(matches!(result, Err(Error::InvalidMagic { .. })));
    }

    #[test]
    fn test_truncated_index() {
        let dir = TempDir::new().unwrap();
        let secret = Secret::from_bytes(vec![1u8; 32]);
        let pak = build(dir.path(), &secret, &[("a.txt", "hello")]);

        let bytes = fs::read(&pak).unwrap();
        fs::write(&pak, &bytes[..50]).unwrap();

        let result = PakReader::open_with_params(&pak, &secret, FAST);
        assert!(matches!(result, Err(Error::Truncated(_))));
    }

    #[test]
    fn test_truncated_data() {
        let dir = TempDir::new().unwrap();
        let secret = Secret::from_bytes(vec![1u8; 32]);
        let pak = build(dir.path(), &secret, &[("a.txt", "hello")]);

        let bytes = fs::read(&pak).unwrap();
        fs::write(&pak, &bytes[..bytes.len() - 1]).unwrap();

        let result = PakReader::open_with_params(&pak, &secret, FAST);
        assert!(matches!(result, Err(Error::Truncated(_))));
    }

    #[test]
    fn test_read_index_without_secret() {
        let dir = TempDir::new().unwrap();
        let secret = Secret::from_bytes(vec![1u8; 32]);
        let pak = build(dir.path(), &secret, &[("a.txt", "hello")]);

        let (header, entries) = read_index(&pak).unwrap();
        assert_eq!(header.file_count, 1);
        assert_eq!(entries[0].path, "a.txt");
        assert_eq!(entries[0].raw_size, 5);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = PakReader::open_with_params(
            &dir.path().join("nope.pak"),
            &Secret::from_bytes(vec![1u8; 32]),
            FAST,
        );
        assert!(matches!(result, Err(Error::IoAt { .. })));
    }
}
