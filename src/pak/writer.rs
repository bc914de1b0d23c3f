//! Archive writer.

use crate::config::KdfParams;
use crate::crypto::{Cipher, KeyDerivation, Secret};
use crate::error::{Error, Result};
use crate::pak::compression::compress;
use crate::pak::format::{PakEntry, PakHeader, HEADER_SIZE};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

/// An entry that has been compressed and sealed but not yet written.
struct PendingItem {
    virtual_path: String,
    raw_size: u64,
    nonce: [u8; crate::config::NONCE_LENGTH],
    cipher: Vec<u8>,
}

/// What [`PakWriter::finish`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PakSummary {
    /// Output archive.
    pub path: PathBuf,
    /// Number of entries.
    pub entry_count: u32,
    /// Sum of uncompressed sizes.
    pub raw_bytes: u64,
    /// Size of the archive file.
    pub file_size: u64,
}

/// Builds one archive file.
///
/// Each file is read, compressed and encrypted as soon as it is added.
/// The archive itself is only written by [`PakWriter::finish`], or on drop if
/// `finish` was never called.
pub struct PakWriter {
    out_file: PathBuf,
    virtual_base: PathBuf,
    salt: [u8; crate::config::SALT_LENGTH],
    cipher: Cipher,
    items: Vec<PendingItem>,
    index: HashMap<String, usize>,
    finished: bool,
}

impl PakWriter {
    /// Start an archive with the production KDF profile.
    ///
    /// # Arguments
    ///
    /// * `out_file` - Archive to create
    /// * `secret` - Secret shared by every archive of this build
    /// * `virtual_base` - Directory that virtual paths are computed against
    pub fn create(out_file: &Path, secret: &Secret, virtual_base: &Path) -> Result<Self> {
        Self::with_params(out_file, secret, virtual_base, KdfParams::default())
    }

    /// Start an archive with an explicit KDF profile.
    pub fn with_params(
        out_file: &Path,
        secret: &Secret,
        virtual_base: &Path,
        params: KdfParams,
    ) -> Result<Self> {
        let kdf = KeyDerivation::new(params);
        let key = kdf.derive_key(secret.as_bytes())?;

        let virtual_base =
            std::path::absolute(virtual_base).map_err(|e| Error::io_at(virtual_base, e))?;

        debug!(
            out = %out_file.display(),
            base = %virtual_base.display(),
            "pak writer created"
        );

        Ok(Self {
            out_file: out_file.to_path_buf(),
            virtual_base,
            salt: *kdf.salt(),
            cipher: Cipher::new(&key),
            items: Vec::new(),
            index: HashMap::new(),
            finished: false,
        })
    }

    /// Number of staged entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Stage one file from disk.
    ///
    /// The virtual path is `virtual_override` if given, otherwise the path of
    /// `disk_path` relative to the writer's base directory, `/`-separated.
    pub fn add_file(&mut self, disk_path: &Path, virtual_override: Option<&str>) -> Result<()> {
        let virtual_path = match virtual_override {
            Some(path) => path.to_string(),
            None => self.relative_virtual_path(disk_path)?,
        };

        let raw = std::fs::read(disk_path).map_err(|e| Error::io_at(disk_path, e))?;
        self.add_bytes(&virtual_path, &raw)
    }

    /// Stage an in-memory buffer under `virtual_path`.
    pub fn add_bytes(&mut self, virtual_path: &str, data: &[u8]) -> Result<()> {
        validate_virtual_path(virtual_path)?;

        let compressed = compress(data)?;
        let nonce = Cipher::generate_nonce();
        let cipher = self.cipher.seal(&nonce, virtual_path, &compressed)?;

        let item = PendingItem {
            virtual_path: virtual_path.to_string(),
            raw_size: data.len() as u64,
            nonce,
            cipher,
        };

        debug!(
            path = virtual_path,
            raw = item.raw_size,
            sealed = item.cipher.len(),
            "staged pak entry"
        );

        // Last write wins, keeping the first insertion position.
        match self.index.get(virtual_path) {
            Some(&slot) => {
                debug!(path = virtual_path, "replacing staged entry");
                self.items[slot] = item;
            }
            None => {
                self.index.insert(item.virtual_path.clone(), self.items.len());
                self.items.push(item);
            }
        }

        Ok(())
    }

    /// Stage every regular file directly inside `directory`.
    ///
    /// Subdirectories are not descended into. Files are added in file-name
    /// order. Returns the number of files staged; a missing directory stages
    /// nothing.
    pub fn add_tree(&mut self, directory: &Path) -> Result<usize> {
        if !directory.exists() {
            return Ok(0);
        }

        let walker = WalkDir::new(directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        let mut count = 0;
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(directory).to_path_buf();
                Error::io_at(path, e.into())
            })?;

            if entry.file_type().is_file() {
                self.add_file(entry.path(), None)?;
                count += 1;
            }
        }

        Ok(count)
    }

    /// Write the archive and consume the writer.
    pub fn finish(mut self) -> Result<PakSummary> {
        self.finished = true;
        self.write_out()
    }

    fn write_out(&mut self) -> Result<PakSummary> {
        let entry_count = u32::try_from(self.items.len())
            .map_err(|_| Error::Serialization("too many entries".to_string()))?;

        let index_size: u64 = self
            .items
            .iter()
            .map(|item| crate::pak::format::RECORD_SIZE + item.virtual_path.len() as u64)
            .sum();

        let mut offset = HEADER_SIZE + index_size;
        let mut entries = Vec::with_capacity(self.items.len());
        for item in &self.items {
            entries.push(PakEntry {
                offset,
                cipher_size: item.cipher.len() as u64,
                raw_size: item.raw_size,
                nonce: item.nonce,
                path: item.virtual_path.clone(),
            });
            offset += item.cipher.len() as u64;
        }

        let file = File::create(&self.out_file).map_err(|e| Error::io_at(&self.out_file, e))?;
        let mut out = BufWriter::new(file);

        PakHeader::new(entry_count, self.salt)
            .write_to(&mut out)
            .map_err(|e| Error::io_at(&self.out_file, e))?;
        for entry in &entries {
            entry
                .write_to(&mut out)
                .map_err(|e| Error::io_at(&self.out_file, e))?;
        }
        for item in &self.items {
            out.write_all(&item.cipher)
                .map_err(|e| Error::io_at(&self.out_file, e))?;
        }
        out.flush().map_err(|e| Error::io_at(&self.out_file, e))?;

        let summary = PakSummary {
            path: self.out_file.clone(),
            entry_count,
            raw_bytes: self.items.iter().map(|item| item.raw_size).sum(),
            file_size: offset,
        };

        info!(
            path = %summary.path.display(),
            entries = summary.entry_count,
            bytes = summary.file_size,
            "pak written"
        );

        Ok(summary)
    }

    fn relative_virtual_path(&self, disk_path: &Path) -> Result<String> {
        let absolute = std::path::absolute(disk_path).map_err(|e| Error::io_at(disk_path, e))?;
        let relative = absolute.strip_prefix(&self.virtual_base).map_err(|_| {
            Error::InvalidPath(format!(
                "{} is not under {}",
                disk_path.display(),
                self.virtual_base.display()
            ))
        })?;

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str().ok_or_else(|| {
                    Error::InvalidPath(format!("{} is not UTF-8", disk_path.display()))
                })?),
                Component::CurDir => {}
                _ => {
                    return Err(Error::InvalidPath(format!(
                        "cannot derive a virtual path for {}",
                        disk_path.display()
                    )))
                }
            }
        }

        Ok(parts.join("/"))
    }
}

impl Drop for PakWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Err(e) = self.write_out() {
            error!(path = %self.out_file.display(), error = %e, "failed to finalize pak on drop");
        }
    }
}

fn validate_virtual_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::InvalidPath("virtual path is empty".to_string()));
    }
    if u32::try_from(path.len()).is_err() {
        return Err(Error::InvalidPath(format!("path too long: {} bytes", path.len())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pak::format::RECORD_SIZE;
    use std::fs;
    use tempfile::TempDir;

    fn secret() -> Secret {
        Secret::from_bytes(vec![5u8; 32])
    }

    #[test]
    fn test_empty_archive() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("empty.pak");

        let writer =
            PakWriter::with_params(&out, &secret(), dir.path(), KdfParams::testing()).unwrap();
        let summary = writer.finish().unwrap();

        assert_eq!(summary.entry_count, 0);
        assert_eq!(fs::metadata(&out).unwrap().len(), HEADER_SIZE);
    }

    #[test]
    fn test_layout_offsets() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.pak");

        let mut writer =
            PakWriter::with_params(&out, &secret(), dir.path(), KdfParams::testing()).unwrap();
        writer.add_bytes("a.txt", b"hello").unwrap();
        writer.add_bytes("sub/b.txt", b"world").unwrap();
        let summary = writer.finish().unwrap();

        let file_len = fs::metadata(&out).unwrap().len();
        assert_eq!(summary.file_size, file_len);
        assert!(file_len > HEADER_SIZE + 2 * RECORD_SIZE + 5 + 9);
    }

    #[test]
    fn test_virtual_path_from_base() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"world").unwrap();

        let writer = PakWriter::with_params(
            &dir.path().join("o.pak"),
            &secret(),
            dir.path(),
            KdfParams::testing(),
        )
        .unwrap();
        let path = writer
            .relative_virtual_path(&dir.path().join("sub/b.txt"))
            .unwrap();
        assert_eq!(path, "sub/b.txt");

        let outside = writer.relative_virtual_path(Path::new("/definitely/elsewhere"));
        assert!(matches!(outside, Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_duplicate_path_replaces_in_place() {
        let dir = TempDir::new().unwrap();
        let mut writer = PakWriter::with_params(
            &dir.path().join("d.pak"),
            &secret(),
            dir.path(),
            KdfParams::testing(),
        )
        .unwrap();

        writer.add_bytes("a", b"one").unwrap();
        writer.add_bytes("b", b"two").unwrap();
        writer.add_bytes("a", b"three").unwrap();

        assert_eq!(writer.len(), 2);
        assert_eq!(writer.items[0].virtual_path, "a");
        assert_eq!(writer.items[0].raw_size, 5);
    }

    #[test]
    fn test_empty_virtual_path_rejected() {
        let dir = TempDir::new().unwrap();
        let mut writer = PakWriter::with_params(
            &dir.path().join("e.pak"),
            &secret(),
            dir.path(),
            KdfParams::testing(),
        )
        .unwrap();

        assert!(matches!(
            writer.add_bytes("", b"x"),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn test_unwritable_output_fails() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("missing-dir").join("x.pak");

        let writer =
            PakWriter::with_params(&out, &secret(), dir.path(), KdfParams::testing()).unwrap();
        let err = writer.finish().unwrap_err();
        assert!(matches!(err, Error::IoAt { .. }));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_index_write_failure_names_output() {
        let dir = TempDir::new().unwrap();
        let out = Path::new("/dev/full");

        let mut writer =
            PakWriter::with_params(out, &secret(), dir.path(), KdfParams::testing()).unwrap();
        // Longer than the output buffer, so the index write itself hits the device.
        let long_path = "p".repeat(20_000);
        writer.add_bytes(&long_path, b"data").unwrap();

        let err = writer.finish().unwrap_err();
        assert!(
            matches!(&err, Error::IoAt { path, .. } if path == out),
            "got {err:?}"
        );
        assert!(err.to_string().contains("/dev/full"));
    }

    #[test]
    fn test_drop_finalizes() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("drop.pak");

        {
            let mut writer =
                PakWriter::with_params(&out, &secret(), dir.path(), KdfParams::testing()).unwrap();
            writer.add_bytes("x", b"data").unwrap();
        }

        assert!(out.exists());
    }

    #[test]
    fn test_add_tree_is_single_level() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.lua"), b"a").unwrap();
        fs::write(src.join("b.lua"), b"b").unwrap();
        fs::write(src.join("nested/c.lua"), b"c").unwrap();

        let mut writer =
            PakWriter::with_params(&dir.path().join("t.pak"), &secret(), &src, KdfParams::testing())
                .unwrap();
        assert_eq!(writer.add_tree(&src).unwrap(), 2);
        assert_eq!(writer.items[0].virtual_path, "a.lua");
        assert_eq!(writer.items[1].virtual_path, "b.lua");

        assert_eq!(writer.add_tree(&dir.path().join("nope")).unwrap(), 0);
    }
}
