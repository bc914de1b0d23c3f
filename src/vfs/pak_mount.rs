//! Archive-backed mount. Read-only whatever its permission bits say.

use crate::config::KdfParams;
use crate::crypto::Secret;
use crate::error::{Error, Result};
use crate::pak::PakReader;
use crate::vfs::mount::{MountBackend, ScriptExecutor};
use std::path::Path;
use tracing::debug;

/// Serves entries of one [`PakReader`].
pub struct PakMount {
    reader: PakReader,
    sorted: Vec<String>,
}

impl PakMount {
    pub fn open(pak_path: &Path, secret: &Secret, params: KdfParams) -> Result<Self> {
        Ok(Self::from_reader(PakReader::open_with_params(
            pak_path, secret, params,
        )?))
    }

    pub fn from_reader(reader: PakReader) -> Self {
        let mut sorted = reader.list();
        sorted.sort();
        Self { reader, sorted }
    }

    pub fn reader(&self) -> &PakReader {
        &self.reader
    }

    fn unsupported(operation: &'static str, path: &str) -> Error {
        Error::Unsupported {
            operation,
            path: path.to_string(),
        }
    }
}

impl MountBackend for PakMount {
    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self
            .sorted
            .binary_search_by(|p| p.as_str().cmp(path))
            .is_ok())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.reader.read(path)
    }

    /// Entries under `path` as a `/`-separated prefix; all entries for "".
    fn list(&self, path: &str) -> Result<Vec<String>> {
        if path.is_empty() {
            return Ok(self.sorted.clone());
        }

        let mut directory = path.to_string();
        if !directory.ends_with('/') {
            directory.push('/');
        }

        Ok(self
            .sorted
            .iter()
            .filter(|p| p.starts_with(&directory))
            .cloned()
            .collect())
    }

    fn write(&self, path: &str, _data: &[u8]) -> Result<()> {
        Err(Self::unsupported("write", path))
    }

    fn create(&self, path: &str) -> Result<()> {
        Err(Self::unsupported("create", path))
    }

    fn remove(&self, path: &str) -> Result<()> {
        Err(Self::unsupported("remove", path))
    }

    fn execute(&self, path: &str, executor: &dyn ScriptExecutor) -> Result<()> {
        if !self.exists(path)? {
            return Err(Error::FileNotFound(path.to_string()));
        }

        let source = self.reader.read(path)?;
        debug!(path, bytes = source.len(), "executing script from pak");
        executor.execute(&source, path)
    }
}
