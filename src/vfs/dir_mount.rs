//! Directory-backed mount over a real filesystem directory.

use crate::error::{Error, Result};
use crate::vfs::mount::{MountBackend, ScriptExecutor};
use crate::vfs::path::VfsPath;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serves files below one directory.
pub struct DirMount {
    root: PathBuf,
}

impl DirMount {
    /// Use `root`, creating it (and parents) if it does not exist.
    pub fn new(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| Error::io_at(root, e))?;
        debug!(root = %root.display(), "directory mount ready");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<(VfsPath, PathBuf)> {
        let vfs_path = VfsPath::parse(path)?;
        let fs_path = vfs_path.to_fs_path(&self.root);
        Ok((vfs_path, fs_path))
    }

    fn require_existing(&self, path: &str) -> Result<PathBuf> {
        let (_, fs_path) = self.resolve(path)?;
        if !fs_path.exists() {
            return Err(Error::FileNotFound(path.to_string()));
        }
        Ok(fs_path)
    }
}

impl MountBackend for DirMount {
    fn exists(&self, path: &str) -> Result<bool> {
        let (_, fs_path) = self.resolve(path)?;
        Ok(fs_path.exists())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let (_, fs_path) = self.resolve(path)?;
        fs::read(&fs_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::FileNotFound(path.to_string()),
            _ => Error::io_at(&fs_path, e),
        })
    }

    /// Direct regular-file children of `path`, as mount-relative paths.
    fn list(&self, path: &str) -> Result<Vec<String>> {
        let (vfs_path, fs_path) = self.resolve(path)?;

        let entries = fs::read_dir(&fs_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::FileNotFound(path.to_string()),
            _ => Error::io_at(&fs_path, e),
        })?;

        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io_at(&fs_path, e))?;
            let file_type = entry.file_type().map_err(|e| Error::io_at(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                out.push(vfs_path.join(name)?.to_string());
            }
        }

        out.sort();
        Ok(out)
    }

    fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let fs_path = self.require_existing(path)?;
        fs::write(&fs_path, data).map_err(|e| Error::io_at(&fs_path, e))
    }

    fn create(&self, path: &str) -> Result<()> {
        let (_, fs_path) = self.resolve(path)?;
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&fs_path)
            .map(|_| ())
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::PathExists(path.to_string()),
                _ => Error::io_at(&fs_path, e),
            })
    }

    fn remove(&self, path: &str) -> Result<()> {
        let fs_path = self.require_existing(path)?;
        fs::remove_file(&fs_path).map_err(|e| Error::io_at(&fs_path, e))
    }

    fn execute(&self, path: &str, _executor: &dyn ScriptExecutor) -> Result<()> {
        self.require_existing(path)?;
        // TODO: run loose scripts once the scripting host can load from disk mounts.
        Err(Error::Unsupported {
            operation: "execute",
            path: path.to_string(),
        })
    }
}
