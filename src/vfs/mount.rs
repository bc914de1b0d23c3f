//! Permission-gated mounts.
//!
//! A [`Mount`] pairs a backing store with a [`Permissions`] set. Every public
//! operation checks the set first, so backends only implement the unchecked
//! operation.

use crate::config::KdfParams;
use crate::crypto::Secret;
use crate::error::{Error, Result};
use crate::vfs::dir_mount::DirMount;
use crate::vfs::pak_mount::PakMount;
use crate::vfs::permissions::{Operation, Permissions};
use std::path::Path;

/// Callback that runs script source read through the VFS.
///
/// `label` is the mount-relative path, used for diagnostics.
pub trait ScriptExecutor: Send + Sync {
    fn execute(&self, source: &[u8], label: &str) -> Result<()>;
}

impl<F> ScriptExecutor for F
where
    F: Fn(&[u8], &str) -> Result<()> + Send + Sync,
{
    fn execute(&self, source: &[u8], label: &str) -> Result<()> {
        self(source, label)
    }
}

/// Unchecked operations of a backing store.
pub trait MountBackend: Send + Sync {
    fn exists(&self, path: &str) -> Result<bool>;
    fn read(&self, path: &str) -> Result<Vec<u8>>;
    fn list(&self, path: &str) -> Result<Vec<String>>;
    fn write(&self, path: &str, data: &[u8]) -> Result<()>;
    fn create(&self, path: &str) -> Result<()>;
    fn remove(&self, path: &str) -> Result<()>;
    fn execute(&self, path: &str, executor: &dyn ScriptExecutor) -> Result<()>;
}

/// The backing stores a mount can use.
pub enum Backend {
    Pak(PakMount),
    Directory(DirMount),
}

impl Backend {
    fn inner(&self) -> &dyn MountBackend {
        match self {
            Backend::Pak(pak) => pak,
            Backend::Directory(dir) => dir,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Pak(_) => "pak",
            Backend::Directory(_) => "directory",
        }
    }
}

impl From<PakMount> for Backend {
    fn from(pak: PakMount) -> Self {
        Backend::Pak(pak)
    }
}

impl From<DirMount> for Backend {
    fn from(dir: DirMount) -> Self {
        Backend::Directory(dir)
    }
}

/// A backing store plus the operations it allows.
pub struct Mount {
    backend: Backend,
    permissions: Permissions,
}

impl Mount {
    pub fn new(backend: impl Into<Backend>, permissions: Permissions) -> Self {
        Self {
            backend: backend.into(),
            permissions,
        }
    }

    /// Mount an archive with the production KDF profile.
    pub fn pak(pak_path: &Path, secret: &Secret, permissions: Permissions) -> Result<Self> {
        Self::pak_with_params(pak_path, secret, permissions, KdfParams::default())
    }

    /// Mount an archive with an explicit KDF profile.
    pub fn pak_with_params(
        pak_path: &Path,
        secret: &Secret,
        permissions: Permissions,
        params: KdfParams,
    ) -> Result<Self> {
        Ok(Self::new(
            PakMount::open(pak_path, secret, params)?,
            permissions,
        ))
    }

    /// Mount a real directory, creating it if needed.
    pub fn directory(root: &Path, permissions: Permissions) -> Result<Self> {
        Ok(Self::new(DirMount::new(root)?, permissions))
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Whether every bit of `required` is granted.
    pub fn allows(&self, required: Permissions) -> bool {
        self.permissions.contains(required)
    }

    /// Fail with `PermissionDenied` unless `operation` is allowed.
    pub fn check(&self, operation: Operation, path: &str) -> Result<()> {
        if self.allows(operation.required()) {
            Ok(())
        } else {
            Err(Error::PermissionDenied {
                operation: operation.name(),
                path: path.to_string(),
            })
        }
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        self.check(Operation::Exists, path)?;
        self.backend.inner().exists(path)
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.check(Operation::Read, path)?;
        self.backend.inner().read(path)
    }

    pub fn list(&self, path: &str) -> Result<Vec<String>> {
        self.check(Operation::List, path)?;
        self.backend.inner().list(path)
    }

    pub fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        self.check(Operation::Write, path)?;
        self.backend.inner().write(path, data)
    }

    pub fn create(&self, path: &str) -> Result<()> {
        self.check(Operation::Create, path)?;
        self.backend.inner().create(path)
    }

    pub fn remove(&self, path: &str) -> Result<()> {
        self.check(Operation::Remove, path)?;
        self.backend.inner().remove(path)
    }

    pub fn execute(&self, path: &str, executor: &dyn ScriptExecutor) -> Result<()> {
        self.check(Operation::Execute, path)?;
        self.backend.inner().execute(path, executor)
    }
}
