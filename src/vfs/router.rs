//! Prefix router over the registered mounts.

use crate::error::{Error, Result};
use crate::vfs::mount::{Mount, ScriptExecutor};
use crate::vfs::permissions::{Operation, Permissions};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Scheme suffix every mount prefix ends with.
pub const SCHEME_SUFFIX: &str = "://";

/// Virtual file system: owns its mounts and dispatches by prefix.
///
/// Mutation (`mount`, `unmount`, `set_executor`) takes `&mut self`; every
/// file operation takes `&self`.
#[derive(Default)]
pub struct Vfs {
    mounts: HashMap<String, Mount>,
    executor: Option<Box<dyn ScriptExecutor>>,
}

impl Vfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `mount` under `prefix`, replacing any previous mount there.
    pub fn mount(&mut self, prefix: &str, mount: Mount) -> Result<()> {
        if !prefix.ends_with(SCHEME_SUFFIX) {
            return Err(Error::InvalidMountPrefix(prefix.to_string()));
        }

        let kind = mount.backend().kind();
        let permissions = mount.permissions();
        if self.mounts.insert(prefix.to_string(), mount).is_some() {
            warn!(prefix, "replacing existing mount");
        }
        info!(prefix, kind, ?permissions, "mounted");
        Ok(())
    }

    /// Remove and return the mount at `prefix`, if any.
    pub fn unmount(&mut self, prefix: &str) -> Option<Mount> {
        let removed = self.mounts.remove(prefix);
        if removed.is_some() {
            info!(prefix, "unmounted");
        }
        removed
    }

    /// Registered prefixes, sorted.
    pub fn mounts(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.mounts.keys().map(String::as_str).collect();
        prefixes.sort_unstable();
        prefixes
    }

    /// Install the callback used by [`Vfs::execute`].
    pub fn set_executor(&mut self, executor: impl ScriptExecutor + 'static) {
        self.executor = Some(Box::new(executor));
    }

    /// Find the mount for `virtual_path` and the sub-path inside it.
    ///
    /// The longest matching prefix wins. One `/` after the prefix is dropped.
    fn route<'a>(&self, virtual_path: &'a str) -> Result<(&Mount, &'a str)> {
        let (prefix, mount) = self
            .mounts
            .iter()
            .filter(|(prefix, _)| virtual_path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .ok_or_else(|| Error::MountNotFound(virtual_path.to_string()))?;

        let rest = &virtual_path[prefix.len()..];
        let sub_path = rest.strip_prefix('/').unwrap_or(rest);
        debug!(virtual_path, prefix = prefix.as_str(), sub_path, "routed");
        Ok((mount, sub_path))
    }

    /// Whether `virtual_path` exists. Missing mounts and files are `false`;
    /// other failures, including permission errors, propagate.
    pub fn exists(&self, virtual_path: &str) -> Result<bool> {
        let result = self
            .route(virtual_path)
            .and_then(|(mount, sub_path)| mount.exists(sub_path));
        match result {
            Err(e) if e.is_not_found() => Ok(false),
            other => other,
        }
    }

    pub fn read(&self, virtual_path: &str) -> Result<Vec<u8>> {
        let (mount, sub_path) = self.route(virtual_path)?;
        mount.read(sub_path)
    }

    pub fn list(&self, virtual_path: &str) -> Result<Vec<String>> {
        let (mount, sub_path) = self.route(virtual_path)?;
        mount.list(sub_path)
    }

    pub fn write(&self, virtual_path: &str, data: &[u8]) -> Result<()> {
        let (mount, sub_path) = self.route(virtual_path)?;
        mount.write(sub_path, data)
    }

    pub fn create(&self, virtual_path: &str) -> Result<()> {
        let (mount, sub_path) = self.route(virtual_path)?;
        mount.create(sub_path)
    }

    pub fn remove(&self, virtual_path: &str) -> Result<()> {
        let (mount, sub_path) = self.route(virtual_path)?;
        mount.remove(sub_path)
    }

    /// Run a script through the installed executor.
    pub fn execute(&self, virtual_path: &str) -> Result<()> {
        let (mount, sub_path) = self.route(virtual_path)?;
        mount.check(Operation::Execute, sub_path)?;
        let executor = self.executor.as_deref().ok_or_else(|| Error::Unsupported {
            operation: "execute",
            path: virtual_path.to_string(),
        })?;
        mount.execute(sub_path, executor)
    }

    /// Whether the mount serving `prefix` grants every bit of `permissions`.
    pub fn has_permission(&self, prefix: &str, permissions: Permissions) -> Result<bool> {
        let (mount, _) = self.route(prefix)?;
        Ok(mount.allows(permissions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn data_vfs(dir: &TempDir) -> Vfs {
        let mut vfs = Vfs::new();
        vfs.mount(
            "data://",
            Mount::directory(dir.path(), Permissions::READ_WRITE).unwrap(),
        )
        .unwrap();
        vfs
    }

    #[test]
    fn test_prefix_must_have_scheme() {
        let dir = TempDir::new().unwrap();
        let mut vfs = Vfs::new();
        let mount = Mount::directory(dir.path(), Permissions::READ).unwrap();

        assert!(matches!(
            vfs.mount("data:/", mount),
            Err(Error::InvalidMountPrefix(_))
        ));
        assert!(vfs.mounts().is_empty());
    }

    #[test]
    fn test_route_strips_one_slash() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"A").unwrap();
        let vfs = data_vfs(&dir);

        assert_eq!(vfs.read("data://a.txt").unwrap(), b"A");
        assert_eq!(vfs.read("data:///a.txt").unwrap(), b"A");
    }

    #[test]
    fn test_longest_prefix_wins() {
        let outer = TempDir::new().unwrap();
        let inner = TempDir::new().unwrap();
        fs::write(outer.path().join("x"), b"outer").unwrap();
        fs::write(inner.path().join("x"), b"inner").unwrap();

        let mut vfs = Vfs::new();
        vfs.mount("game://", Mount::directory(outer.path(), Permissions::READ).unwrap())
            .unwrap();
        vfs.mount("game://mods://", Mount::directory(inner.path(), Permissions::READ).unwrap())
            .unwrap();

        assert_eq!(vfs.read("game://x").unwrap(), b"outer");
        assert_eq!(vfs.read("game://mods://x").unwrap(), b"inner");
    }

    #[test]
    fn test_exists_converts_not_found_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"A").unwrap();
        let mut vfs = data_vfs(&dir);

        assert!(vfs.exists("data://a.txt").unwrap());
        assert!(!vfs.exists("data://b.txt").unwrap());
        assert!(!vfs.exists("nothing://a.txt").unwrap());

        vfs.mount("locked://", Mount::directory(dir.path(), Permissions::LIST).unwrap())
            .unwrap();
        assert!(matches!(
            vfs.exists("locked://a.txt"),
            Err(Error::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_remount_replaces() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(second.path().join("only-here"), b"2").unwrap();

        let mut vfs = data_vfs(&first);
        vfs.mount("data://", Mount::directory(second.path(), Permissions::READ).unwrap())
            .unwrap();

        assert_eq!(vfs.mounts(), vec!["data://"]);
        assert_eq!(vfs.read("data://only-here").unwrap(), b"2");
    }

    #[test]
    fn test_unmount() {
        let dir = TempDir::new().unwrap();
        let mut vfs = data_vfs(&dir);

        assert!(vfs.unmount("data://").is_some());
        assert!(vfs.unmount("data://").is_none());
        assert!(matches!(vfs.read("data://a"), Err(Error::MountNotFound(_))));
    }

    #[test]
    fn test_execute_without_executor() {
        let dir = TempDir::new().unwrap();
        let mut vfs = Vfs::new();
        vfs.mount("src://", Mount::directory(dir.path(), Permissions::EXECUTE).unwrap())
            .unwrap();

        assert!(matches!(
            vfs.execute("src://main.lua"),
            Err(Error::Unsupported { .. })
        ));
    }

    #[test]
    fn test_execute_checks_permission_first() {
        let dir = TempDir::new().unwrap();
        let vfs = data_vfs(&dir);

        assert!(matches!(
            vfs.execute("data://main.lua"),
            Err(Error::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_has_permission() {
        let dir = TempDir::new().unwrap();
        let vfs = data_vfs(&dir);

        assert!(vfs.has_permission("data://", Permissions::WRITE).unwrap());
        assert!(!vfs.has_permission("data://", Permissions::EXECUTE).unwrap());
        assert!(matches!(
            vfs.has_permission("cfg://", Permissions::READ),
            Err(Error::MountNotFound(_))
        ));
    }
}
