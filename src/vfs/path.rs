//! Sub-path handling for directory-backed mounts.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// A validated mount-relative path.
///
/// Never absolute and never contains `..`, so it cannot leave the mount root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VfsPath {
    components: Vec<String>,
}

impl VfsPath {
    /// Parse a mount-relative path string.
    ///
    /// Empty components and `.` are dropped; the empty string is the mount root.
    pub fn parse(path: &str) -> Result<Self> {
        if path.starts_with('/') || path.starts_with('\\') {
            return Err(Error::InvalidPath(format!(
                "path must be relative to the mount: {}",
                path
            )));
        }

        let components: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(|s| s.to_string())
            .collect();

        for component in &components {
            if component == ".." || component.contains('\\') || component.contains(':') {
                return Err(Error::InvalidPath(format!(
                    "Invalid path component: {}",
                    component
                )));
            }
        }

        Ok(Self { components })
    }

    /// Check if this is the mount root.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Join a child name.
    pub fn join(&self, name: &str) -> Result<Self> {
        if name.contains('/') || name == "." || name == ".." || name.is_empty() {
            return Err(Error::InvalidPath(format!(
                "Invalid path component: {}",
                name
            )));
        }

        let mut components = self.components.clone();
        components.push(name.to_string());
        Ok(Self { components })
    }

    /// Location of this path under a real directory.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.components);
        path
    }
}

impl std::fmt::Display for VfsPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.components.join("/"))
    }
}
