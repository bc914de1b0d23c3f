//! Configuration constants and project configuration for Umbra.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Archive magic tag: "UMBRAPAK" plus a NUL byte.
pub const PAK_MAGIC: [u8; 9] = *b"UMBRAPAK\0";

/// Embedded footer magic tag: "UMBRAKEY" plus a NUL byte.
pub const KEY_MAGIC: [u8; 9] = *b"UMBRAKEY\0";

pub const VERSION_MAJOR: u32 = parse_version_part(env!("CARGO_PKG_VERSION_MAJOR"));
pub const VERSION_MINOR: u32 = parse_version_part(env!("CARGO_PKG_VERSION_MINOR"));
pub const VERSION_PATCH: u32 = parse_version_part(env!("CARGO_PKG_VERSION_PATCH"));

/// Decimal version component; stops at the first non-digit.
const fn parse_version_part(part: &str) -> u32 {
    let bytes = part.as_bytes();
    let mut value = 0u32;
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        value = value * 10 + (bytes[i] - b'0') as u32;
        i += 1;
    }
    value
}

/// Pack a semantic version into the on-disk `u32` form.
pub const fn pack_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 16) | (minor << 8) | patch
}

/// Version written into archive headers and embedded footers.
pub const FORMAT_VERSION: u32 = pack_version(VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH);

/// Length of a generated secret in bytes.
pub const SECRET_LENGTH: usize = 32;

/// Per-archive salt length.
pub const SALT_LENGTH: usize = 16;

/// XChaCha20-Poly1305 nonce length.
pub const NONCE_LENGTH: usize = 24;

/// Poly1305 tag length.
pub const TAG_LENGTH: usize = 16;

/// Derived key length (256 bits).
pub const KEY_LENGTH: usize = 32;

/// Upper bound for a secret read back from an executable trailer.
pub const MAX_EMBEDDED_KEY_LENGTH: u32 = 1 << 20;

/// zstd level used for every entry.
pub const COMPRESSION_LEVEL: i32 = 3;

/// Project configuration file name, also its virtual path inside `cfg.pak`.
pub const CONFIG_FILENAME: &str = "umbra.toml";

/// Archive file names produced by packaging and mounted by the runtime.
pub const CONFIG_PAK: &str = "cfg.pak";
pub const SOURCE_PAK: &str = "src.pak";
pub const ASSETS_PAK: &str = "assets.pak";

/// Runner executable searched next to the packaging tool.
#[cfg(windows)]
pub const RUNNER_NAME: &str = "umbra-runner.exe";
#[cfg(not(windows))]
pub const RUNNER_NAME: &str = "umbra-runner";

/// Argon2id parameters for key derivation.
pub mod argon2_params {
    /// Memory cost in KiB (256 MB).
    pub const MEMORY_COST: u32 = 262_144;

    /// Time cost (iterations).
    pub const TIME_COST: u32 = 3;

    /// Parallelism factor.
    pub const PARALLELISM: u32 = 1;

    /// Output length in bytes (256 bits).
    pub const OUTPUT_LENGTH: usize = super::KEY_LENGTH;

    /// Salt length in bytes.
    pub const SALT_LENGTH: usize = super::SALT_LENGTH;
}

/// Argon2id cost profile.
///
/// The profile is not recorded in the archive, so a writer and every reader
/// of its output must agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Iterations.
    pub iterations: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl KdfParams {
    /// The production profile.
    pub const fn moderate() -> Self {
        Self {
            memory_kib: argon2_params::MEMORY_COST,
            iterations: argon2_params::TIME_COST,
            parallelism: argon2_params::PARALLELISM,
        }
    }

    /// A cheaper profile for interactive tooling.
    pub const fn interactive() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 2,
            parallelism: 1,
        }
    }

    /// Minimal profile for tests. Not for shipping archives.
    pub const fn testing() -> Self {
        Self {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::moderate()
    }
}

/// `umbra.toml` as written by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawProjectConfig {
    name: Option<String>,
    entry: Option<String>,
    assets_dir: Option<String>,
    source_dir: Option<String>,
}

/// Parsed project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Application name.
    pub name: String,
    /// Entry script, relative to the source archive.
    pub entry: String,
    /// Assets directory as written in the file.
    pub assets_dir: String,
    /// Source directory as written in the file.
    pub source_dir: String,
}

impl ProjectConfig {
    /// Parse configuration bytes, typically read through `cfg://`.
    ///
    /// `default_name` is used when the file has no `name` key.
    pub fn from_bytes(data: &[u8], default_name: &str) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::Config(format!("{} is not UTF-8: {}", CONFIG_FILENAME, e)))?;
        let raw: RawProjectConfig = toml::from_str(text)?;

        let entry = raw
            .entry
            .filter(|e| !e.is_empty())
            .ok_or_else(|| Error::Config("required field not found: entry".to_string()))?;

        Ok(Self {
            name: raw.name.unwrap_or_else(|| default_name.to_string()),
            entry,
            assets_dir: raw.assets_dir.unwrap_or_else(|| "assets".to_string()),
            source_dir: raw.source_dir.unwrap_or_else(|| "source".to_string()),
        })
    }

    /// Name reduced to ASCII alphanumerics.
    pub fn safe_name(&self) -> String {
        sanitize_alphanumeric(&self.name)
    }
}

/// A project directory on disk with its configuration resolved.
#[derive(Debug, Clone)]
pub struct Project {
    /// Absolute project root.
    pub root_dir: PathBuf,
    /// Path of `umbra.toml`.
    pub config_file: PathBuf,
    /// Absolute assets directory.
    pub assets_dir: PathBuf,
    /// Absolute source directory.
    pub source_dir: PathBuf,
    /// Parsed configuration.
    pub config: ProjectConfig,
}

impl Project {
    /// Load `umbra.toml` from `project_dir` and check the referenced directories.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let root_dir = std::path::absolute(project_dir)
            .map_err(|e| Error::io_at(project_dir, e))?;

        let config_file = root_dir.join(CONFIG_FILENAME);
        if !config_file.is_file() {
            return Err(Error::Config(format!(
                "{} not found at: {}",
                CONFIG_FILENAME,
                config_file.display()
            )));
        }

        let data = std::fs::read(&config_file).map_err(|e| Error::io_at(&config_file, e))?;
        let default_name = root_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let config = ProjectConfig::from_bytes(&data, &default_name)
            .map_err(|e| Error::Config(format!("{}: {}", config_file.display(), e)))?;

        let assets_dir = root_dir.join(&config.assets_dir);
        let source_dir = root_dir.join(&config.source_dir);

        if !assets_dir.is_dir() {
            return Err(Error::Config(format!(
                "assets directory not found: {}",
                assets_dir.display()
            )));
        }
        if !source_dir.is_dir() {
            return Err(Error::Config(format!(
                "source directory not found: {}",
                source_dir.display()
            )));
        }

        Ok(Self {
            root_dir,
            config_file,
            assets_dir,
            source_dir,
            config,
        })
    }
}

/// Keep only ASCII letters and digits.
pub fn sanitize_alphanumeric(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}
