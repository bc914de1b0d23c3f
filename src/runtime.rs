//! Runtime bootstrap: the standard mount table of a packaged application.
//!
//! | Prefix      | Backing                           | Permissions              |
//! |-------------|-----------------------------------|--------------------------|
//! | `cfg://`    | `cfg.pak`                         | READ                     |
//! | `src://`    | `src.pak`                         | READ, LIST, EXECUTE      |
//! | `assets://` | `assets.pak`                      | READ, LIST               |
//! | `data://`   | `<base>/data`                     | READ_WRITE               |
//! | `user://`   | `<user data root>/<SafeName>`     | READ_WRITE               |

use crate::config::{
    sanitize_alphanumeric, KdfParams, ProjectConfig, ASSETS_PAK, CONFIG_FILENAME, CONFIG_PAK,
    SOURCE_PAK,
};
use crate::crypto::Secret;
use crate::error::{Error, Result};
use crate::vfs::{Mount, Permissions, ScriptExecutor, Vfs};
use std::path::{Path, PathBuf};
use tracing::info;

/// Options for [`Runtime::boot`].
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// KDF profile the archives were written with.
    pub kdf: KdfParams,
    /// Root for `user://`; the platform data directory when `None`.
    pub user_data_root: Option<PathBuf>,
    /// Name used when `umbra.toml` has no `name`.
    pub default_name: String,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            user_data_root: None,
            default_name: "umbra".to_string(),
        }
    }
}

/// A booted application: its configuration and mounted file system.
pub struct Runtime {
    base_dir: PathBuf,
    config: ProjectConfig,
    vfs: Vfs,
}

impl Runtime {
    /// Mount the archives and directories of the distribution in `base_dir`.
    pub fn boot(base_dir: &Path, secret: &Secret, options: RuntimeOptions) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::EmptySecret);
        }

        let mut vfs = Vfs::new();
        vfs.mount(
            "cfg://",
            Mount::pak_with_params(
                &base_dir.join(CONFIG_PAK),
                secret,
                Permissions::READ,
                options.kdf,
            )?,
        )?;

        let config_path = format!("cfg://{}", CONFIG_FILENAME);
        if !vfs.exists(&config_path)? {
            return Err(Error::Config(format!("{} not found in {}", CONFIG_FILENAME, CONFIG_PAK)));
        }
        let config = ProjectConfig::from_bytes(&vfs.read(&config_path)?, &options.default_name)?;

        vfs.mount(
            "src://",
            Mount::pak_with_params(
                &base_dir.join(SOURCE_PAK),
                secret,
                Permissions::READ | Permissions::LIST | Permissions::EXECUTE,
                options.kdf,
            )?,
        )?;
        vfs.mount(
            "assets://",
            Mount::pak_with_params(
                &base_dir.join(ASSETS_PAK),
                secret,
                Permissions::READ | Permissions::LIST,
                options.kdf,
            )?,
        )?;
        vfs.mount(
            "data://",
            Mount::directory(&base_dir.join("data"), Permissions::READ_WRITE)?,
        )?;

        let user_dir = user_data_dir(options.user_data_root, &config.name)?;
        vfs.mount(
            "user://",
            Mount::directory(&user_dir, Permissions::READ_WRITE)?,
        )?;

        let entry = entry_path(&config);
        if !vfs.exists(&entry)? {
            return Err(Error::FileNotFound(entry));
        }

        info!(
            name = %config.name,
            entry = %entry,
            base = %base_dir.display(),
            "runtime booted"
        );

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            config,
            vfs,
        })
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    pub fn vfs_mut(&mut self) -> &mut Vfs {
        &mut self.vfs
    }

    /// Virtual path of the entry script.
    pub fn entry(&self) -> String {
        entry_path(&self.config)
    }

    /// Install `executor` and run the entry script with it.
    pub fn run_entry(&mut self, executor: impl ScriptExecutor + 'static) -> Result<()> {
        self.vfs.set_executor(executor);
        let entry = self.entry();
        info!(entry = %entry, "running entry script");
        self.vfs.execute(&entry)
    }
}

fn entry_path(config: &ProjectConfig) -> String {
    format!("src://{}", config.entry)
}

fn user_data_dir(root: Option<PathBuf>, name: &str) -> Result<PathBuf> {
    let safe_name = sanitize_alphanumeric(name);
    if safe_name.is_empty() {
        return Err(Error::Config(format!(
            "application name '{}' has no alphanumeric characters",
            name
        )));
    }

    let root = root
        .or_else(dirs::data_dir)
        .ok_or_else(|| Error::Config("no user data directory on this platform".to_string()))?;
    Ok(root.join(safe_name))
}
