//! Packaging pipeline: project directory in, runnable distribution out.
//!
//! ```text
//! project/                      out/<Name>/
//!   umbra.toml        ──►        cfg.pak
//!   source/*          ──►        src.pak
//!   assets/*          ──►        assets.pak
//!   (umbra-runner)    ──►        <Name>[.exe]  + secret trailer
//!   (*.so next to runner) ──►    *.so
//! ```

use crate::config::{KdfParams, Project, ASSETS_PAK, CONFIG_PAK, RUNNER_NAME, SOURCE_PAK};
use crate::crypto::{generate_secret, Secret};
use crate::error::{Error, Result};
use crate::pak::{PakSummary, PakWriter};
use crate::trailer::append_secret_trailer;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[cfg(target_os = "windows")]
const SHARED_LIBRARY_EXTENSION: &str = "dll";
#[cfg(target_os = "macos")]
const SHARED_LIBRARY_EXTENSION: &str = "dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const SHARED_LIBRARY_EXTENSION: &str = "so";

/// Result of a successful [`package`] run.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    /// Distribution directory.
    pub output_dir: PathBuf,
    /// Runner copy carrying the secret trailer.
    pub executable: PathBuf,
    pub source_entries: u32,
    pub asset_entries: u32,
    pub config_entries: u32,
    /// Shared libraries copied next to the executable.
    pub libraries: Vec<PathBuf>,
    /// Fingerprint of the generated secret.
    pub fingerprint: String,
}

/// Runner binary shipped next to the current executable.
pub fn default_runner_path() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| Error::InvalidPath(format!("{} has no parent", exe.display())))?;
    Ok(dir.join(RUNNER_NAME))
}

/// File name of the packaged executable for an application name.
pub fn executable_name(safe_name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", safe_name)
    } else {
        safe_name.to_string()
    }
}

/// Build a distribution of `project_dir` under `out_root`.
///
/// One secret is generated per run and shared by the three archives and the
/// executable trailer. Any failure leaves a partial output directory that the
/// caller should discard.
pub fn package(
    project_dir: &Path,
    out_root: &Path,
    runner_path: &Path,
    params: KdfParams,
) -> Result<PackageReport> {
    let project = Project::load(project_dir)?;
    let safe_name = project.config.safe_name();
    if safe_name.is_empty() {
        return Err(Error::Config(format!(
            "application name '{}' has no alphanumeric characters",
            project.config.name
        )));
    }
    if !runner_path.is_file() {
        return Err(Error::FileNotFound(runner_path.display().to_string()));
    }

    let output_dir = out_root.join(&safe_name);
    fs::create_dir_all(&output_dir).map_err(|e| Error::io_at(&output_dir, e))?;
    info!(
        project = %project.root_dir.display(),
        output = %output_dir.display(),
        "packaging"
    );

    let secret = generate_secret()?;

    let source = write_pak(
        &output_dir.join(SOURCE_PAK),
        &secret,
        &project.source_dir,
        params,
        |writer| writer.add_tree(&project.source_dir).map(|_| ()),
    )?;
    let assets = write_pak(
        &output_dir.join(ASSETS_PAK),
        &secret,
        &project.assets_dir,
        params,
        |writer| writer.add_tree(&project.assets_dir).map(|_| ()),
    )?;
    let config = write_pak(
        &output_dir.join(CONFIG_PAK),
        &secret,
        &project.root_dir,
        params,
        |writer| writer.add_file(&project.config_file, None),
    )?;

    let executable = output_dir.join(executable_name(&safe_name));
    fs::copy(runner_path, &executable).map_err(|e| Error::io_at(runner_path, e))?;
    append_secret_trailer(&executable, &secret)?;

    let libraries = copy_shared_libraries(runner_path, &output_dir)?;

    let report = PackageReport {
        output_dir,
        executable,
        source_entries: source.entry_count,
        asset_entries: assets.entry_count,
        config_entries: config.entry_count,
        libraries,
        fingerprint: secret.fingerprint(),
    };

    info!(
        executable = %report.executable.display(),
        fingerprint = %report.fingerprint,
        "package complete"
    );

    Ok(report)
}

fn write_pak<F>(
    out: &Path,
    secret: &Secret,
    base: &Path,
    params: KdfParams,
    stage: F,
) -> Result<PakSummary>
where
    F: FnOnce(&mut PakWriter) -> Result<()>,
{
    let mut writer = PakWriter::with_params(out, secret, base, params)?;
    stage(&mut writer)?;
    writer.finish()
}

/// Copy the shared libraries sitting next to the runner.
fn copy_shared_libraries(runner_path: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let Some(runner_dir) = runner_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(Vec::new());
    };

    let entries = fs::read_dir(runner_dir).map_err(|e| Error::io_at(runner_dir, e))?;
    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io_at(runner_dir, e))?;
        let path = entry.path();
        let is_library = path
            .extension()
            .is_some_and(|ext| ext == SHARED_LIBRARY_EXTENSION);
        if !is_library || !path.is_file() {
            continue;
        }

        let target = output_dir.join(entry.file_name());
        fs::copy(&path, &target).map_err(|e| Error::io_at(&path, e))?;
        debug!(library = %path.display(), "copied shared library");
        copied.push(target);
    }

    copied.sort();
    Ok(copied)
}
