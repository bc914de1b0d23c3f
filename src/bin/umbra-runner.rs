//! Umbra runner - boots a packaged application from its own directory.
//!
//! The secret is read from the trailer of this executable. Script execution
//! belongs to the embedding engine; this runner mounts everything, checks the
//! entry script and reports what it would run.

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use umbra_pak::trailer::read_embedded_secret;
use umbra_pak::{KdfParams, Runtime, RuntimeOptions};

#[derive(Parser)]
#[command(name = "umbra-runner")]
#[command(version, about = "Run a packaged Umbra application", long_about = None)]
struct Cli {
    /// Directory holding the pak files (default: this executable's directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Archives were packed with `umbra pack --fast-kdf`
    #[arg(long)]
    fast_kdf: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let exe = std::env::current_exe().context("resolving executable path")?;
    let secret = read_embedded_secret(&exe)
        .with_context(|| format!("reading embedded secret from {}", exe.display()))?;

    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => exe
            .parent()
            .map(PathBuf::from)
            .context("executable has no parent directory")?,
    };

    let default_name = exe
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "umbra".to_string());

    let options = RuntimeOptions {
        kdf: if cli.fast_kdf {
            KdfParams::interactive()
        } else {
            KdfParams::default()
        },
        default_name,
        ..RuntimeOptions::default()
    };

    let runtime = Runtime::boot(&base_dir, &secret, options)
        .with_context(|| format!("booting from {}", base_dir.display()))?;

    info!(
        name = %runtime.config().name,
        entry = %runtime.entry(),
        mounts = ?runtime.vfs().mounts(),
        "application ready"
    );

    Ok(())
}
