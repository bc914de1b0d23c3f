//! Umbra - packaging and inspection tool for Umbra pak archives.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use umbra_pak::package::{default_runner_path, package};
use umbra_pak::pak::{read_index, PakReader};
use umbra_pak::trailer::read_embedded_secret;
use umbra_pak::KdfParams;

#[derive(Parser)]
#[command(name = "umbra")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Package applications into encrypted Umbra archives",
    long_about = "Builds encrypted pak archives and a runner executable carrying their secret, and inspects existing archives."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package a project directory into a distribution
    Pack {
        /// Project directory containing umbra.toml (default: current directory)
        #[arg(default_value = ".")]
        project_dir: PathBuf,

        /// Output root; the distribution goes into <out>/<Name>
        #[arg(long, default_value = "out")]
        out: PathBuf,

        /// Runner executable to copy (default: umbra-runner next to this tool)
        #[arg(long)]
        runner: Option<PathBuf>,

        /// Use the light KDF profile (run the result with --fast-kdf)
        #[arg(long)]
        fast_kdf: bool,
    },

    /// List archive entries
    Ls {
        /// Archive to list
        pak: PathBuf,

        /// Executable carrying the archive's secret
        #[arg(long)]
        key_from: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Archive was packed with --fast-kdf
        #[arg(long)]
        fast_kdf: bool,
    },

    /// Decrypt one archive entry
    Cat {
        /// Archive to read
        pak: PathBuf,

        /// Virtual path inside the archive
        virtual_path: String,

        /// Executable carrying the archive's secret
        #[arg(long)]
        key_from: PathBuf,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Archive was packed with --fast-kdf
        #[arg(long)]
        fast_kdf: bool,
    },

    /// Show header and index without decrypting
    Inspect {
        /// Archive to inspect
        pak: PathBuf,
    },

    /// Show the fingerprint of an embedded secret
    Key {
        /// Executable carrying a secret trailer
        executable: PathBuf,
    },
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
    match cli.command {
        Commands::Pack {
            project_dir,
            out,
            runner,
            fast_kdf,
        } => cmd_pack(&project_dir, &out, runner, fast_kdf),

        Commands::Ls {
            pak,
            key_from,
            json,
            fast_kdf,
        } => cmd_ls(&pak, &key_from, json, kdf_params(fast_kdf)),

        Commands::Cat {
            pak,
            virtual_path,
            key_from,
            output,
            fast_kdf,
        } => cmd_cat(&pak, &virtual_path, &key_from, output, kdf_params(fast_kdf)),

        Commands::Inspect { pak } => cmd_inspect(&pak),

        Commands::Key { executable } => cmd_key(&executable),
    }
}

fn kdf_params(fast: bool) -> KdfParams {
    if fast {
        KdfParams::interactive()
    } else {
        KdfParams::default()
    }
}

fn open_pak(pak: &Path, key_from: &Path, params: KdfParams) -> Result<PakReader> {
    let secret = read_embedded_secret(key_from)
        .with_context(|| format!("reading secret from {}", key_from.display()))?;
    PakReader::open_with_params(pak, &secret, params)
        .with_context(|| format!("opening {}", pak.display()))
}

fn cmd_pack(project_dir: &Path, out: &Path, runner: Option<PathBuf>, fast_kdf: bool) -> Result<()> {
    let runner = match runner {
        Some(path) => path,
        None => default_runner_path().context("locating runner")?,
    };

    let report = package(project_dir, out, &runner, kdf_params(fast_kdf))
        .with_context(|| format!("packaging {}", project_dir.display()))?;

    println!("Package created successfully!");
    println!("  Output:       {}", report.output_dir.display());
    println!("  Executable:   {}", report.executable.display());
    println!("  Source files: {}", report.source_entries);
    println!("  Asset files:  {}", report.asset_entries);
    println!("  Libraries:    {}", report.libraries.len());
    println!("  Key:          {}", report.fingerprint);

    Ok(())
}

#[derive(Serialize)]
struct ListedEntry<'a> {
    path: &'a str,
    raw_size: u64,
    cipher_size: u64,
}

fn cmd_ls(pak: &Path, key_from: &Path, json: bool, params: KdfParams) -> Result<()> {
    let reader = open_pak(pak, key_from, params)?;
    let entries: Vec<ListedEntry> = reader
        .entries()
        .map(|entry| ListedEntry {
            path: &entry.path,
            raw_size: entry.raw_size,
            cipher_size: entry.cipher_size,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("(empty)");
    } else {
        for entry in entries {
            println!("{:>10} {:>10}  {}", entry.raw_size, entry.cipher_size, entry.path);
        }
    }

    Ok(())
}

fn cmd_cat(
    pak: &Path,
    virtual_path: &str,
    key_from: &Path,
    output: Option<PathBuf>,
    params: KdfParams,
) -> Result<()> {
    let reader = open_pak(pak, key_from, params)?;
    if !reader.contains(virtual_path) {
        bail!("{} has no entry '{}'", pak.display(), virtual_path);
    }

    let data = reader.read(virtual_path)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &data).with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} bytes to {}", data.len(), path.display());
        }
        None => {
            io::stdout().write_all(&data)?;
        }
    }

    Ok(())
}

fn cmd_inspect(pak: &Path) -> Result<()> {
    let (header, entries) = read_index(pak).with_context(|| format!("reading {}", pak.display()))?;

    println!("Umbra Pak");
    println!("=========");
    println!("File:       {}", pak.display());
    println!("Version:    {:#08x}", header.version);
    println!("Entries:    {}", header.file_count);
    println!("Salt:       {}", hex::encode(header.salt));
    println!();

    for entry in &entries {
        println!("{}", entry.path);
        println!("  offset:      {}", entry.offset);
        println!("  raw size:    {}", entry.raw_size);
        println!("  cipher size: {}", entry.cipher_size);
        println!("  nonce:       {}", hex::encode(entry.nonce));
    }

    Ok(())
}

fn cmd_key(executable: &Path) -> Result<()> {
    let secret = read_embedded_secret(executable)
        .with_context(|| format!("reading secret from {}", executable.display()))?;

    println!("Length:      {} bytes", secret.len());
    println!("Fingerprint: {}", secret.fingerprint());

    Ok(())
}
