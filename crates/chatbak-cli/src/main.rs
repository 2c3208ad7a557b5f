//! chatbak: messenger backup decoder CLI
//!
//! Thin wrapper over `chatbak-codec`: it reads bytes and a hex key, hands
//! them to the codec, and writes the result. All decoding semantics live in
//! the library.
//!
//! Commands:
//!   decode <input>   - decrypt a backup into its SQLite database
//!   inspect <input>  - print header fields without decrypting

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatbak_codec::{decode_with, parse_header, DecodeOptions, RootKey, TrailerLayout};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "chatbak",
    version,
    about = "Decode encrypted messenger database backups",
    long_about = "chatbak: recover the SQLite database from a crypt14/crypt15-style \
                  backup container, given its 64-digit hex root key"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decrypt a backup file into its SQLite database
    Decode {
        /// Backup file (e.g. msgstore.db.crypt15)
        input: PathBuf,

        /// 64-character hex root key
        #[arg(long, short = 'k', env = "CHATBAK_KEY", conflicts_with = "key_file")]
        key: Option<String>,

        /// File containing the hex root key
        #[arg(long)]
        key_file: Option<PathBuf>,

        /// Output path (default: input with a .db extension)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Pin the trailer layout instead of trying both known layouts
        #[arg(long, value_enum)]
        trailer: Option<TrailerArg>,

        /// Print decode stats as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print header fields of a backup without decrypting it
    Inspect {
        /// Backup file
        input: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TrailerArg {
    /// 16-byte tag followed by a 16-byte checksum (single-file backups)
    Checksummed,
    /// 16-byte tag only (streamed backups)
    TagOnly,
}

impl From<TrailerArg> for TrailerLayout {
    fn from(arg: TrailerArg) -> Self {
        match arg {
            TrailerArg::Checksummed => TrailerLayout::Checksummed,
            TrailerArg::TagOnly => TrailerLayout::TagOnly,
        }
    }
}

// ── Entry point ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Decode { input, key, key_file, out, trailer, json } => {
            cmd_decode(&input, key.as_deref(), key_file.as_deref(), out, trailer, json)
        }
        Commands::Inspect { input } => cmd_inspect(&input),
    }
}

fn cmd_decode(
    input: &Path,
    key: Option<&str>,
    key_file: Option<&Path>,
    out: Option<PathBuf>,
    trailer: Option<TrailerArg>,
    json: bool,
) -> Result<()> {
    let key_hex = match (key, key_file) {
        (Some(k), _) => k.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("reading key file {}", path.display()))?
            .trim()
            .to_string(),
        (None, None) => bail!("provide the root key via --key, --key-file, or CHATBAK_KEY"),
    };
    let root = RootKey::from_hex(&key_hex).context("invalid root key")?;

    let raw = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let opts = DecodeOptions { trailer: trailer.map(Into::into) };
    let decoded = decode_with(&raw, &root, &opts)
        .with_context(|| format!("decoding {}", input.display()))?;

    let out_path = out.unwrap_or_else(|| input.with_extension("db"));
    fs::write(&out_path, &decoded.database)
        .with_context(|| format!("writing {}", out_path.display()))?;
    info!(out = %out_path.display(), bytes = decoded.database.len(), "database written");

    if json {
        println!("{}", serde_json::to_string_pretty(&decoded.stats)?);
    } else {
        println!(
            "decoded {} -> {} ({} bytes{}, {} trailer)",
            input.display(),
            out_path.display(),
            decoded.stats.plaintext_len,
            if decoded.stats.compressed { ", compressed" } else { "" },
            decoded.stats.trailer.as_str(),
        );
    }
    Ok(())
}

fn cmd_inspect(input: &Path) -> Result<()> {
    let raw = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let header = parse_header(&raw).context("parsing backup header")?;

    println!("file size   : {} bytes", raw.len());
    println!("header size : {} bytes", header.header_size);
    println!("feature flag: {}", if header.feature_flag { "present" } else { "absent" });
    println!("iv          : {}", hex::encode(header.iv));
    match header.salt {
        Some(salt) => println!("salt        : {}", hex::encode(salt)),
        None => println!("salt        : (none)"),
    }
    Ok(())
}
