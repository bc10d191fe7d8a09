//! hvstore - Command-line access to the hexvault store
//!
//! Saves, restores and inspects files kept as base64 chunks.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};

use hexvault::config::{self, Config};
use hexvault::logging;
use hexvault::store::{ChunkedStore, FileStore, StoreError, CHUNK_SIZE};
use hexvault::ui::format_bytes;
use hexvault::view::{rows_to_render, total_rows, BYTES_PER_ROW};

/// Manage files saved in the hexvault store
#[derive(Parser, Debug)]
#[command(name = "hvstore")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Store file (overrides the config)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List saved files
    #[command(alias = "ls")]
    List,

    /// Save a file into the store ("-" reads stdin)
    Save {
        file: PathBuf,

        /// Name to save under (default: the file name)
        #[arg(short, long)]
        name: Option<String>,

        /// MIME type recorded in the metadata
        #[arg(short, long)]
        mime: Option<String>,
    },

    /// Restore a saved file
    Load {
        name: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output as hex dump instead of raw bytes
        #[arg(short = 'x', long)]
        hex: bool,
    },

    /// Delete a saved file
    #[command(alias = "rm")]
    Delete { name: String },

    /// Show metadata and check chunk integrity
    Info { name: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };
    logging::init_stderr(&config.log.level)?;

    let mut store = open_store(&config, args.store.as_deref())?;

    match args.command {
        Command::List => cmd_list(&store),
        Command::Save { file, name, mime } => {
            let mime = mime.unwrap_or_else(|| config.store.mime_type.clone());
            cmd_save(&mut store, &file, name, &mime)
        }
        Command::Load { name, output, hex } => cmd_load(&store, &name, output.as_deref(), hex),
        Command::Delete { name } => cmd_delete(&mut store, &name),
        Command::Info { name } => cmd_info(&store, &name),
    }
}

fn open_store(config: &Config, path: Option<&Path>) -> Result<ChunkedStore<FileStore>> {
    let path = path.map(PathBuf::from).unwrap_or_else(|| config.store_path());
    let kv = FileStore::open(&path, config.store.quota_bytes)
        .with_context(|| format!("cannot open store {}", path.display()))?;
    Ok(ChunkedStore::new(kv)
        .with_namespace(config.store.namespace.clone())
        .with_intent_marker(config.store.intent_marker))
}

/// Format epoch milliseconds in local time
fn format_time(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

/// Write a hex dump using the same row layout as the editor
fn write_hex_dump(out: &mut impl Write, data: &[u8]) -> io::Result<()> {
    let rows = total_rows(data.len(), BYTES_PER_ROW);
    for row in rows_to_render(0, rows, data, BYTES_PER_ROW) {
        write!(out, "{:08X}  ", row.start)?;
        for (i, slot) in row.slots().enumerate() {
            match slot {
                Some(byte) => write!(out, "{:02X} ", byte)?,
                None => write!(out, "   ")?,
            }
            if i == 7 {
                write!(out, " ")?;
            }
        }
        writeln!(out, " |{}|", row.ascii())?;
    }
    Ok(())
}

// === Commands ===

fn cmd_list(store: &ChunkedStore<FileStore>) -> Result<()> {
    let records = store.list()?;
    if records.is_empty() {
        println!("No saved files");
        return Ok(());
    }

    for record in records {
        println!(
            "{:<32} {:>12}  {}  {}",
            record.name,
            format_bytes(record.size),
            format_time(record.last_modified),
            record.mime_type
        );
    }
    Ok(())
}

fn cmd_save(
    store: &mut ChunkedStore<FileStore>,
    file: &Path,
    name: Option<String>,
    mime: &str,
) -> Result<()> {
    let is_stdin = file.as_os_str() == "-";
    let data = if is_stdin {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(file).with_context(|| format!("cannot read {}", file.display()))?
    };

    let name = match name {
        Some(name) => name,
        None if is_stdin => bail!("--name is required when saving stdin"),
        None => match file.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => bail!("cannot derive a name from {}", file.display()),
        },
    };

    let record = store.save(&name, &data, mime)?;
    println!(
        "Saved {} ({} bytes, {} chunks)",
        record.name,
        record.size,
        record.size.div_ceil(CHUNK_SIZE)
    );
    Ok(())
}

fn cmd_load(
    store: &ChunkedStore<FileStore>,
    name: &str,
    output: Option<&Path>,
    hex_output: bool,
) -> Result<()> {
    let loaded = store.load(name)?;
    if loaded.record.is_none() {
        eprintln!("warning: {} has no metadata", name);
    }

    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            if hex_output {
                write_hex_dump(&mut file, &loaded.data)?;
            } else {
                file.write_all(&loaded.data)?;
            }
        }
        None => {
            let mut stdout = io::stdout().lock();
            if hex_output {
                write_hex_dump(&mut stdout, &loaded.data)?;
            } else {
                stdout.write_all(&loaded.data)?;
            }
            stdout.flush()?;
        }
    }
    Ok(())
}

fn cmd_delete(store: &mut ChunkedStore<FileStore>, name: &str) -> Result<()> {
    if !store.contains(name)? {
        eprintln!("{} was not in the store", name);
    }
    store.delete(name)?;
    println!("File deleted: {}", name);
    Ok(())
}

fn cmd_info(store: &ChunkedStore<FileStore>, name: &str) -> Result<()> {
    let Some(count) = store.chunk_count(name)? else {
        bail!(StoreError::NotFound(name.to_string()));
    };

    println!("Name: {}", name);
    match store.record(name)? {
        Some(record) => {
            println!("Size: {} bytes ({})", record.size, format_bytes(record.size));
            println!("Modified: {}", format_time(record.last_modified));
            println!("MIME type: {}", record.mime_type);
        }
        None => println!("Metadata: missing"),
    }
    println!("Chunks: {}", count);

    match store.load(name) {
        Ok(_) => println!("Integrity: ok"),
        Err(e @ StoreError::Corrupted { .. }) => println!("Integrity: {}", e),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
