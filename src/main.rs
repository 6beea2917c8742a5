use chrono::DateTime;
use clap::{Parser, Subcommand};
use pfskit::archive::{self, OpenOptions, PackOptions, PfsImage};
use pfskit::{firmware, DEFAULT_NAME_WIDTH};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pfs", version, about = "Pack, list and extract PFS firmware images")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack the files of a directory into a PFS image
    Pack {
        directory: PathBuf,
        output:    PathBuf,
        /// Include subdirectories (entry names become relative paths)
        #[arg(short = 'R', long)]
        recursive: bool,
        /// Name-field width in bytes
        #[arg(long, default_value_t = DEFAULT_NAME_WIDTH)]
        name_width: usize,
    },
    /// List the entries of a PFS image
    List {
        input: PathBuf,
        /// Skip width inference and use this name-field width
        #[arg(long)]
        name_width: Option<usize>,
        /// Print the parsed table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract the entries of a PFS image
    Extract {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(long)]
        name_width: Option<usize>,
        /// Extract only this entry
        #[arg(short, long)]
        entry: Option<String>,
        /// Write the selected entry here instead of under its own name
        #[arg(long = "as", requires = "entry")]
        rename: Option<PathBuf>,
    },
    /// Show header fields and the inferred layout
    Info {
        input: PathBuf,
        #[arg(long)]
        name_width: Option<usize>,
    },
    /// Concatenate files into one binary
    Merge {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Pad a partition image to a fixed size and append the boot trailer
    Pad {
        input:          PathBuf,
        partition_size: u64,
        output:         PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { directory, output, recursive, name_width } => {
            let opts = PackOptions { recursive, name_width };
            let entries = archive::pack_directory(&directory, &output, &opts)?;
            for (i, e) in entries.iter().enumerate() {
                println!("  packed  {:>4}/{}  {}", i + 1, entries.len(), e.name);
            }
            println!("Created: {}", output.display());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, name_width, json } => {
            let img = PfsImage::open(&input, &OpenOptions { name_width })?;
            let ar  = img.archive();
            if json {
                println!("{}", serde_json::to_string_pretty(ar)?);
                return Ok(());
            }
            println!("Archive: {} ({} entries)", input.display(), ar.len());
            println!("{:<40} {:>10} {:>10} {:>10}  Timestamp", "Name", "Offset", "Abs", "Size");
            for e in ar.entries.iter() {
                let (start, _) = ar.data_range(e);
                println!("{:<40} {:>#10x} {:>#10x} {:>10}  {}",
                    e.name, e.offset, start, e.size, format_timestamp(e.timestamp));
            }
            println!("Data segment starts at {:#x}", ar.data_segment_base);
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir, name_width, entry, rename } => {
            let img = PfsImage::open(&input, &OpenOptions { name_width })?;
            match entry {
                Some(name) => {
                    let target = match rename {
                        Some(target) => {
                            img.extract_entry(&name, &target)?;
                            target
                        }
                        None => img.extract_entry_into(&name, &output_dir)?,
                    };
                    println!("  extracted  {}", target.display());
                }
                None => {
                    for path in img.extract_all(&output_dir)? {
                        println!("  extracted  {}", path.display());
                    }
                    println!("Unpacked to: {}", output_dir.display());
                }
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, name_width } => {
            let img = PfsImage::open(&input, &OpenOptions { name_width })?;
            let ar  = img.archive();
            let data_len: u64 = ar.entries.iter().map(|e| e.size as u64).sum();

            println!("── PFS image ────────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Size           {} B", img.bytes().len());
            println!("  Signature      {} ({})", ar.header.signature_text(), hex::encode(ar.header.magic));
            println!("  Unknown field  {:#06x}", ar.header.unknown);
            println!("  Entries        {}", ar.header.entry_count);
            println!("  Name width     {} B{}", ar.name_width(),
                if name_width.is_some() { " (fixed)" } else { " (inferred)" });
            println!("  Record width   {} B", ar.record_width);
            println!("  Data segment   {:#x}", ar.data_segment_base);
            println!("  Data bytes     {} B", data_len);
        }

        // ── Merge ────────────────────────────────────────────────────────────
        Commands::Merge { inputs, output } => {
            let merged = firmware::merge(&inputs)?;
            std::fs::write(&output, &merged)?;
            println!("Merged {} files ({} B) into {}", inputs.len(), merged.len(), output.display());
        }

        // ── Pad ──────────────────────────────────────────────────────────────
        Commands::Pad { input, partition_size, output } => {
            let payload = std::fs::read(&input)?;
            let padded  = firmware::pad(&payload, partition_size)?;
            std::fs::write(&output, &padded)?;
            println!("Padded {} to {} B: {}", input.display(), padded.len(), output.display());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn format_timestamp(ts: u32) -> String {
    DateTime::from_timestamp(ts as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
