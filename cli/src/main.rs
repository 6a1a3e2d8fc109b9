use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sift_core::{DateWindow, SourceOptions, SourceType};
use sift_ntfs::structures::{
    attribute_type_name, split_reference, INDX_RECORD_MAGIC, MFT_RECORD_MAGIC,
};
use sift_ntfs::timestamps::format_filetime;
use sift_ntfs::{IndexRecord, MftIndexEntry, MftRecord, NtfsSource, PathResolver};

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "NTFS MFT and directory-index forensic parser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Input file: a raw $MFT or a full volume image
    file: PathBuf,

    /// Input shape (mft or image)
    #[arg(long, default_value = "mft")]
    filetype: String,

    /// Bytes per cluster in image mode
    #[arg(long, default_value_t = 4096)]
    cluster_size: u32,

    /// Byte offset of the NTFS partition inside the image
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Prefix prepended to reconstructed paths
    #[arg(long)]
    prefix: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List records with reconstructed paths and timestamps
    List {
        #[command(flatten)]
        source: SourceArgs,
        /// Emit one JSON object per record
        #[arg(long)]
        json: bool,
        /// Report progress to stderr while scanning
        #[arg(long)]
        progress: bool,
    },
    /// Dump one record in detail
    Record {
        #[command(flatten)]
        source: SourceArgs,
        /// MFT record number
        number: u64,
    },
    /// Find the record matching a reconstructed path
    Find {
        #[command(flatten)]
        source: SourceArgs,
        /// Backslash-delimited path, e.g. \.\Windows\notepad.exe
        path: String,
    },
    /// List live and slack entries of an isolated INDX record
    Indx {
        /// INDX record file
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::List {
            source,
            json,
            progress,
        } => list(source, json, progress),
        Commands::Record { source, number } => dump_record(source, number),
        Commands::Find { source, path } => find(source, path),
        Commands::Indx { file } => dump_indx(file),
    }
}

fn source_options(args: &SourceArgs) -> anyhow::Result<SourceOptions> {
    let filetype = match args.filetype.as_str() {
        "mft" => SourceType::Mft,
        "image" => SourceType::Image,
        "indx" => SourceType::Indx,
        other => anyhow::bail!("Unknown filetype: {}", other),
    };

    let mut options = SourceOptions::new(filetype);
    options.cluster_size = args.cluster_size;
    options.volume_offset = args.offset;
    options.path_prefix = args.prefix.clone();
    Ok(options)
}

fn open_source(args: &SourceArgs) -> anyhow::Result<NtfsSource<fs::File>> {
    let options = source_options(args)?;
    NtfsSource::open(&args.file, options)
        .with_context(|| format!("opening {}", args.file.display()))
}

fn list(args: SourceArgs, json: bool, progress: bool) -> anyhow::Result<()> {
    let mut source = open_source(&args)?;
    let mut resolver = PathResolver::new(args.prefix.clone());

    let mut inode = 0u64;
    loop {
        let buf = source.record_buf(inode)?;
        if buf.is_empty() {
            break;
        }

        let current = inode;
        inode += 1;
        if progress && current % 10_000 == 0 {
            eprint!("\rRecord {}", current);
        }

        let record = match MftRecord::parse(buf, current) {
            Ok(record) => record,
            Err(e) => {
                log::debug!("Skipping record {}: {}", current, e);
                continue;
            }
        };
        if record.magic() != MFT_RECORD_MAGIC {
            continue;
        }

        let path = resolver
            .build_path(&mut source, &record)
            .unwrap_or_else(|_| "\\??".to_string());
        let (created, modified) = match record.standard_information() {
            Ok(Some(info)) => (
                format_filetime(info.created_time),
                format_filetime(info.modified_time),
            ),
            _ => ("-".to_string(), "-".to_string()),
        };

        if json {
            println!(
                "{}",
                serde_json::json!({
                    "inode": record.inode(),
                    "record_number": record.record_number(),
                    "active": record.is_active(),
                    "directory": record.is_directory(),
                    "path": path,
                    "created": created,
                    "modified": modified,
                })
            );
        } else {
            let status = if record.is_active() { "active" } else { "deleted" };
            let kind = if record.is_directory() { "dir" } else { "file" };
            println!(
                "{:>10} {:7} {:4} {:>23} {:>23} {}",
                record.inode(),
                status,
                kind,
                created,
                modified,
                path
            );
        }
    }
    if progress {
        eprintln!();
    }
    Ok(())
}

fn dump_record(args: SourceArgs, number: u64) -> anyhow::Result<()> {
    let mut source = open_source(&args)?;
    let record = source.record(number)?;

    println!("Record {}", number);
    println!("  Magic:           {:#010x}", record.magic());
    println!("  LSN:             {}", record.lsn());
    println!("  Sequence:        {}", record.sequence_number());
    println!("  Link count:      {}", record.link_count());
    println!("  Flags:           {:#06x}", record.flags());
    println!("  Bytes in use:    {}", record.bytes_in_use());
    println!("  Bytes allocated: {}", record.bytes_allocated());
    println!("  Active:          {}", record.is_active());
    println!("  Directory:       {}", record.is_directory());

    if let Some(fn_attr) = record.filename_information() {
        let (parent, sequence) = split_reference(fn_attr.parent_reference);
        println!(
            "  Filename:        {}",
            fn_attr
                .filename()
                .unwrap_or_else(|_| "<invalid UTF-16>".to_string())
        );
        println!("  Parent:          record {} sequence {}", parent, sequence);
    }

    if let Ok(Some(info)) = record.standard_information() {
        println!("  Created:         {}", format_filetime(info.created_time));
        println!("  Modified:        {}", format_filetime(info.modified_time));
        println!("  Changed:         {}", format_filetime(info.changed_time));
        println!("  Accessed:        {}", format_filetime(info.accessed_time));
    }

    println!("  Attributes:");
    for attr in record.attributes() {
        println!(
            "    {:#06x} {} ({})",
            attr.attr_type,
            attribute_type_name(attr.attr_type),
            if attr.non_resident {
                "non-resident"
            } else {
                "resident"
            }
        );
        if attr.non_resident {
            if let Ok(size) = attr.data_size() {
                println!("      Data size: {}", size);
            }
            if let Ok(runlist) = attr.runlist() {
                for run in runlist.runs() {
                    println!(
                        "      Run: {} clusters at cluster {}",
                        run.length, run.cluster_offset
                    );
                }
            }
        } else if let Ok(length) = attr.value_length() {
            println!("      Value length: {}", length);
        }
    }

    Ok(())
}

fn find(args: SourceArgs, path: String) -> anyhow::Result<()> {
    let mut source = open_source(&args)?;
    let mut resolver = PathResolver::new(args.prefix.clone());

    match source.record_by_path(&mut resolver, &path)? {
        Some(record) => {
            println!(
                "Found record {} (inode {}) for {}",
                record.record_number(),
                record.inode(),
                path
            );
        }
        None => {
            eprintln!("No active record matches {}", path);
        }
    }
    Ok(())
}

fn dump_indx(file: PathBuf) -> anyhow::Result<()> {
    let data = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
    let record = IndexRecord::parse(data).context("parsing INDX record")?;

    if record.magic() != INDX_RECORD_MAGIC {
        log::warn!("Record magic is {:#x}, not INDX", record.magic());
    }
    println!("INDX record, VCN {}", record.vcn());

    let node = record.node_header()?;
    println!("Live entries:");
    for entry in node.entries() {
        if entry.is_end() {
            continue;
        }
        print_index_entry(&entry, false);
    }

    println!("Slack entries:");
    for entry in node.slack_entries(DateWindow::default()) {
        print_index_entry(&entry, true);
    }

    Ok(())
}

fn print_index_entry(entry: &MftIndexEntry, slack: bool) {
    let origin = if slack { "slack" } else { "live" };
    let (number, _) = split_reference(entry.mft_reference);
    match entry.filename_information() {
        Ok(fn_attr) => println!(
            "  {:5} {:>10} {:>23} {}",
            origin,
            number,
            format_filetime(fn_attr.modified_time),
            fn_attr
                .filename()
                .unwrap_or_else(|_| "<invalid UTF-16>".to_string())
        ),
        Err(_) => println!("  {:5} {:>10} <no filename>", origin, number),
    }
}
