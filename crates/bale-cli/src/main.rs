//! bale-cli - Command-line interface for the bale archiving tool
//!
//! Thin orchestration of `bale-core`: argument parsing, logging setup, and
//! exit-code mapping live here, never archive logic.

use anyhow::Result;
use bale_core::{Archiver, CompressionCodec, Config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// bale - snapshot build artifacts into a single compressed archive
#[derive(Parser)]
#[command(name = "bale")]
#[command(author, version, about = "Streaming build-artifact archiver", long_about = None)]
struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Resolve patterns and materialize entries beneath this directory
    #[arg(short = 'C', long, global = true)]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack files matched by glob patterns into an archive
    Pack {
        /// Output archive file
        #[arg(short, long)]
        output: PathBuf,

        /// Glob patterns selecting the files and directories to pack
        #[arg(required = true)]
        patterns: Vec<String>,

        /// zstd compression level
        #[arg(long)]
        level: Option<i32>,

        /// Number of encoder worker threads
        #[arg(long)]
        workers: Option<u32>,

        /// Log a process memory snapshot per packed entry
        #[arg(long)]
        mem_stats: bool,
    },

    /// Unpack an archive onto the filesystem
    Unpack {
        /// Archive file to unpack
        archive: PathBuf,
    },

    /// List archive contents without extracting
    List {
        /// Archive file to list
        archive: PathBuf,

        /// Output entries as JSON
        #[arg(long)]
        json: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    match run() {
        Ok(()) => process::exit(0),
        Err(err) => {
            error!("Error: {:#}", err);
            process::exit(1);
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = Config::load()?;

    match cli.command {
        Commands::Pack {
            output,
            patterns,
            level,
            workers,
            mem_stats,
        } => {
            info!("Packing {} pattern(s) into {:?}", patterns.len(), output);

            let codec = CompressionCodec::new(
                level.unwrap_or(config.compression.level),
                workers.unwrap_or(config.compression.workers),
            );
            let mut archiver = Archiver::new()
                .with_codec(codec)
                .with_memory_sampling(mem_stats);
            if let Some(dir) = &cli.directory {
                archiver = archiver.with_working_dir(dir);
            }

            archiver.archive(&output, &patterns)?;
        }

        Commands::Unpack { archive } => {
            info!("Unpacking {:?}", archive);

            let mut archiver = Archiver::new();
            if let Some(dir) = &cli.directory {
                archiver = archiver.with_working_dir(dir);
            }

            archiver.restore(&archive)?;
        }

        Commands::List { archive, json } => {
            let entries = Archiver::new().list(&archive)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    let suffix = if entry.is_dir() { "/" } else { "" };
                    println!("{:>12}  {}{}", entry.size, entry.path.display(), suffix);
                }
            }
        }
    }

    Ok(())
}
