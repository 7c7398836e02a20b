use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod dro;
use dro::{
    analyze as dro_analyze, convert as dro_convert, dump as dro_dump, info as dro_info,
    read_dro_as_vec, registers as dro_registers, test_roundtrip as dro_test_roundtrip,
};

/// drolog command line tools
#[derive(Parser)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show summary info for a DRO file (use '-' for stdin)
    Info {
        /// Input file to read (use '-' for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List decoded instructions
    Dump {
        /// Input file to read (use '-' for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// First instruction index to show
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Maximum number of instructions to show
        #[arg(long, default_value_t = 64)]
        count: usize,
    },
    /// Run the loop-point heuristics and print their reports
    Analyze {
        /// Input file to read (use '-' for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Replay the song and describe per-register state changes
    Registers {
        /// Input file to read (use '-' for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Maximum number of entries to show (0 = all)
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
    /// Convert a v2 file to the v1 container
    Convert {
        /// Input file to read (use '-' for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Output file to write
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
    /// Run parse -> serialize roundtrip test and compare binaries
    Roundtrip {
        /// Input file to read (use '-' for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Print detailed diagnostics on mismatch
        #[arg(long = "diag")]
        diag: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { file } => {
            let bytes = read_dro_as_vec(&file)?;
            dro_info(&file, bytes)?;
        }
        Commands::Dump { file, start, count } => {
            let bytes = read_dro_as_vec(&file)?;
            dro_dump(&file, bytes, start, count)?;
        }
        Commands::Analyze { file } => {
            let bytes = read_dro_as_vec(&file)?;
            dro_analyze(&file, bytes)?;
        }
        Commands::Registers { file, limit } => {
            let bytes = read_dro_as_vec(&file)?;
            dro_registers(&file, bytes, limit)?;
        }
        Commands::Convert { file, output } => {
            let bytes = read_dro_as_vec(&file)?;
            dro_convert(&file, bytes, &output)?;
        }
        Commands::Roundtrip { file, diag } => {
            let bytes = read_dro_as_vec(&file)?;
            dro_test_roundtrip(&file, bytes, diag)?;
        }
    }

    Ok(())
}
