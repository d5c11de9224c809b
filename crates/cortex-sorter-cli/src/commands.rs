use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "cortex-sorter")]
#[command(about = "Watches a folder and files new arrivals by rule", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to `rules.*` in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sort existing files, then watch the source folder until Ctrl-C
    Watch,
    /// Sort the files currently in the source folder and exit
    Sweep,
    /// Show the fingerprint record matching a file's content
    Lookup {
        /// File to hash
        file: PathBuf,
    },
    /// List fingerprint records by file name
    Find {
        /// Exact file name, e.g. `invoice.pdf`
        name: String,
    },
    /// Display the number of fingerprints in the store
    Count,
    /// Remove one fingerprint so its content can be sorted again
    Forget {
        /// SHA-256 hex digest
        hash: String,
    },
    /// Print configuration values
    PrintConfig,
}
