use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gallery")]
#[command(about = "Organize media files by capture time and content", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Copy media from SOURCE into DESTINATION/YYYY-MM/, deduplicating by content
    Rearrange {
        source: PathBuf,
        destination: PathBuf,
    },
    /// Record every file under SOURCE, with its fingerprint, in the catalog
    Catalog {
        source: PathBuf,
        /// Catalog database (defaults to `catalog_path` from configuration)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Look up a file's content in the catalog
    Lookup {
        file: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Display the number of catalogued files and the latest entry
    CatalogStats {
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print configuration values
    PrintConfig,
    /// Delete all catalog records
    TruncateCatalog {
        #[arg(long)]
        db: Option<PathBuf>,
    },
}
