use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "punch",
    about = "Inspect and initialize punchclock record stores",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Where the database lives: a directory, or a TOML config naming one.
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Database root directory
    #[arg(long, global = true, conflicts_with = "config")]
    pub dir: Option<PathBuf>,

    /// TOML database configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database and add first-run defaults if it is empty
    Init,
    /// Load every record file and report any that cannot be read
    Check,
    /// Show record counts per collection
    Stats,
    /// Print every record of one collection
    Dump(DumpArgs),
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Collection name, e.g. `employees`
    pub collection: String,
}
