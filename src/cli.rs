use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "updater", about = "Merge out-of-order and duplicated document updates", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (toml, yaml or json)
    #[arg(short, long, global = true, env = "UPDATER_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file, overriding the configured one
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply JSON-lines updates and emit the merged records
    Ingest(IngestArgs),
    /// Print the merged record stored for a url
    Show(ShowArgs),
    /// Print the most recently fetched records
    Recent(RecentArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Read updates from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,
    /// Write merged records to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Compute and emit merges without persisting them
    #[arg(long)]
    pub dry_run: bool,
    /// Updates in flight at once, overriding the configured value
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: Option<u16>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub url: String,
}

#[derive(Debug, Args)]
pub struct RecentArgs {
    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,
}
