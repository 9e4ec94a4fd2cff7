use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rowfs",
    about = "rowfs: table rows as directories, columns as files",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (JSON, or TOML by extension). Defaults to ./rowfs.json.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Exposed fields, comma separated. Overrides config and environment.
    #[arg(long, global = true, value_delimiter = ',')]
    pub fields: Vec<String>,

    #[arg(long, global = true)]
    pub dsn: Option<String>,

    /// JSON fixture to load into the in-memory table.
    #[arg(long, global = true)]
    pub seed: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub debug: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate configuration and show the inode layout
    Check,
    /// List a directory
    Ls(PathArgs),
    /// Print a field's JSON content
    Cat(PathArgs),
    /// Show an entry's attributes
    Stat(PathArgs),
    /// Replace a field's content
    Write(WriteArgs),
    /// Create a group
    Mkdir(MkdirArgs),
    /// Compute the inode of a group or field
    Inode(InodeArgs),
}

#[derive(Args)]
pub struct PathArgs {
    #[arg(default_value = "/")]
    pub path: String,
}

#[derive(Args)]
pub struct WriteArgs {
    pub path: String,
    pub data: String,
}

#[derive(Args)]
pub struct MkdirArgs {
    pub name: String,
}

#[derive(Args)]
pub struct InodeArgs {
    pub row: u64,
    pub field: Option<String>,
}
