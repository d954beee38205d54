use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lnk", about = "lnk: expiring short links", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// List every link created by an owner
    List(ListArgs),
    /// Show the stored record for an origin
    Show(ShowArgs),
    /// Rewrite the journal as a single snapshot
    Compact(CompactArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Journal file (overrides the config file)
    #[arg(long)]
    pub db: Option<PathBuf>,
    /// Listen address (overrides the config file)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Short URL prefix (overrides the config file)
    #[arg(long)]
    pub domain: Option<String>,
    /// Directory of static pages, including 404.html (overrides the config file)
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, default_value = "lnk.db")]
    pub db: PathBuf,
    #[arg(long)]
    pub owner: String,
}

#[derive(Args)]
pub struct ShowArgs {
    #[arg(long, default_value = "lnk.db")]
    pub db: PathBuf,
    pub origin: String,
}

#[derive(Args)]
pub struct CompactArgs {
    #[arg(long, default_value = "lnk.db")]
    pub db: PathBuf,
}
