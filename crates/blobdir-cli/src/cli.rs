use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blobdir",
    about = "blobdir: transactional file store over HTTP",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the file server
    Serve(ServeArgs),
    /// Validate a configuration without starting the server
    Check(CheckArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Directory holding the stored files (overrides the config file)
    #[arg(long)]
    pub store_dir: Option<PathBuf>,
    /// Directory receiving backups (overrides the config file)
    #[arg(long)]
    pub backup_dir: Option<PathBuf>,
    /// Address to listen on (overrides the config file)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct CheckArgs {
    #[arg(short, long)]
    pub config: PathBuf,
}
