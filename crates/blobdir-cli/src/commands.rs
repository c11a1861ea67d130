use anyhow::Context;
use blobdir_fs::LocalFileSystem;
use blobdir_server::{BlobdirServer, ServerConfig};
use colored::Colorize;
use tracing::debug;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Check(args) => cmd_check(args),
    }
}

/// Config file first, then command-line overrides.
fn resolve_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(dir) = &args.store_dir { config.store_dir = dir.clone(); }
    if let Some(dir) = &args.backup_dir { config.backup_dir = dir.clone(); }
    if let Some(addr) = args.bind { config.bind_addr = addr; }
    Ok(config)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;
    debug!(?config, "resolved configuration");
    println!(
        "blobdir on {} (files: {}, backups: {})",
        config.bind_addr.to_string().bold(),
        config.store_dir.display(),
        config.backup_dir.display()
    );
    BlobdirServer::new(config).start().await?;
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let config = ServerConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    println!("Configuration {}", args.config.display().to_string().bold());
    println!("  Bind: {}", config.bind_addr.to_string().cyan());
    println!("  Files: {}", config.store_dir.display());
    println!("  Backups: {}", config.backup_dir.display());
    println!("  Poll: {} ms, quiet period {} ms", config.poll_interval_ms, config.quiet_period_ms);

    match config.validate(&LocalFileSystem::new()) {
        Ok(()) => {
            println!("{} Configuration is valid", "✓".green().bold());
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red().bold(), e);
            anyhow::bail!("invalid configuration")
        }
    }
}
