//! gotya - a cross-platform artifact manager.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gotya_cli::cli::{IndexCommands, RepoCommands};
use gotya_cli::cmd;
use gotya_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Repo { command } => match command {
            RepoCommands::Add { name, url, priority } => cmd::repo::add(&name, &url, priority).await,
            RepoCommands::Remove { name } => cmd::repo::remove(&name).await,
            RepoCommands::List => cmd::repo::list().await,
        },
        Commands::Sync => cmd::sync::sync().await,
        Commands::Install { artifacts, dry_run } => cmd::install::install(&artifacts, dry_run).await,
        Commands::Update { names, dry_run } => cmd::update::update(&names, dry_run).await,
        Commands::Uninstall { names, no_cascade, force, purge, dry_run } => {
            cmd::uninstall::uninstall(&names, no_cascade, force, purge, dry_run).await
        }
        Commands::Cleanup => cmd::cleanup::cleanup().await,
        Commands::List => cmd::list::list(),
        Commands::Info { name } => cmd::info::info(&name).await,
        Commands::Search { query } => cmd::search::search(&query).await,
        Commands::Index { command } => match command {
            IndexCommands::Generate { source_dir, output_path, base_url, baseline, force } => {
                cmd::index::generate(&source_dir, &output_path, &base_url, baseline, force)
            }
            IndexCommands::Verify { path } => cmd::index::verify(&path),
        },
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
