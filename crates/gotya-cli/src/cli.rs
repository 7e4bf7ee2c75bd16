//! The `clap` surface: thin wrappers that translate flags into the
//! request/option structs `gotya-core`'s orchestrator already specifies.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "gotya")]
#[command(author, version, about = "gotya - a cross-platform artifact manager")]
pub struct Cli {
    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage configured repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },
    /// Refresh every enabled repository's index
    Sync,
    /// Install one or more artifacts
    Install {
        /// Artifact name(s), optionally constrained: name or name@>=1.2.0
        #[arg(required = true)]
        artifacts: Vec<String>,
        /// Resolve and print the plan without downloading or installing
        #[arg(long)]
        dry_run: bool,
    },
    /// Update installed artifacts to the best version currently available
    Update {
        /// Names to update; omit to update everything installed
        names: Vec<String>,
        /// Resolve and print the plan without downloading or installing
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove one or more installed artifacts
    Uninstall {
        /// Artifact name(s)
        #[arg(required = true)]
        names: Vec<String>,
        /// Don't sweep dependencies left orphaned by this removal
        #[arg(long)]
        no_cascade: bool,
        /// Remove even if other installed artifacts still depend on it
        #[arg(long)]
        force: bool,
        /// Also remove the cached archive
        #[arg(long)]
        purge: bool,
        /// Print what would be removed without removing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove orphaned automatically-installed artifacts
    Cleanup,
    /// List installed artifacts
    List,
    /// Show details about an artifact
    Info {
        /// Artifact name
        name: String,
    },
    /// Search configured repositories by name
    Search {
        /// Search query
        query: String,
    },
    /// Index-authoring commands
    Index {
        #[command(subcommand)]
        command: IndexCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum RepoCommands {
    /// Add a repository
    Add {
        /// Repository name
        name: String,
        /// Base URL serving `index.json` and artifact archives
        url: String,
        /// Selection priority; higher wins ties at equal version
        #[arg(long, default_value_t = 0)]
        priority: u32,
    },
    /// Remove a configured repository
    Remove {
        /// Repository name
        name: String,
    },
    /// List configured repositories
    List,
}

#[derive(Debug, Subcommand)]
pub enum IndexCommands {
    /// Walk a directory of `.gotya` archives and write (or merge) an index
    Generate {
        /// Directory to walk for `.gotya` files
        source_dir: std::path::PathBuf,
        /// Path the index is written to
        output_path: std::path::PathBuf,
        /// Prefix joined with each artifact's filename to form its URL
        #[arg(long, default_value = "")]
        base_url: String,
        /// Existing index to merge against, conflict-detecting
        #[arg(long)]
        baseline: Option<std::path::PathBuf>,
        /// Overwrite the output path even if it already exists
        #[arg(long)]
        force: bool,
    },
    /// Parse and round-trip an index file to check it's well-formed
    Verify {
        /// Index file to check
        path: std::path::PathBuf,
    },
}
