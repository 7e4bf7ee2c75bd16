//! gotya - a cross-platform artifact manager.
//!
//! This crate is the thin collaborator layer around `gotya-core`'s hard
//! core (resolver, index store, downloader, orchestrator): the `clap`
//! surface, configuration loading, the local artifact database, the
//! shell hook runner, and terminal progress reporting.
//!
//! # Directory layout
//!
//! ```text
//! ~/.gotya/
//! ├── store/            # unpacked installed artifacts, one dir per name
//! ├── cache/
//! │   ├── archives/      # downloaded .gotya archives, by checksum
//! │   └── indexes/       # cached repository index.json files
//! ├── logs/
//! ├── gotya.toml          # repository table + downloader concurrency
//! └── state.db            # installed-artifact SQLite database
//! ```

pub mod cli;
pub mod cmd;
pub mod context;
pub mod hooks;
pub mod reporter;
pub mod store;

pub use cli::{Cli, Commands};
pub use context::AppContext;
