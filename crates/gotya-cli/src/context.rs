//! Wires the `gotya-core` collaborators together: configuration, the
//! index store, the downloader, the SQLite artifact store, the shell
//! hook runner, and the terminal reporter, behind one `Orchestrator`.

use std::sync::Arc;

use anyhow::{Context, Result};
use gotya_core::config::Config;
use gotya_core::index_store::IndexStore;
use gotya_core::io::archive::ZipArchiveReader;
use gotya_core::io::download::{Downloader, FetchOptions};
use gotya_core::orchestrator::{Orchestrator, OrchestratorPaths};
use gotya_core::paths;

use crate::hooks::ShellHookRunner;
use crate::reporter::TerminalReporter;
use crate::store::sqlite::SqliteArtifactStore;

/// Everything a command needs: the loaded config and a ready-to-use
/// orchestrator for the host's platform.
pub struct AppContext {
    /// The loaded `gotya.toml`.
    pub config: Config,
    /// An orchestrator wired up against `config`.
    pub orchestrator: Orchestrator,
}

impl AppContext {
    /// Load configuration from the default location and build an
    /// orchestrator over it, creating `GOTYA_HOME`'s directory layout if
    /// it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config fails to parse, the SQLite store
    /// can't be opened, or the HTTP client can't be built.
    pub async fn load() -> Result<Self> {
        let config = Config::load_default()
            .await
            .context("loading gotya.toml")?;
        let orchestrator = build_orchestrator(&config)?;
        Ok(Self { config, orchestrator })
    }
}

/// Build an `Orchestrator` for the host's (os, arch), using `config`'s
/// repository table.
///
/// # Errors
///
/// Returns an error if any of the on-disk directories can't be created,
/// the SQLite store can't be opened, or the HTTP client can't be built.
pub fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    std::fs::create_dir_all(paths::index_cache_path()).context("creating index cache dir")?;
    std::fs::create_dir_all(paths::archive_cache_path()).context("creating archive cache dir")?;
    std::fs::create_dir_all(paths::store_path()).context("creating store dir")?;
    if let Some(parent) = paths::db_path().parent() {
        std::fs::create_dir_all(parent).context("creating gotya home")?;
    }

    let mut index_store = IndexStore::new(paths::index_cache_path(), config.repositories.clone());
    if !config.repositories.is_empty() {
        index_store.reload().context("loading cached repository indexes")?;
    }

    let fetch_opts = FetchOptions::new(paths::archive_cache_path());
    let downloader = Downloader::new(&fetch_opts).context("building HTTP client")?;

    let archive_reader = Box::new(ZipArchiveReader);
    let artifact_store = Arc::new(
        SqliteArtifactStore::open(&paths::db_path()).context("opening state database")?,
    );
    let hook_runner = Box::new(ShellHookRunner);
    let event_sink = Box::new(TerminalReporter);

    let paths = OrchestratorPaths {
        index_dir: paths::index_cache_path(),
        cache_dir: paths::archive_cache_path(),
        install_root: paths::store_path(),
    };

    let (os, arch) = host_platform();

    Ok(Orchestrator::new(
        index_store,
        downloader,
        archive_reader,
        artifact_store,
        hook_runner,
        event_sink,
        paths,
        os,
        arch,
    ))
}

/// The host's (os, arch), translated into the generic vocabulary
/// artifact descriptors use (`linux`/`darwin`/`windows`,
/// `amd64`/`arm64`/`386`).
#[must_use]
pub fn host_platform() -> (String, String) {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    };
    (os.to_string(), arch.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gotya_core::orchestrator::{InstallOptions, InstallRequest};
    use gotya_schema::{ArtifactDescriptor, Index, Repository};

    /// Each CLI invocation is a fresh process: `build_orchestrator` must
    /// reload whatever `<repo>.json` a prior `sync` cached to disk, not
    /// just the one `IndexStore` that happened to call `sync_all` itself.
    #[tokio::test]
    async fn build_orchestrator_reloads_cached_indexes_across_separate_constructions() {
        let home = tempfile::tempdir().unwrap();
        // SAFETY: test-local env mutation; this is the only test in this
        // crate's unit-test binary that reads or writes GOTYA_HOME.
        unsafe {
            std::env::set_var("GOTYA_HOME", home.path());
        }

        let mut server = mockito::Server::new_async().await;
        let index = Index {
            format_version: "1".to_string(),
            last_update: chrono::Utc::now(),
            artifacts: vec![ArtifactDescriptor {
                name: "jq".to_string(),
                version: "1.7.1".to_string(),
                description: String::new(),
                url: format!("{}/jq-1.7.1.gotya", server.url()),
                checksum: "a".repeat(64),
                size: 1,
                os: String::new(),
                arch: String::new(),
                dependencies: Vec::new(),
            }],
        };
        let mock = server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_body(index.to_json().unwrap())
            .create_async()
            .await;

        let config = Config {
            repositories: vec![Repository {
                name: "main".to_string(),
                url: server.url(),
                priority: 0,
                enabled: true,
            }],
            concurrency: None,
        };

        // First invocation: sync downloads and caches the index.
        let mut first = build_orchestrator(&config).unwrap();
        first.sync_all().await.unwrap();

        // A second, independent construction simulates the next CLI
        // process. Without an eager reload in `build_orchestrator`, its
        // `IndexStore` would start empty and `install` would fail with
        // `ArtifactNotFound` even though `main.json` is cached on disk.
        let mut second = build_orchestrator(&config).unwrap();
        let plan = second
            .install(
                &[InstallRequest { name: "jq".to_string(), version_constraint: String::new() }],
                &InstallOptions { dry_run: true },
            )
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].name, "jq");

        mock.assert_async().await;
        // SAFETY: matches the set_var above.
        unsafe {
            std::env::remove_var("GOTYA_HOME");
        }
    }
}
