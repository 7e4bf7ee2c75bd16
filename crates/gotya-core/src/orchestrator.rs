//! The orchestrator (§4.8): the single entry point that turns a user's
//! sync/install/update/uninstall/cleanup request into resolver calls,
//! downloads, archive extraction, hook invocations, and artifact-store
//! updates, narrating every step through one [`EventSink`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gotya_schema::{ArtifactDescriptor, HookEvent, Metadata};
use thiserror::Error;

use crate::hooks::{HookContext, HookError, RunHook};
use crate::index_store::{IndexStore, IndexStoreError};
use crate::io::archive::{ArchiveError, ArchiveReader};
use crate::io::download::{DownloadError, DownloadItem, Downloader, FetchOptions};
use crate::reporter::{Event, EventSink};
use crate::resolver::{self, Action, PlanStep, ResolveError, ResolveRequest};
use crate::store::{InstallationReason, InstalledArtifactStore, StoreError};

const METADATA_ENTRY: &str = "meta/artifact.json";

/// Errors from any orchestrator operation.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Resolving the request batch failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Reloading the index store failed.
    #[error(transparent)]
    IndexStore(#[from] IndexStoreError),
    /// A download failed.
    #[error(transparent)]
    Download(#[from] DownloadError),
    /// Archive extraction failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    /// The artifact store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A lifecycle hook failed.
    #[error(transparent)]
    Hook(#[from] HookError),
    /// A filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A plan step called for a download that didn't show up in the
    /// fetch results.
    #[error("no local file for {0}")]
    DownloadMissing(String),
    /// The metadata embedded in a downloaded archive failed to parse.
    #[error("invalid metadata in downloaded artifact: {0}")]
    InvalidMetadata(#[source] serde_json::Error),
    /// An uninstall target isn't installed.
    #[error("artifact not installed: {0}")]
    NotInstalled(String),
    /// An uninstall target is still depended on by other installed
    /// artifacts; pass `force` to remove it anyway.
    #[error("{name} is still depended on by: {}", .dependents.join(", "))]
    DependentsExist {
        /// The artifact that was asked to be removed.
        name: String,
        /// Other installed artifacts that declare a dependency on it.
        dependents: Vec<String>,
    },
}

/// Filesystem locations the orchestrator reads from and writes to.
#[derive(Debug, Clone)]
pub struct OrchestratorPaths {
    /// Directory `IndexStore` reads/writes cached repository indexes in.
    pub index_dir: PathBuf,
    /// Directory downloaded `.gotya` archives are cached in.
    pub cache_dir: PathBuf,
    /// Root directory each artifact is unpacked under, one subdirectory
    /// per name (`install_root.join(name)`).
    pub install_root: PathBuf,
}

/// A single user-requested artifact to install, independent of whatever
/// is already on disk.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Artifact name.
    pub name: String,
    /// Constraint string; empty means "any version".
    pub version_constraint: String,
}

/// Options for [`Orchestrator::install`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Resolve and report the plan without downloading or installing.
    pub dry_run: bool,
}

/// Options for [`Orchestrator::update`].
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Names to update; empty means every installed artifact.
    pub names: Vec<String>,
    /// Resolve and report the plan without downloading or installing.
    pub dry_run: bool,
}

/// A batch uninstall request.
#[derive(Debug, Clone)]
pub struct UninstallRequest {
    /// Names to remove.
    pub names: Vec<String>,
}

/// Options for [`Orchestrator::uninstall`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UninstallOptions {
    /// Don't sweep dependencies left orphaned by this removal.
    pub no_cascade: bool,
    /// Remove even if other installed artifacts still depend on this one.
    pub force: bool,
    /// Also remove the cached archive for this artifact.
    pub purge: bool,
    /// Report what would be removed without removing anything.
    pub dry_run: bool,
}

/// Drives resolver + downloader + archive reader + artifact store + hook
/// runner through one coherent sync/install/update/uninstall/cleanup
/// operation, narrating progress through `event_sink`.
pub struct Orchestrator {
    index_store: IndexStore,
    downloader: Downloader,
    archive_reader: Box<dyn ArchiveReader>,
    artifact_store: Arc<dyn InstalledArtifactStore>,
    hook_runner: Box<dyn RunHook>,
    event_sink: Box<dyn EventSink>,
    paths: OrchestratorPaths,
    os: String,
    arch: String,
}

impl Orchestrator {
    /// Build an orchestrator for the host's `os`/`arch`.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        index_store: IndexStore,
        downloader: Downloader,
        archive_reader: Box<dyn ArchiveReader>,
        artifact_store: Arc<dyn InstalledArtifactStore>,
        hook_runner: Box<dyn RunHook>,
        event_sink: Box<dyn EventSink>,
        paths: OrchestratorPaths,
        os: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            index_store,
            downloader,
            archive_reader,
            artifact_store,
            hook_runner,
            event_sink,
            paths,
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Download every enabled repository's index and reload the store.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Download`] if any index fetch fails,
    /// or propagates an [`IndexStoreError`] reload failure.
    pub async fn sync_all(&mut self) -> Result<(), OrchestratorError> {
        tracing::debug!("syncing {} repositories", self.index_store.repositories().len());
        self.event_sink.emit(Event::Planning {
            message: "fetching repository indexes".to_string(),
        });

        let items: Vec<DownloadItem> = self
            .index_store
            .repositories()
            .iter()
            .filter(|r| r.enabled)
            .map(|r| DownloadItem {
                id: r.name.clone(),
                url: format!("{}/index.json", r.url.trim_end_matches('/')),
                expected_checksum: None,
                filename: Some(r.index_filename()),
            })
            .collect();

        for item in &items {
            self.event_sink.emit(Event::Downloading {
                step: None,
                message: format!("{} index from {}", item.id, item.url),
            });
        }

        let opts = FetchOptions::new(&self.paths.index_dir);
        self.downloader.fetch_all(&items, &opts).await?;

        self.index_store.reload()?;
        tracing::info!("sync complete");

        self.event_sink.emit(Event::Done {
            message: "sync complete".to_string(),
        });
        Ok(())
    }

    /// The URL a plan step should actually be fetched from: `url`
    /// unchanged if already absolute, else joined with the base URL of
    /// whichever repository published `name`@`version`.
    fn absolute_url(&self, name: &str, version: &str, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        let Ok(by_repo) = self.index_store.find_artifacts(name) else {
            return url.to_string();
        };
        for (repo_name, descriptors) in &by_repo {
            if descriptors.iter().any(|d| d.version == version) {
                if let Some(repo) = self
                    .index_store
                    .repositories()
                    .iter()
                    .find(|r| &r.name == repo_name)
                {
                    return format!("{}/{}", repo.url.trim_end_matches('/'), url.trim_start_matches('/'));
                }
            }
        }
        url.to_string()
    }

    /// Synthesize keep-version requests for everything installed that
    /// `explicit` doesn't already name, so an unrelated install/update
    /// doesn't perturb artifacts nobody asked to touch.
    fn augment_with_installed(
        &self,
        explicit: &[ResolveRequest],
    ) -> Result<Vec<ResolveRequest>, OrchestratorError> {
        let explicit_names: std::collections::HashSet<&str> =
            explicit.iter().map(|r| r.name.as_str()).collect();
        let mut augmented = explicit.to_vec();
        for installed in self.artifact_store.list()? {
            if explicit_names.contains(installed.name.as_str()) {
                continue;
            }
            augmented.push(ResolveRequest {
                name: installed.name,
                version_constraint: String::new(),
                os: self.os.clone(),
                arch: self.arch.clone(),
                old_version: Some(installed.version),
                keep_version: true,
            });
        }
        Ok(augmented)
    }

    /// Fetch and unpack every non-skip step of `plan`, updating the
    /// artifact store and running lifecycle hooks as it goes.
    async fn execute_plan(
        &self,
        plan: &[PlanStep],
        manual_names: &std::collections::HashSet<String>,
    ) -> Result<(), OrchestratorError> {
        let to_fetch: Vec<DownloadItem> = plan
            .iter()
            .filter(|s| s.action != Action::Skip)
            .map(|s| DownloadItem {
                id: s.id(),
                url: self.absolute_url(&s.name, &s.version, &s.source_url),
                expected_checksum: Some(s.checksum.clone()),
                filename: None,
            })
            .collect();

        let fetch_opts = FetchOptions::new(&self.paths.cache_dir);
        let local_paths = if to_fetch.is_empty() {
            std::collections::HashMap::new()
        } else {
            for step in plan.iter().filter(|s| s.action != Action::Skip) {
                self.event_sink.emit(Event::Downloading {
                    step: Some(step.id()),
                    message: step.source_url.clone(),
                });
            }
            self.downloader.fetch_all(&to_fetch, &fetch_opts).await?
        };

        for step in plan {
            match step.action {
                Action::Skip => {
                    self.event_sink.emit(Event::Skipping {
                        step: Some(step.id()),
                        message: step.reason.clone(),
                    });
                }
                Action::Install | Action::Update => {
                    let archive_path = local_paths
                        .get(&step.id())
                        .ok_or_else(|| OrchestratorError::DownloadMissing(step.id()))?;
                    self.install_step(step, Path::new(archive_path)).await?;
                }
            }
        }

        for name in manual_names {
            self.artifact_store.mark_manual(name)?;
        }

        Ok(())
    }

    async fn install_step(&self, step: &PlanStep, archive_path: &Path) -> Result<(), OrchestratorError> {
        let install_dir = self.paths.install_root.join(&step.name);
        let descriptor = ArtifactDescriptor {
            name: step.name.clone(),
            version: step.version.clone(),
            description: String::new(),
            url: step.source_url.clone(),
            checksum: step.checksum.clone(),
            size: 0,
            os: step.os.clone(),
            arch: step.arch.clone(),
            dependencies: Vec::new(),
        };

        let metadata = self.extract_metadata(archive_path)?;

        if step.action == Action::Update && install_dir.exists() {
            std::fs::remove_dir_all(&install_dir)?;
        }

        self.run_hook(HookEvent::PreInstall, &metadata, &step.name, &step.version, &install_dir)?;

        self.event_sink.emit(match step.action {
            Action::Install => Event::Installing {
                step: Some(step.id()),
                message: format!("unpacking to {}", install_dir.display()),
            },
            _ => Event::Updating {
                step: Some(step.id()),
                message: format!("unpacking to {}", install_dir.display()),
            },
        });
        self.archive_reader.extract_all(archive_path, &install_dir)?;

        self.run_hook(HookEvent::PostInstall, &metadata, &step.name, &step.version, &install_dir)?;

        let local_path = install_dir.to_string_lossy().into_owned();
        match step.action {
            Action::Install => {
                self.artifact_store
                    .install(&descriptor, &local_path, InstallationReason::Automatic)?;
            }
            Action::Update => {
                self.artifact_store.update(&descriptor, &local_path)?;
            }
            Action::Skip => unreachable!("skip steps never reach install_step"),
        }
        Ok(())
    }

    fn extract_metadata(&self, archive_path: &Path) -> Result<Option<Metadata>, OrchestratorError> {
        let tmp = tempfile::Builder::new().suffix(".json").tempfile()?;
        match self
            .archive_reader
            .extract_single_file(archive_path, METADATA_ENTRY, tmp.path())
        {
            Ok(()) => {
                let text = std::fs::read_to_string(tmp.path())?;
                let metadata: Metadata =
                    serde_json::from_str(&text).map_err(OrchestratorError::InvalidMetadata)?;
                Ok(Some(metadata))
            }
            Err(ArchiveError::MissingEntry(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn run_hook(
        &self,
        event: HookEvent,
        metadata: &Option<Metadata>,
        name: &str,
        version: &str,
        install_dir: &Path,
    ) -> Result<(), OrchestratorError> {
        let Some(metadata) = metadata else { return Ok(()) };
        let ctx = HookContext { name, version, install_dir };
        for hook in metadata.hooks.iter().filter(|h| h.event == event) {
            self.hook_runner.run(event, &hook.script, &ctx)?;
        }
        Ok(())
    }

    /// Resolve and (unless `options.dry_run`) execute an install batch.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorError`].
    pub async fn install(
        &mut self,
        requests: &[InstallRequest],
        options: &InstallOptions,
    ) -> Result<Vec<PlanStep>, OrchestratorError> {
        self.event_sink.emit(Event::Planning {
            message: format!("resolving {} artifact(s)", requests.len()),
        });

        let explicit: Vec<ResolveRequest> = requests
            .iter()
            .map(|r| {
                let old_version = self.artifact_store.get(&r.name).ok().flatten().map(|a| a.version);
                ResolveRequest {
                    name: r.name.clone(),
                    version_constraint: r.version_constraint.clone(),
                    os: self.os.clone(),
                    arch: self.arch.clone(),
                    old_version,
                    keep_version: false,
                }
            })
            .collect();

        let augmented = self.augment_with_installed(&explicit)?;
        let plan = resolver::resolve(&augmented, &self.index_store)?;
        tracing::debug!("install plan has {} step(s)", plan.len());

        if options.dry_run {
            self.event_sink.emit(Event::Done {
                message: format!("dry run: {} step(s) planned", plan.len()),
            });
            return Ok(plan);
        }

        let manual_names: std::collections::HashSet<String> =
            requests.iter().map(|r| r.name.clone()).collect();
        self.execute_plan(&plan, &manual_names).await?;
        tracing::info!("install complete");

        self.event_sink.emit(Event::Done {
            message: "install complete".to_string(),
        });
        Ok(plan)
    }

    /// Resolve and (unless `options.dry_run`) execute an update batch.
    /// An empty `options.names` updates every installed artifact.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorError`].
    pub async fn update(&mut self, options: &UpdateOptions) -> Result<Vec<PlanStep>, OrchestratorError> {
        tracing::debug!("updating {} target(s)", options.names.len());
        let installed = self.artifact_store.list()?;
        let targets: Vec<_> = if options.names.is_empty() {
            installed.clone()
        } else {
            installed
                .iter()
                .filter(|a| options.names.contains(&a.name))
                .cloned()
                .collect()
        };

        self.event_sink.emit(Event::Planning {
            message: format!("resolving updates for {} artifact(s)", targets.len()),
        });

        let explicit: Vec<ResolveRequest> = targets
            .iter()
            .map(|a| ResolveRequest {
                name: a.name.clone(),
                version_constraint: format!(">= {}", a.version),
                os: self.os.clone(),
                arch: self.arch.clone(),
                old_version: Some(a.version.clone()),
                keep_version: false,
            })
            .collect();

        let augmented = self.augment_with_installed(&explicit)?;
        let plan = resolver::resolve(&augmented, &self.index_store)?;

        if options.dry_run {
            self.event_sink.emit(Event::Done {
                message: format!("dry run: {} step(s) planned", plan.len()),
            });
            return Ok(plan);
        }

        let manual_names: std::collections::HashSet<String> =
            targets.iter().map(|a| a.name.clone()).collect();
        self.execute_plan(&plan, &manual_names).await?;

        self.event_sink.emit(Event::Done {
            message: "update complete".to_string(),
        });
        Ok(plan)
    }

    /// Installed artifacts (restricted to `candidates` if given) that
    /// declare a dependency on `name`, reconstructed from whichever
    /// enabled repository still lists each installed (name, version).
    fn dependents_of(&self, name: &str, candidates: &[crate::store::InstalledArtifact]) -> Vec<String> {
        candidates
            .iter()
            .filter(|a| a.name != name)
            .filter(|a| {
                self.index_store
                    .resolve_artifact(&a.name, &format!("= {}", a.version), &a.os, &a.arch)
                    .is_ok_and(|d| d.dependencies.iter().any(|dep| dep.name == name))
            })
            .map(|a| a.name.clone())
            .collect()
    }

    fn removal_order(&self, names: &[String], installed: &[crate::store::InstalledArtifact]) -> Vec<String> {
        let set: std::collections::HashSet<&str> = names.iter().map(String::as_str).collect();
        let mut emitted = std::collections::HashSet::new();
        let mut order = Vec::with_capacity(names.len());
        for name in names {
            visit_dependency_first(name, &set, installed, self, &mut emitted, &mut order);
        }
        order.reverse();
        order
    }

    async fn remove_one(&self, name: &str, purge: bool) -> Result<(), OrchestratorError> {
        tracing::debug!("removing {name} (purge={purge})");
        let installed = self
            .artifact_store
            .get(name)?
            .ok_or_else(|| OrchestratorError::NotInstalled(name.to_string()))?;
        let install_dir = self.paths.install_root.join(name);

        let metadata = if install_dir.exists() {
            self.manifest_for_installed(&install_dir)
        } else {
            None
        };
        self.run_hook(HookEvent::PreRemove, &metadata, name, &installed.version, &install_dir)?;

        self.event_sink.emit(Event::Uninstalling {
            step: Some(format!("{name}@{}", installed.version)),
            message: format!("removing {}", install_dir.display()),
        });
        if install_dir.exists() {
            std::fs::remove_dir_all(&install_dir)?;
        }

        self.run_hook(HookEvent::PostRemove, &metadata, name, &installed.version, &install_dir)?;
        self.artifact_store.uninstall(name)?;

        if purge {
            let cached = self.paths.cache_dir.join(format!("{name}-{}.gotya", installed.version));
            std::fs::remove_file(cached).ok();
        }
        Ok(())
    }

    /// Installed artifacts don't retain their archive's embedded metadata
    /// once unpacked, so removal hooks only fire when a sidecar
    /// `meta/artifact.json` happens to have been unpacked alongside the
    /// artifact's own payload.
    fn manifest_for_installed(&self, install_dir: &Path) -> Option<Metadata> {
        let path = install_dir.join(METADATA_ENTRY);
        let text = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Remove `request.names`, cascading into now-orphaned automatic
    /// dependencies unless `options.no_cascade`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotInstalled`] if a name isn't
    /// installed, or [`OrchestratorError::DependentsExist`] if another
    /// installed artifact still depends on it and `options.force` isn't
    /// set.
    pub async fn uninstall(
        &mut self,
        request: &UninstallRequest,
        options: &UninstallOptions,
    ) -> Result<(), OrchestratorError> {
        let installed = self.artifact_store.list()?;
        for name in &request.names {
            if !installed.iter().any(|a| &a.name == name) {
                return Err(OrchestratorError::NotInstalled(name.clone()));
            }
            if !options.force {
                let dependents = self.dependents_of(name, &installed);
                if !dependents.is_empty() {
                    return Err(OrchestratorError::DependentsExist {
                        name: name.clone(),
                        dependents,
                    });
                }
            }
        }

        let order = self.removal_order(&request.names, &installed);

        if options.dry_run {
            self.event_sink.emit(Event::Planning {
                message: format!("would remove: {}", order.join(", ")),
            });
            self.event_sink.emit(Event::Done {
                message: "dry run".to_string(),
            });
            return Ok(());
        }

        for name in &order {
            self.remove_one(name, options.purge).await?;
        }

        if !options.no_cascade {
            loop {
                let orphans = self.artifact_store.orphaned_automatic()?;
                if orphans.is_empty() {
                    break;
                }
                for orphan in &orphans {
                    if let Err(e) = self.remove_one(&orphan.name, options.purge).await {
                        self.event_sink.emit(Event::Error {
                            step: Some(orphan.name.clone()),
                            message: e.to_string(),
                        });
                        break;
                    }
                }
                if self.artifact_store.orphaned_automatic()?.len() == orphans.len() {
                    break;
                }
            }
        }

        self.event_sink.emit(Event::Done {
            message: "uninstall complete".to_string(),
        });
        Ok(())
    }

    /// Remove every automatically-installed artifact nothing else
    /// depends on, repeating until a pass removes nothing. Per-item
    /// failures are reported and skipped rather than aborting the sweep.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if listing orphans itself fails.
    pub async fn cleanup(&mut self) -> Result<(), OrchestratorError> {
        tracing::debug!("sweeping orphaned automatic artifacts");
        self.event_sink.emit(Event::Planning {
            message: "sweeping orphaned automatic artifacts".to_string(),
        });
        loop {
            let orphans = self.artifact_store.orphaned_automatic()?;
            if orphans.is_empty() {
                break;
            }
            let mut removed_any = false;
            for orphan in &orphans {
                self.event_sink.emit(Event::Cleanup {
                    message: format!("removing {}", orphan.name),
                });
                match self.remove_one(&orphan.name, true).await {
                    Ok(()) => removed_any = true,
                    Err(e) => self.event_sink.emit(Event::Error {
                        step: Some(orphan.name.clone()),
                        message: e.to_string(),
                    }),
                }
            }
            if !removed_any {
                break;
            }
        }
        self.event_sink.emit(Event::Done {
            message: "cleanup complete".to_string(),
        });
        Ok(())
    }
}

fn visit_dependency_first(
    name: &str,
    set: &std::collections::HashSet<&str>,
    installed: &[crate::store::InstalledArtifact],
    orchestrator: &Orchestrator,
    emitted: &mut std::collections::HashSet<String>,
    order: &mut Vec<String>,
) {
    if emitted.contains(name) || !set.contains(name) {
        return;
    }
    emitted.insert(name.to_string());
    let Some(artifact) = installed.iter().find(|a| a.name == name) else {
        order.push(name.to_string());
        return;
    };
    if let Ok(descriptor) =
        orchestrator
            .index_store
            .resolve_artifact(name, &format!("= {}", artifact.version), &artifact.os, &artifact.arch)
    {
        for dep in &descriptor.dependencies {
            visit_dependency_first(&dep.name, set, installed, orchestrator, emitted, order);
        }
    }
    order.push(name.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::archive::ZipArchiveReader;
    use crate::reporter::NullEventSink;
    use crate::store::InMemoryArtifactStore;
    use chrono::Utc;
    use gotya_schema::{Dependency, Index, Repository};
    use std::io::Write;

    fn descriptor(name: &str, version: &str, url: &str, deps: Vec<(&str, &str)>) -> ArtifactDescriptor {
        ArtifactDescriptor {
            name: name.to_string(),
            version: version.to_string(),
            description: String::new(),
            url: url.to_string(),
            checksum: "a".repeat(64),
            size: 1,
            os: String::new(),
            arch: String::new(),
            dependencies: deps
                .into_iter()
                .map(|(n, c)| Dependency {
                    name: n.to_string(),
                    version_constraint: c.to_string(),
                })
                .collect(),
        }
    }

    fn orchestrator_with(
        index_dir: &Path,
        cache_dir: &Path,
        install_root: &Path,
        artifacts: Vec<ArtifactDescriptor>,
    ) -> Orchestrator {
        let index = Index {
            format_version: "1".to_string(),
            last_update: Utc::now(),
            artifacts,
        };
        std::fs::write(index_dir.join("main.json"), index.to_json().unwrap()).unwrap();
        let mut index_store = IndexStore::new(
            index_dir.to_path_buf(),
            vec![Repository {
                name: "main".into(),
                url: "https://example.com/repo".into(),
                priority: 0,
                enabled: true,
            }],
        );
        index_store.reload().unwrap();

        let downloader = Downloader::new(&FetchOptions::new(cache_dir)).unwrap();
        Orchestrator::new(
            index_store,
            downloader,
            Box::new(ZipArchiveReader),
            Arc::new(InMemoryArtifactStore::new()),
            Box::new(crate::hooks::NullHookRunner),
            Box::new(NullEventSink),
            OrchestratorPaths {
                index_dir: index_dir.to_path_buf(),
                cache_dir: cache_dir.to_path_buf(),
                install_root: install_root.to_path_buf(),
            },
            "linux",
            "amd64",
        )
    }

    #[tokio::test]
    async fn install_fetches_extracts_and_records() {
        let index_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let install_root = tempfile::tempdir().unwrap();

        let mut server = mockito::Server::new_async().await;
        let archive_bytes = {
            let mut buf = Vec::new();
            {
                let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
                let options: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default();
                writer.start_file("meta/artifact.json", options).unwrap();
                writer
                    .write_all(br#"{"name":"jq","version":"1.7.1"}"#)
                    .unwrap();
                writer.start_file("bin/jq", options).unwrap();
                writer.write_all(b"binary").unwrap();
                writer.finish().unwrap();
            }
            buf
        };
        let mock = server
            .mock("GET", "/jq-1.7.1.gotya")
            .with_status(200)
            .with_body(&archive_bytes)
            .create_async()
            .await;

        let checksum = gotya_schema::Sha256Hash::of_bytes(&archive_bytes).to_string();
        let mut orchestrator = orchestrator_with(
            index_dir.path(),
            cache_dir.path(),
            install_root.path(),
            vec![{
                let mut d = descriptor("jq", "1.7.1", &format!("{}/jq-1.7.1.gotya", server.url()), vec![]);
                d.checksum = checksum;
                d
            }],
        );

        let plan = orchestrator
            .install(
                &[InstallRequest { name: "jq".to_string(), version_constraint: String::new() }],
                &InstallOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].action, Action::Install);
        assert!(install_root.path().join("jq/bin/jq").exists());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn dry_run_install_does_not_touch_disk() {
        let index_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let install_root = tempfile::tempdir().unwrap();
        let mut orchestrator = orchestrator_with(
            index_dir.path(),
            cache_dir.path(),
            install_root.path(),
            vec![descriptor("jq", "1.7.1", "https://example.com/jq.gotya", vec![])],
        );

        let plan = orchestrator
            .install(
                &[InstallRequest { name: "jq".to_string(), version_constraint: String::new() }],
                &InstallOptions { dry_run: true },
            )
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert!(!install_root.path().join("jq").exists());
    }

    #[tokio::test]
    async fn uninstall_rejects_depended_on_artifact_without_force() {
        let index_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let install_root = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(
            index_dir.path(),
            cache_dir.path(),
            install_root.path(),
            vec![
                descriptor("app", "1.0.0", "https://example.com/app.gotya", vec![("lib", ">=1.0.0")]),
                descriptor("lib", "1.0.0", "https://example.com/lib.gotya", vec![]),
            ],
        );
        orchestrator
            .artifact_store
            .install(
                &descriptor("app", "1.0.0", "", vec![]),
                "/tmp/app",
                InstallationReason::Manual,
            )
            .unwrap();
        orchestrator
            .artifact_store
            .install(
                &descriptor("lib", "1.0.0", "", vec![]),
                "/tmp/lib",
                InstallationReason::Automatic,
            )
            .unwrap();

        let err = orchestrator
            .uninstall(
                &UninstallRequest { names: vec!["lib".to_string()] },
                &UninstallOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::DependentsExist { .. }));
    }

    #[tokio::test]
    async fn cleanup_removes_orphaned_automatic_artifacts() {
        let index_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let install_root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(install_root.path().join("stale")).unwrap();
        let mut orchestrator = orchestrator_with(
            index_dir.path(),
            cache_dir.path(),
            install_root.path(),
            vec![descriptor("stale", "1.0.0", "https://example.com/stale.gotya", vec![])],
        );
        orchestrator
            .artifact_store
            .install(
                &descriptor("stale", "1.0.0", "", vec![]),
                install_root.path().join("stale").to_str().unwrap(),
                InstallationReason::Automatic,
            )
            .unwrap();

        orchestrator.cleanup().await.unwrap();
        assert!(orchestrator.artifact_store.get("stale").unwrap().is_none());
        assert!(!install_root.path().join("stale").exists());
    }
}
