//! The repository manager: a lazily-loaded, multi-repository index cache
//! that answers "best artifact matching (name, constraint, os, arch)".

use std::collections::HashMap;
use std::path::PathBuf;

use gotya_schema::{ArtifactDescriptor, Index, Repository, Version};
use thiserror::Error;

use crate::{constraint, platform};

/// Errors from loading indexes or resolving artifacts against them.
#[derive(Error, Debug)]
pub enum IndexStoreError {
    /// No repository lists the requested name, or no descriptor from any
    /// repository satisfies the constraint and platform filters.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),
    /// No repositories are configured at all.
    #[error("no repositories configured")]
    NoRepositories,
    /// An index file failed to parse.
    #[error(transparent)]
    Index(#[from] gotya_schema::index::IndexError),
}

/// Holds every enabled repository's parsed index in memory. Loaded once
/// via [`IndexStore::reload`] and treated as immutable afterward; a new
/// `reload` call replaces the whole set atomically.
#[derive(Debug)]
pub struct IndexStore {
    index_dir: PathBuf,
    repositories: Vec<Repository>,
    indexes: HashMap<String, Index>,
}

impl IndexStore {
    /// Build a store over `repositories`, reading cached index files from
    /// `index_dir`. Call [`IndexStore::reload`] before the first lookup.
    #[must_use]
    pub fn new(index_dir: impl Into<PathBuf>, repositories: Vec<Repository>) -> Self {
        Self {
            index_dir: index_dir.into(),
            repositories,
            indexes: HashMap::new(),
        }
    }

    /// The configured repositories, in their configured order.
    #[must_use]
    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    /// Re-parse every enabled repository's `<index_dir>/<name>.json`. A
    /// repository with no cached file yet (not synced since this
    /// `IndexStore` was pointed at `index_dir`) is skipped rather than
    /// treated as a failure -- it simply contributes no artifacts until
    /// the next successful `sync_all`. Replaces the whole loaded set only
    /// if every *present* file parses; a malformed file aborts on the
    /// first such failure, leaving the previous set untouched.
    ///
    /// # Errors
    ///
    /// Returns [`IndexStoreError::NoRepositories`] if none are configured,
    /// or the first [`IndexStoreError::Index`] encountered for a file that
    /// exists but fails to parse.
    pub fn reload(&mut self) -> Result<(), IndexStoreError> {
        if self.repositories.is_empty() {
            return Err(IndexStoreError::NoRepositories);
        }
        let mut loaded = HashMap::new();
        for repo in self.repositories.iter().filter(|r| r.enabled) {
            let path = self.index_dir.join(repo.index_filename());
            match Index::load(&path) {
                Ok(index) => {
                    tracing::debug!("loaded {} artifact(s) from repository {}", index.artifacts.len(), repo.name);
                    loaded.insert(repo.name.clone(), index);
                }
                Err(gotya_schema::index::IndexError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!("no cached index yet for repository {} (not synced)", repo.name);
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.indexes = loaded;
        Ok(())
    }

    /// All descriptors named `name` across every enabled repository,
    /// grouped by repository name. Repositories with no match are
    /// omitted from the result.
    ///
    /// # Errors
    ///
    /// Returns [`IndexStoreError::ArtifactNotFound`] if no enabled
    /// repository lists the name at all.
    pub fn find_artifacts(
        &self,
        name: &str,
    ) -> Result<HashMap<String, Vec<ArtifactDescriptor>>, IndexStoreError> {
        let mut found = HashMap::new();
        for repo in self.repositories.iter().filter(|r| r.enabled) {
            let Some(index) = self.indexes.get(&repo.name) else {
                continue;
            };
            let matches: Vec<ArtifactDescriptor> = index
                .find_by_name(name)
                .into_iter()
                .cloned()
                .collect();
            if !matches.is_empty() {
                found.insert(repo.name.clone(), matches);
            }
        }
        if found.is_empty() {
            return Err(IndexStoreError::ArtifactNotFound(name.to_string()));
        }
        Ok(found)
    }

    /// Select the best descriptor for `name` satisfying `constraint_str`
    /// and platform (`os`, `arch`). Priority breaks ties between equal
    /// versions; it never overrules a strictly higher version offered by
    /// a lower-priority repository.
    ///
    /// # Errors
    ///
    /// Returns [`IndexStoreError::ArtifactNotFound`] if the name is
    /// unknown, or if every platform-compatible descriptor is rejected by
    /// the constraint (the error message lists the rejected versions).
    pub fn resolve_artifact(
        &self,
        name: &str,
        constraint_str: &str,
        os: &str,
        arch: &str,
    ) -> Result<ArtifactDescriptor, IndexStoreError> {
        let by_repo = self.find_artifacts(name)?;

        let priority_of = |repo_name: &str| -> u32 {
            self.repositories
                .iter()
                .find(|r| r.name == repo_name)
                .map_or(0, |r| r.priority)
        };

        let platform_matches: Vec<(u32, ArtifactDescriptor)> = by_repo
            .iter()
            .flat_map(|(repo_name, descriptors)| {
                let priority = priority_of(repo_name);
                descriptors
                    .iter()
                    .filter(|d| platform::matches_platform(&d.os, &d.arch, os, arch))
                    .map(move |d| (priority, d.clone()))
            })
            .collect();

        let survivors: Vec<&(u32, ArtifactDescriptor)> = platform_matches
            .iter()
            .filter(|(_, d)| constraint::satisfies(&d.version, constraint_str))
            .collect();

        if survivors.is_empty() {
            let available: Vec<String> =
                platform_matches.iter().map(|(_, d)| d.version.clone()).collect();
            tracing::warn!("no version of {name} satisfies `{constraint_str}`, rejected: [{}]", available.join(", "));
            return Err(IndexStoreError::ArtifactNotFound(format!(
                "no version of {name} satisfies `{constraint_str}` (platform-compatible versions: [{}])",
                available.join(", ")
            )));
        }

        // Highest version wins outright; priority only breaks ties among
        // survivors that share that exact version.
        let best_version = survivors
            .iter()
            .map(|(_, d)| Version::new(&d.version))
            .max()
            .expect("survivors is non-empty");

        let selected = survivors
            .into_iter()
            .filter(|(_, d)| Version::new(&d.version) == best_version)
            .max_by_key(|(priority, _)| *priority)
            .expect("at least one survivor matches the selected best version");

        Ok(selected.1.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::io::Write;

    fn descriptor(name: &str, version: &str, os: &str, arch: &str) -> ArtifactDescriptor {
        ArtifactDescriptor {
            name: name.to_string(),
            version: version.to_string(),
            description: String::new(),
            url: format!("artifacts/{name}-{version}.gotya"),
            checksum: "a".repeat(64),
            size: 1,
            os: os.to_string(),
            arch: arch.to_string(),
            dependencies: Vec::new(),
        }
    }

    fn write_index(dir: &std::path::Path, repo_name: &str, artifacts: Vec<ArtifactDescriptor>) {
        let index = Index {
            format_version: "1".to_string(),
            last_update: Utc::now(),
            artifacts,
        };
        let mut file = std::fs::File::create(dir.join(format!("{repo_name}.json"))).unwrap();
        file.write_all(index.to_json().unwrap().as_bytes()).unwrap();
    }

    #[test]
    fn resolve_artifact_prefers_version_over_priority() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "hi", vec![descriptor("a", "1.0.0", "", "")]);
        write_index(dir.path(), "lo", vec![descriptor("a", "2.0.0", "", "")]);

        let repos = vec![
            Repository {
                name: "hi".into(),
                url: "https://hi.example".into(),
                priority: 2,
                enabled: true,
            },
            Repository {
                name: "lo".into(),
                url: "https://lo.example".into(),
                priority: 1,
                enabled: true,
            },
        ];
        let mut store = IndexStore::new(dir.path(), repos);
        store.reload().unwrap();

        let selected = store.resolve_artifact("a", ">= 0.0.0", "linux", "amd64").unwrap();
        assert_eq!(selected.version, "2.0.0");
    }

    #[test]
    fn resolve_artifact_rejects_platform_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "main", vec![descriptor("a", "1.0.0", "linux", "amd64")]);
        let repos = vec![Repository {
            name: "main".into(),
            url: "https://example.com".into(),
            priority: 0,
            enabled: true,
        }];
        let mut store = IndexStore::new(dir.path(), repos);
        store.reload().unwrap();

        assert!(store.resolve_artifact("a", ">= 0.0.0", "darwin", "arm64").is_err());
        assert!(store.resolve_artifact("a", ">= 0.0.0", "linux", "amd64").is_ok());
    }

    #[test]
    fn find_artifacts_fails_when_name_unknown() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "main", vec![descriptor("a", "1.0.0", "", "")]);
        let repos = vec![Repository {
            name: "main".into(),
            url: "https://example.com".into(),
            priority: 0,
            enabled: true,
        }];
        let mut store = IndexStore::new(dir.path(), repos);
        store.reload().unwrap();

        assert!(matches!(
            store.find_artifacts("missing"),
            Err(IndexStoreError::ArtifactNotFound(_))
        ));
    }

    #[test]
    fn disabled_repositories_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "off", vec![descriptor("a", "9.9.9", "", "")]);
        let repos = vec![Repository {
            name: "off".into(),
            url: "https://example.com".into(),
            priority: 0,
            enabled: false,
        }];
        let mut store = IndexStore::new(dir.path(), repos);
        store.reload().unwrap();
        assert!(store.find_artifacts("a").is_err());
    }

    #[test]
    fn reload_tolerates_a_repository_with_no_cached_file_yet() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "synced", vec![descriptor("a", "1.0.0", "", "")]);
        let repos = vec![
            Repository {
                name: "synced".into(),
                url: "https://example.com/synced".into(),
                priority: 0,
                enabled: true,
            },
            Repository {
                name: "never-synced".into(),
                url: "https://example.com/never-synced".into(),
                priority: 0,
                enabled: true,
            },
        ];
        let mut store = IndexStore::new(dir.path(), repos);

        store.reload().unwrap();

        assert!(store.find_artifacts("a").is_ok());
    }
}
