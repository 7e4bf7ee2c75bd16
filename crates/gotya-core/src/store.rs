//! The "local artifact manager" collaborator interface (§3
//! `InstalledArtifact`, §9). The orchestrator depends only on the
//! [`InstalledArtifactStore`] trait; `gotya-cli` supplies a
//! SQLite-backed implementation.

use gotya_schema::ArtifactDescriptor;
use std::collections::HashMap;
use thiserror::Error;

/// Why an artifact is present on disk: requested directly by the user, or
/// pulled in transitively as someone else's dependency. Drives cleanup
/// eligibility (§4.8 Cleanup).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationReason {
    /// The user named this artifact in an install/update request.
    Manual,
    /// Installed only to satisfy another artifact's dependency.
    Automatic,
}

/// A single artifact currently present on disk.
#[derive(Debug, Clone)]
pub struct InstalledArtifact {
    /// Artifact name.
    pub name: String,
    /// Installed version.
    pub version: String,
    /// Installed platform.
    pub os: String,
    /// Installed architecture.
    pub arch: String,
    /// Why this artifact is installed.
    pub reason: InstallationReason,
}

/// Errors from the artifact manager.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No installed artifact has this name.
    #[error("artifact not installed: {0}")]
    NotInstalled(String),
    /// The concrete store's backing medium failed.
    #[error("artifact store backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

/// The local artifact manager: tracks which artifacts are installed, at
/// which version, and why. gotya does not keep multiple concurrently
/// active versions of one artifact, so installs/updates replace any prior
/// entry for the same name outright.
pub trait InstalledArtifactStore: Send + Sync {
    /// Record a fresh install.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the underlying store fails.
    fn install(
        &self,
        descriptor: &ArtifactDescriptor,
        local_path: &str,
        reason: InstallationReason,
    ) -> Result<(), StoreError>;

    /// Replace an existing installation with a new version, preserving
    /// its installation reason.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the underlying store fails.
    fn update(&self, descriptor: &ArtifactDescriptor, local_path: &str) -> Result<(), StoreError>;

    /// Remove an installed artifact by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotInstalled`] if the name isn't installed,
    /// or a backend error.
    fn uninstall(&self, name: &str) -> Result<(), StoreError>;

    /// Mark an already-installed artifact as manually requested (used
    /// when a user re-requests something that's already satisfied).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotInstalled`] if the name isn't installed.
    fn mark_manual(&self, name: &str) -> Result<(), StoreError>;

    /// All currently installed artifacts.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the underlying store fails.
    fn list(&self) -> Result<Vec<InstalledArtifact>, StoreError>;

    /// A single installed artifact by name, if present.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the underlying store fails.
    fn get(&self, name: &str) -> Result<Option<InstalledArtifact>, StoreError>;

    /// Automatically-installed artifacts with no current reverse
    /// dependent among the rest of the installed set (§4.8 Cleanup).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the underlying store fails.
    /// Default: treats every automatic artifact as orphaned, since this
    /// trait alone doesn't retain dependency edges between installed
    /// entries. Concrete stores that persist those edges (e.g.
    /// `SqliteArtifactStore`, `InMemoryArtifactStore`) override this with
    /// an exact reverse-dependency check.
    fn orphaned_automatic(&self) -> Result<Vec<InstalledArtifact>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|a| a.reason == InstallationReason::Automatic)
            .collect())
    }
}

/// An in-memory [`InstalledArtifactStore`] used by resolver/orchestrator
/// unit tests, and anywhere a full SQLite-backed store would be overkill.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    artifacts: std::sync::Mutex<HashMap<String, (InstalledArtifact, Vec<String>)>>,
}

impl InMemoryArtifactStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store directly, bypassing the `install` API -- useful for
    /// fixture setup in tests. `dependencies` records the artifact's
    /// declared dependency names so [`InMemoryArtifactStore::orphaned_automatic`]
    /// can compute reverse dependents exactly.
    pub fn seed(&self, artifact: InstalledArtifact, dependencies: Vec<String>) {
        self.artifacts
            .lock()
            .unwrap()
            .insert(artifact.name.clone(), (artifact, dependencies));
    }
}

impl InstalledArtifactStore for InMemoryArtifactStore {
    fn install(
        &self,
        descriptor: &ArtifactDescriptor,
        _local_path: &str,
        reason: InstallationReason,
    ) -> Result<(), StoreError> {
        self.seed(
            InstalledArtifact {
                name: descriptor.name.clone(),
                version: descriptor.version.clone(),
                os: descriptor.os.clone(),
                arch: descriptor.arch.clone(),
                reason,
            },
            descriptor.dependencies.iter().map(|d| d.name.clone()).collect(),
        );
        Ok(())
    }

    fn update(&self, descriptor: &ArtifactDescriptor, local_path: &str) -> Result<(), StoreError> {
        let reason = self
            .get(&descriptor.name)?
            .map_or(InstallationReason::Manual, |a| a.reason);
        self.install(descriptor, local_path, reason)
    }

    fn uninstall(&self, name: &str) -> Result<(), StoreError> {
        self.artifacts
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotInstalled(name.to_string()))
    }

    fn mark_manual(&self, name: &str) -> Result<(), StoreError> {
        let mut guard = self.artifacts.lock().unwrap();
        let entry = guard
            .get_mut(name)
            .ok_or_else(|| StoreError::NotInstalled(name.to_string()))?;
        entry.0.reason = InstallationReason::Manual;
        Ok(())
    }

    fn list(&self) -> Result<Vec<InstalledArtifact>, StoreError> {
        Ok(self
            .artifacts
            .lock()
            .unwrap()
            .values()
            .map(|(a, _)| a.clone())
            .collect())
    }

    fn get(&self, name: &str) -> Result<Option<InstalledArtifact>, StoreError> {
        Ok(self.artifacts.lock().unwrap().get(name).map(|(a, _)| a.clone()))
    }

    fn orphaned_automatic(&self) -> Result<Vec<InstalledArtifact>, StoreError> {
        let guard = self.artifacts.lock().unwrap();
        let mut depended_on: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for (_, deps) in guard.values() {
            depended_on.extend(deps.iter().map(String::as_str));
        }
        Ok(guard
            .values()
            .filter(|(a, _)| {
                a.reason == InstallationReason::Automatic && !depended_on.contains(a.name.as_str())
            })
            .map(|(a, _)| a.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, deps: Vec<&str>) -> ArtifactDescriptor {
        ArtifactDescriptor {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            url: String::new(),
            checksum: "a".repeat(64),
            size: 1,
            os: String::new(),
            arch: String::new(),
            dependencies: deps
                .into_iter()
                .map(|d| gotya_schema::types::Dependency {
                    name: d.to_string(),
                    version_constraint: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn orphaned_automatic_excludes_depended_on() {
        let store = InMemoryArtifactStore::new();
        store
            .install(&descriptor("app", vec!["lib"]), "/tmp/app", InstallationReason::Manual)
            .unwrap();
        store
            .install(&descriptor("lib", vec![]), "/tmp/lib", InstallationReason::Automatic)
            .unwrap();
        store
            .install(&descriptor("stale", vec![]), "/tmp/stale", InstallationReason::Automatic)
            .unwrap();

        let orphans = store.orphaned_automatic().unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].name, "stale");
    }

    #[test]
    fn uninstall_unknown_name_fails() {
        let store = InMemoryArtifactStore::new();
        assert!(matches!(
            store.uninstall("missing"),
            Err(StoreError::NotInstalled(_))
        ));
    }

    #[test]
    fn mark_manual_flips_reason() {
        let store = InMemoryArtifactStore::new();
        store
            .install(&descriptor("lib", vec![]), "/tmp/lib", InstallationReason::Automatic)
            .unwrap();
        store.mark_manual("lib").unwrap();
        assert_eq!(store.get("lib").unwrap().unwrap().reason, InstallationReason::Manual);
    }
}
