//! `SQLite`-backed [`InstalledArtifactStore`]: WAL mode, foreign keys, a
//! single connection guarded by a mutex. gotya keeps only one active
//! version per artifact name, so the schema needs no version-history
//! machinery.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use gotya_core::store::{
    InstallationReason, InstalledArtifact, InstalledArtifactStore, StoreError,
};
use gotya_schema::ArtifactDescriptor;
use rusqlite::{Connection, OptionalExtension, params};

/// One connection, serialized behind a mutex. gotya's orchestrator runs
/// installs/updates/uninstalls sequentially (§1 Non-goals: no parallel
/// installation), so contention here is never more than incidental.
pub struct SqliteArtifactStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteArtifactStore").finish_non_exhaustive()
    }
}

impl SqliteArtifactStore {
    /// Open (creating if necessary) the state database at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError::Backend`] if the connection can't be
    /// opened or the schema can't be initialized.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(e.into()))?;
        }
        let conn = Connection::open(path).map_err(|e| StoreError::Backend(e.into()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| StoreError::Backend(e.into()))?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    /// An in-memory store, for tests that want real SQL without a file.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError::Backend`] if the schema can't be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Backend(e.into()))?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS packages (
                    name            TEXT PRIMARY KEY,
                    version         TEXT NOT NULL,
                    os              TEXT NOT NULL,
                    arch            TEXT NOT NULL,
                    reason          TEXT NOT NULL,
                    dependencies    TEXT NOT NULL DEFAULT '',
                    local_path      TEXT NOT NULL,
                    installed_at    INTEGER NOT NULL
                );",
            )
            .map_err(|e| StoreError::Backend(e.into()))
    }

    fn row_to_artifact(
        name: String,
        version: String,
        os: String,
        arch: String,
        reason: String,
    ) -> InstalledArtifact {
        InstalledArtifact {
            name,
            version,
            os,
            arch,
            reason: if reason == "manual" {
                InstallationReason::Manual
            } else {
                InstallationReason::Automatic
            },
        }
    }
}

fn reason_str(reason: InstallationReason) -> &'static str {
    match reason {
        InstallationReason::Manual => "manual",
        InstallationReason::Automatic => "automatic",
    }
}

fn deps_of(descriptor: &ArtifactDescriptor) -> String {
    descriptor
        .dependencies
        .iter()
        .map(|d| d.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

impl InstalledArtifactStore for SqliteArtifactStore {
    fn install(
        &self,
        descriptor: &ArtifactDescriptor,
        local_path: &str,
        reason: InstallationReason,
    ) -> Result<(), StoreError> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO packages (name, version, os, arch, reason, dependencies, local_path, installed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(name) DO UPDATE SET
                    version = excluded.version,
                    os = excluded.os,
                    arch = excluded.arch,
                    reason = excluded.reason,
                    dependencies = excluded.dependencies,
                    local_path = excluded.local_path,
                    installed_at = excluded.installed_at",
                params![
                    descriptor.name,
                    descriptor.version,
                    descriptor.os,
                    descriptor.arch,
                    reason_str(reason),
                    deps_of(descriptor),
                    local_path,
                    Utc::now().timestamp(),
                ],
            )
            .map_err(|e| StoreError::Backend(e.into()))?;
        Ok(())
    }

    fn update(&self, descriptor: &ArtifactDescriptor, local_path: &str) -> Result<(), StoreError> {
        let reason = self.get(&descriptor.name)?.map_or(InstallationReason::Manual, |a| a.reason);
        self.install(descriptor, local_path, reason)
    }

    fn uninstall(&self, name: &str) -> Result<(), StoreError> {
        let changed = self
            .conn
            .lock()
            .unwrap()
            .execute("DELETE FROM packages WHERE name = ?1", params![name])
            .map_err(|e| StoreError::Backend(e.into()))?;
        if changed == 0 {
            return Err(StoreError::NotInstalled(name.to_string()));
        }
        Ok(())
    }

    fn mark_manual(&self, name: &str) -> Result<(), StoreError> {
        let changed = self
            .conn
            .lock()
            .unwrap()
            .execute(
                "UPDATE packages SET reason = 'manual' WHERE name = ?1",
                params![name],
            )
            .map_err(|e| StoreError::Backend(e.into()))?;
        if changed == 0 {
            return Err(StoreError::NotInstalled(name.to_string()));
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<InstalledArtifact>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT name, version, os, arch, reason FROM packages ORDER BY name")
            .map_err(|e| StoreError::Backend(e.into()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Self::row_to_artifact(
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })
            .map_err(|e| StoreError::Backend(e.into()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Backend(e.into()))
    }

    fn get(&self, name: &str) -> Result<Option<InstalledArtifact>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT name, version, os, arch, reason FROM packages WHERE name = ?1",
            params![name],
            |row| {
                Ok(Self::row_to_artifact(
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            },
        )
        .optional()
        .map_err(|e| StoreError::Backend(e.into()))
    }

    fn orphaned_automatic(&self) -> Result<Vec<InstalledArtifact>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT name, version, os, arch, reason, dependencies FROM packages")
            .map_err(|e| StoreError::Backend(e.into()))?;
        let rows: Vec<(InstalledArtifact, String)> = stmt
            .query_map([], |row| {
                Ok((
                    Self::row_to_artifact(
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ),
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(|e| StoreError::Backend(e.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Backend(e.into()))?;

        let mut depended_on: std::collections::HashSet<String> = std::collections::HashSet::new();
        for (_, deps) in &rows {
            depended_on.extend(deps.split(',').filter(|s| !s.is_empty()).map(str::to_string));
        }

        Ok(rows
            .into_iter()
            .filter(|(a, _)| {
                a.reason == InstallationReason::Automatic && !depended_on.contains(&a.name)
            })
            .map(|(a, _)| a)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gotya_schema::types::Dependency;

    fn descriptor(name: &str, deps: Vec<&str>) -> ArtifactDescriptor {
        ArtifactDescriptor {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            url: String::new(),
            checksum: "a".repeat(64),
            size: 1,
            os: "linux".to_string(),
            arch: "amd64".to_string(),
            dependencies: deps
                .into_iter()
                .map(|d| Dependency {
                    name: d.to_string(),
                    version_constraint: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn install_then_get_round_trips() {
        let store = SqliteArtifactStore::open_in_memory().unwrap();
        store
            .install(&descriptor("jq", vec![]), "/tmp/jq", InstallationReason::Manual)
            .unwrap();
        let got = store.get("jq").unwrap().unwrap();
        assert_eq!(got.version, "1.0.0");
        assert_eq!(got.reason, InstallationReason::Manual);
    }

    #[test]
    fn uninstall_missing_name_fails() {
        let store = SqliteArtifactStore::open_in_memory().unwrap();
        assert!(matches!(store.uninstall("missing"), Err(StoreError::NotInstalled(_))));
    }

    #[test]
    fn orphaned_automatic_excludes_depended_on() {
        let store = SqliteArtifactStore::open_in_memory().unwrap();
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
    fn mark_manual_flips_reason() {
        let store = SqliteArtifactStore::open_in_memory().unwrap();
        store
            .install(&descriptor("lib", vec![]), "/tmp/lib", InstallationReason::Automatic)
            .unwrap();
        store.mark_manual("lib").unwrap();
        assert_eq!(store.get("lib").unwrap().unwrap().reason, InstallationReason::Manual);
    }
}
