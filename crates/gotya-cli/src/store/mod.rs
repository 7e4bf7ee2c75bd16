//! The local artifact manager: a `SQLite`-backed implementation of
//! `gotya_core::store::InstalledArtifactStore`.

pub mod sqlite;

pub use sqlite::SqliteArtifactStore;
