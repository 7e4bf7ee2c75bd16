//! `gotya list` — read-only query against the installed-artifact store.

use anyhow::{Context, Result};
use comfy_table::{Table, presets::UTF8_FULL};
use gotya_core::paths;
use gotya_core::store::{InstallationReason, InstalledArtifactStore};

use crate::store::SqliteArtifactStore;

pub fn list() -> Result<()> {
    let store = SqliteArtifactStore::open(&paths::db_path()).context("opening state database")?;
    let installed = store.list().context("listing installed artifacts")?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["name", "version", "platform", "reason"]);
    for artifact in &installed {
        let reason = match artifact.reason {
            InstallationReason::Manual => "manual",
            InstallationReason::Automatic => "automatic",
        };
        table.add_row(vec![
            artifact.name.clone(),
            artifact.version.clone(),
            format!("{}/{}", artifact.os, artifact.arch),
            reason.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
