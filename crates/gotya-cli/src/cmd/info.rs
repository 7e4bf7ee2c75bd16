//! `gotya info <name>` — installed state plus what every configured
//! repository currently offers.

use anyhow::{Context, Result};
use gotya_core::config::Config;
use gotya_core::paths;
use gotya_core::store::InstalledArtifactStore;
use gotya_schema::Index;

use crate::store::SqliteArtifactStore;

pub async fn info(name: &str) -> Result<()> {
    let store = SqliteArtifactStore::open(&paths::db_path()).context("opening state database")?;
    match store.get(name).context("looking up installed artifact")? {
        Some(installed) => println!(
            "installed: {} {} ({}/{}, {})",
            installed.name,
            installed.version,
            installed.os,
            installed.arch,
            match installed.reason {
                gotya_core::store::InstallationReason::Manual => "manual",
                gotya_core::store::InstallationReason::Automatic => "automatic",
            }
        ),
        None => println!("not installed"),
    }

    let config = Config::load_default().await.context("loading gotya.toml")?;
    let mut found = false;
    for repo in config.repositories.iter().filter(|r| r.enabled) {
        let path = paths::index_cache_file(&repo.name);
        let Ok(index) = Index::load(&path) else { continue };
        for descriptor in index.find_by_name(name) {
            found = true;
            println!(
                "{}: {} {} ({}/{}) - {}",
                repo.name,
                descriptor.name,
                descriptor.version,
                descriptor.os,
                descriptor.arch,
                descriptor.description,
            );
        }
    }
    if !found {
        println!("no repository lists `{name}` (run `gotya sync` first?)");
    }
    Ok(())
}
