//! `gotya search <query>` — fuzzy name search (§4.3) against every
//! enabled repository's cached index, merged across repositories.

use anyhow::{Context, Result};
use comfy_table::{Table, presets::UTF8_FULL};
use gotya_core::config::Config;
use gotya_core::paths;
use gotya_schema::Index;

pub async fn search(query: &str) -> Result<()> {
    let config = Config::load_default().await.context("loading gotya.toml")?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["repository", "name", "version", "description"]);

    for repo in config.repositories.iter().filter(|r| r.enabled) {
        let path = paths::index_cache_file(&repo.name);
        let Ok(index) = Index::load(&path) else { continue };
        for descriptor in index.search(query) {
            table.add_row(vec![
                repo.name.clone(),
                descriptor.name.clone(),
                descriptor.version.clone(),
                descriptor.description.clone(),
            ]);
        }
    }

    println!("{table}");
    Ok(())
}
