//! `gotya repo add/remove/list` — mutate the `gotya.toml` repository table.

use anyhow::{Context, Result, bail};
use comfy_table::{Table, presets::UTF8_FULL};
use gotya_core::config::Config;
use gotya_core::paths;
use gotya_schema::Repository;

pub async fn add(name: &str, url: &str, priority: u32) -> Result<()> {
    let mut config = Config::load_default().await.context("loading gotya.toml")?;
    if config.find_repository(name).is_some() {
        bail!("repository `{name}` is already configured");
    }
    config.repositories.push(Repository {
        name: name.to_string(),
        url: url.to_string(),
        priority,
        enabled: true,
    });
    config.save(&paths::config_path()).await.context("saving gotya.toml")?;
    println!("added repository `{name}` ({url})");
    Ok(())
}

pub async fn remove(name: &str) -> Result<()> {
    let mut config = Config::load_default().await.context("loading gotya.toml")?;
    if !config.remove_repository(name) {
        bail!("no repository named `{name}` is configured");
    }
    config.save(&paths::config_path()).await.context("saving gotya.toml")?;
    println!("removed repository `{name}`");
    Ok(())
}

pub async fn list() -> Result<()> {
    let config = Config::load_default().await.context("loading gotya.toml")?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["name", "url", "priority", "enabled"]);
    for repo in &config.repositories {
        table.add_row(vec![
            repo.name.clone(),
            repo.url.clone(),
            repo.priority.to_string(),
            repo.enabled.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
