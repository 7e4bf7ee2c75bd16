//! `gotya uninstall <name>... [--no-cascade] [--force] [--purge]` — calls
//! `Orchestrator::uninstall`.

use anyhow::{Context, Result};
use gotya_core::orchestrator::{UninstallOptions, UninstallRequest};

use crate::context::AppContext;

#[allow(clippy::too_many_arguments)]
pub async fn uninstall(
    names: &[String],
    no_cascade: bool,
    force: bool,
    purge: bool,
    dry_run: bool,
) -> Result<()> {
    let mut ctx = AppContext::load().await?;
    let request = UninstallRequest { names: names.to_vec() };
    let options = UninstallOptions { no_cascade, force, purge, dry_run };

    ctx.orchestrator
        .uninstall(&request, &options)
        .await
        .context("uninstall failed")?;
    Ok(())
}
