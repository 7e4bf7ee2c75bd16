//! `gotya sync` — calls `Orchestrator::sync_all`.

use anyhow::{Context, Result};

use crate::context::AppContext;

pub async fn sync() -> Result<()> {
    let mut ctx = AppContext::load().await?;
    ctx.orchestrator.sync_all().await.context("sync failed")?;
    Ok(())
}
