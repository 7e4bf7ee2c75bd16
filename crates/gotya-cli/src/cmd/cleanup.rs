//! `gotya cleanup` — calls `Orchestrator::cleanup`.

use anyhow::{Context, Result};

use crate::context::AppContext;

pub async fn cleanup() -> Result<()> {
    let mut ctx = AppContext::load().await?;
    ctx.orchestrator.cleanup().await.context("cleanup failed")?;
    Ok(())
}
