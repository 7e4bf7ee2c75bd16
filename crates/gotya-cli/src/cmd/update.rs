//! `gotya update [names...]` — calls `Orchestrator::update`.

use anyhow::{Context, Result};
use gotya_core::orchestrator::UpdateOptions;

use crate::context::AppContext;

pub async fn update(names: &[String], dry_run: bool) -> Result<()> {
    let mut ctx = AppContext::load().await?;
    let options = UpdateOptions { names: names.to_vec(), dry_run };

    let plan = ctx.orchestrator.update(&options).await.context("update failed")?;

    if dry_run {
        for step in &plan {
            println!("{:?} {}", step.action, step.id());
        }
    }
    Ok(())
}
