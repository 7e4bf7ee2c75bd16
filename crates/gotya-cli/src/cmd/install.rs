//! `gotya install <name>[@constraint]...` — calls `Orchestrator::install`.

use anyhow::{Context, Result};
use gotya_core::orchestrator::{InstallOptions, InstallRequest};

use crate::context::AppContext;

/// Parse `name` or `name@constraint` into a request. `constraint` is
/// whatever `gotya-core`'s constraint evaluator accepts (e.g. `>=1.2.0`,
/// `~>1.2`); an absent `@` means "any version".
fn parse_request(spec: &str) -> InstallRequest {
    match spec.split_once('@') {
        Some((name, constraint)) => InstallRequest {
            name: name.to_string(),
            version_constraint: constraint.to_string(),
        },
        None => InstallRequest {
            name: spec.to_string(),
            version_constraint: String::new(),
        },
    }
}

pub async fn install(artifacts: &[String], dry_run: bool) -> Result<()> {
    let mut ctx = AppContext::load().await?;
    let requests: Vec<InstallRequest> = artifacts.iter().map(|s| parse_request(s)).collect();
    let options = InstallOptions { dry_run };

    let plan = ctx
        .orchestrator
        .install(&requests, &options)
        .await
        .context("install failed")?;

    if dry_run {
        for step in &plan {
            println!("{:?} {}", step.action, step.id());
        }
    }
    Ok(())
}
