//! `gotya index generate/verify` — thin wrappers around
//! `gotya_core::generator` and `gotya_schema::Index` parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gotya_core::generator::{self, GenerateOptions};
use gotya_core::io::archive::ZipArchiveReader;
use gotya_schema::Index;

pub fn generate(
    source_dir: &Path,
    output_path: &Path,
    base_url: &str,
    baseline: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let baseline_index = baseline
        .as_deref()
        .map(Index::load)
        .transpose()
        .context("loading baseline index")?;

    let opts = GenerateOptions {
        source_dir,
        output_path,
        base_url,
        baseline: baseline_index.as_ref(),
        force,
    };
    let index = generator::generate(&opts, &ZipArchiveReader).context("generating index")?;
    println!(
        "wrote {} artifact(s) to {}",
        index.artifacts.len(),
        output_path.display()
    );
    Ok(())
}

pub fn verify(path: &Path) -> Result<()> {
    let index = Index::load(path).context("parsing index")?;
    let round_tripped = Index::parse(&index.to_json()?).context("round-tripping index")?;
    if round_tripped.artifacts.len() != index.artifacts.len() {
        anyhow::bail!("round-trip mismatch: artifact count changed");
    }
    println!(
        "ok: {} (format {}, {} artifact(s))",
        path.display(),
        index.format_version,
        index.artifacts.len()
    );
    Ok(())
}
