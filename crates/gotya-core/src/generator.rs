//! The index generator (§4.5): walk a directory of `.gotya` artifact
//! archives, extract each one's embedded metadata, compute its checksum,
//! and emit (or conflict-detecting merge into a baseline) an index file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gotya_schema::{ArtifactDescriptor, Dependency, Index, Metadata};
use thiserror::Error;
use walkdir::WalkDir;

use crate::io::archive::{ArchiveError, ArchiveReader};

/// The required file extension for an artifact archive.
pub const ARTIFACT_EXTENSION: &str = ".gotya";
/// The metadata file every artifact archive must contain.
const METADATA_ENTRY: &str = "meta/artifact.json";

/// Errors generating an index.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// `source_dir` doesn't exist or isn't a directory.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// The output index already exists and `force` was not set.
    #[error("index already exists at {0}")]
    AlreadyExists(PathBuf),
    /// Two descriptors with the same (name, version) disagree on any
    /// field.
    #[error("index conflict for {name}@{version}: {detail}")]
    Conflict {
        /// Conflicting artifact name.
        name: String,
        /// Conflicting artifact version.
        version: String,
        /// What differed between the baseline and freshly generated entry.
        detail: String,
    },
    /// Filesystem error walking the source directory or writing the index.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Archive extraction failed for a candidate artifact file.
    #[error("archive error reading {path}: {source}")]
    Archive {
        /// The artifact file that failed to open.
        path: PathBuf,
        /// The underlying archive error.
        #[source]
        source: ArchiveError,
    },
    /// `meta/artifact.json` did not parse.
    #[error("invalid metadata in {path}: {source}")]
    InvalidMetadata {
        /// The artifact file whose metadata failed to parse.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// Failed to (re)write the merged index.
    #[error(transparent)]
    Index(#[from] gotya_schema::index::IndexError),
}

/// Inputs to one generator run.
pub struct GenerateOptions<'a> {
    /// Directory to walk recursively for `.gotya` files.
    pub source_dir: &'a Path,
    /// Path the merged index is written to.
    pub output_path: &'a Path,
    /// Prefix joined with each artifact's basename to form its URL.
    pub base_url: &'a str,
    /// An existing index to merge against (conflict-detecting).
    pub baseline: Option<&'a Index>,
    /// Overwrite `output_path` even if it already exists.
    pub force: bool,
}

/// Walk `opts.source_dir`, build an [`ArtifactDescriptor`] for every
/// `.gotya` file found, merge with `opts.baseline` if given, and write
/// the result to `opts.output_path`.
///
/// # Errors
///
/// Returns [`GeneratorError::InvalidPath`] if the source isn't a
/// directory, [`GeneratorError::AlreadyExists`] if the output exists and
/// `force` is false, [`GeneratorError::Conflict`] if the baseline and a
/// freshly built descriptor disagree for the same (name, version), or an
/// archive/IO/parse error encountered along the way.
pub fn generate(
    opts: &GenerateOptions<'_>,
    archive_reader: &dyn ArchiveReader,
) -> Result<Index, GeneratorError> {
    if !opts.source_dir.is_dir() {
        return Err(GeneratorError::InvalidPath(format!(
            "{} is not a directory",
            opts.source_dir.display()
        )));
    }
    if opts.output_path.exists() && !opts.force {
        return Err(GeneratorError::AlreadyExists(opts.output_path.to_path_buf()));
    }

    let mut merged: HashMap<(String, String), ArtifactDescriptor> = HashMap::new();
    if let Some(baseline) = opts.baseline {
        for d in &baseline.artifacts {
            merged.insert((d.name.clone(), d.version.clone()), d.clone());
        }
    }

    for entry in WalkDir::new(opts.source_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.to_lowercase().ends_with(ARTIFACT_EXTENSION) {
            continue;
        }

        let descriptor = build_descriptor(path, opts.base_url, archive_reader)?;
        let key = (descriptor.name.clone(), descriptor.version.clone());
        match merged.get(&key) {
            None => {
                merged.insert(key, descriptor);
            }
            Some(existing) => {
                if let Some(detail) = diff(existing, &descriptor) {
                    return Err(GeneratorError::Conflict {
                        name: descriptor.name,
                        version: descriptor.version,
                        detail,
                    });
                }
            }
        }
    }

    let mut artifacts: Vec<ArtifactDescriptor> = merged.into_values().collect();
    artifacts.sort_by(|a, b| (a.name.as_str(), a.version.as_str()).cmp(&(b.name.as_str(), b.version.as_str())));
    tracing::info!("generated index with {} artifact(s) from {}", artifacts.len(), opts.source_dir.display());

    let index = Index {
        format_version: gotya_schema::index::FORMAT_VERSION.to_string(),
        last_update: chrono::Utc::now(),
        artifacts,
    };
    index.write(opts.output_path)?;
    Ok(index)
}

fn build_descriptor(
    archive_path: &Path,
    base_url: &str,
    archive_reader: &dyn ArchiveReader,
) -> Result<ArtifactDescriptor, GeneratorError> {
    let tmp_dir = tempfile::tempdir()?;
    let meta_out = tmp_dir.path().join("artifact.json");
    archive_reader
        .extract_single_file(archive_path, METADATA_ENTRY, &meta_out)
        .map_err(|source| GeneratorError::Archive {
            path: archive_path.to_path_buf(),
            source,
        })?;

    let meta_text = std::fs::read_to_string(&meta_out)?;
    let metadata: Metadata =
        serde_json::from_str(&meta_text).map_err(|source| GeneratorError::InvalidMetadata {
            path: archive_path.to_path_buf(),
            source,
        })?;

    let size = std::fs::metadata(archive_path)?.len();
    let bytes = std::fs::read(archive_path)?;
    let checksum = gotya_schema::Sha256Hash::of_bytes(&bytes).to_string();

    let filename = archive_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let url = artifact_url(base_url, filename);

    Ok(ArtifactDescriptor {
        name: metadata.name,
        version: metadata.version,
        description: metadata.description,
        url,
        checksum,
        size,
        os: metadata.os,
        arch: metadata.arch,
        dependencies: metadata
            .dependencies
            .into_iter()
            .map(|name| Dependency {
                name,
                version_constraint: String::new(),
            })
            .collect(),
    })
}

/// Join `base_url` and `filename` with exactly one separating `/`,
/// always using forward slashes.
#[must_use]
pub fn artifact_url(base_url: &str, filename: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), filename)
}

/// `None` if every field of `a` and `b` match; otherwise a human-readable
/// description of the first field that differs.
fn diff(a: &ArtifactDescriptor, b: &ArtifactDescriptor) -> Option<String> {
    if a.description != b.description {
        return Some("description differs".to_string());
    }
    if a.url != b.url {
        return Some(format!("url differs: {} vs {}", a.url, b.url));
    }
    if a.checksum != b.checksum {
        return Some("checksum differs".to_string());
    }
    if a.size != b.size {
        return Some(format!("size differs: {} vs {}", a.size, b.size));
    }
    if a.os != b.os {
        return Some("os differs".to_string());
    }
    if a.arch != b.arch {
        return Some("arch differs".to_string());
    }
    if a.dependencies.len() != b.dependencies.len()
        || a.dependencies
            .iter()
            .zip(b.dependencies.iter())
            .any(|(x, y)| x.name != y.name || x.version_constraint != y.version_constraint)
    {
        return Some("dependencies differ".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::archive::ZipArchiveReader;
    use std::io::Write;

    fn write_fixture_archive(path: &Path, meta_json: &str) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default();
        writer.start_file("meta/artifact.json", options).unwrap();
        writer.write_all(meta_json.as_bytes()).unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn generate_builds_descriptor_from_archive_metadata() {
        let src = tempfile::tempdir().unwrap();
        write_fixture_archive(
            &src.path().join("jq-1.7.1.gotya"),
            r#"{"name":"jq","version":"1.7.1","os":"linux","arch":"amd64"}"#,
        );

        let out_dir = tempfile::tempdir().unwrap();
        let out_path = out_dir.path().join("index.json");
        let opts = GenerateOptions {
            source_dir: src.path(),
            output_path: &out_path,
            base_url: "https://example.com/repo",
            baseline: None,
            force: false,
        };
        let index = generate(&opts, &ZipArchiveReader).unwrap();
        assert_eq!(index.artifacts.len(), 1);
        assert_eq!(index.artifacts[0].name, "jq");
        assert_eq!(
            index.artifacts[0].url,
            "https://example.com/repo/jq-1.7.1.gotya"
        );
        assert_eq!(index.artifacts[0].checksum.len(), 64);
    }

    #[test]
    fn generate_refuses_to_overwrite_without_force() {
        let src = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let out_path = out_dir.path().join("index.json");
        std::fs::write(&out_path, "{}").unwrap();

        let opts = GenerateOptions {
            source_dir: src.path(),
            output_path: &out_path,
            base_url: "https://example.com",
            baseline: None,
            force: false,
        };
        assert!(matches!(
            generate(&opts, &ZipArchiveReader),
            Err(GeneratorError::AlreadyExists(_))
        ));
    }

    #[test]
    fn generate_detects_baseline_conflict() {
        let src = tempfile::tempdir().unwrap();
        write_fixture_archive(
            &src.path().join("jq-1.7.1.gotya"),
            r#"{"name":"jq","version":"1.7.1"}"#,
        );

        let mut baseline = Index::new();
        baseline.artifacts.push(ArtifactDescriptor {
            name: "jq".into(),
            version: "1.7.1".into(),
            description: "a different description".into(),
            url: "https://old.example.com/jq-1.7.1.gotya".into(),
            checksum: "f".repeat(64),
            size: 999,
            os: String::new(),
            arch: String::new(),
            dependencies: Vec::new(),
        });

        let out_dir = tempfile::tempdir().unwrap();
        let opts = GenerateOptions {
            source_dir: src.path(),
            output_path: &out_dir.path().join("index.json"),
            base_url: "https://example.com/repo",
            baseline: Some(&baseline),
            force: false,
        };
        assert!(matches!(
            generate(&opts, &ZipArchiveReader),
            Err(GeneratorError::Conflict { .. })
        ));
    }

    #[test]
    fn artifact_url_joins_with_single_slash() {
        assert_eq!(artifact_url("https://example.com/repo/", "x.gotya"), "https://example.com/repo/x.gotya");
        assert_eq!(artifact_url("https://example.com/repo", "x.gotya"), "https://example.com/repo/x.gotya");
    }
}
