//! The repository index: a JSON document listing the artifacts one
//! repository publishes.

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ArtifactDescriptor;

/// Current index format version written by this implementation.
pub const FORMAT_VERSION: &str = "1";

/// Errors parsing, writing, or searching an [`Index`].
#[derive(Error, Debug)]
pub enum IndexError {
    /// Filesystem error reading or writing the index file.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The document was not valid JSON, or was missing `format_version`.
    #[error("invalid index: {0}")]
    Invalid(String),
}

/// One repository's full catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    /// Format version; currently always `"1"`.
    pub format_version: String,
    /// Timestamp the index was generated or last merged.
    pub last_update: DateTime<Utc>,
    /// All published artifacts, across all versions.
    pub artifacts: Vec<ArtifactDescriptor>,
}

impl Index {
    /// Build an empty index stamped with the current time.
    pub fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            last_update: Utc::now(),
            artifacts: Vec::new(),
        }
    }

    /// Parse an index from its JSON text representation.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Invalid`] if the document isn't valid JSON or
    /// is missing the required `format_version` field.
    pub fn parse(text: &str) -> Result<Self, IndexError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| IndexError::Invalid(e.to_string()))?;
        if value.get("format_version").is_none() {
            return Err(IndexError::Invalid(
                "missing required field `format_version`".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| IndexError::Invalid(e.to_string()))
    }

    /// Read and parse an index from disk.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Pretty-print this index as JSON, two-space indent, trailing
    /// newline.
    pub fn to_json(&self) -> Result<String, IndexError> {
        let mut buf =
            serde_json::to_string_pretty(self).map_err(|e| IndexError::Invalid(e.to_string()))?;
        buf.push('\n');
        Ok(buf)
    }

    /// Write the index to `path` atomically: write to a sibling `.tmp`
    /// file, then rename over the destination.
    pub fn write(&self, path: &Path) -> Result<(), IndexError> {
        let json = self.to_json()?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// All descriptors exactly matching `name` (case-sensitive; callers
    /// are expected to pass an already-normalized [`crate::ArtifactName`]
    /// string).
    pub fn find_by_name(&self, name: &str) -> Vec<&ArtifactDescriptor> {
        self.artifacts.iter().filter(|a| a.name == name).collect()
    }

    /// Fuzzy search scored by: exact match (1.0), prefix match (0.9),
    /// substring match (0.7), else excluded. Survivors are returned in the
    /// index's original artifact order, not sorted by score -- this is
    /// intentionally the simple O(N·|query|) algorithm, not a ranked
    /// search.
    pub fn search(&self, query: &str) -> Vec<&ArtifactDescriptor> {
        let q = query.to_lowercase();
        self.artifacts
            .iter()
            .filter(|a| {
                let name = a.name.to_lowercase();
                name == q || name.starts_with(&q) || name.contains(&q)
            })
            .collect()
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}
