use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

use crate::hash::Sha256Hash;

/// A normalized artifact name. Names are lowercased on construction so
/// lookups are case-insensitive everywhere they flow through the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactName(String);

impl ArtifactName {
    /// Build a name, lowercasing it.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_lowercase())
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::ffi::OsStr> for ArtifactName {
    fn as_ref(&self) -> &std::ffi::OsStr {
        self.0.as_ref()
    }
}

impl AsRef<std::path::Path> for ArtifactName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl std::fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for ArtifactName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ArtifactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ArtifactName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl PartialEq<&str> for ArtifactName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl PartialEq<String> for ArtifactName {
    fn eq(&self, other: &String) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl Borrow<str> for ArtifactName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ArtifactName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ArtifactName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// A version string. Ordering prefers semver comparison, falling back to
/// lexicographic comparison for strings `semver` cannot parse, with
/// unparseable versions always sorting after parseable ones -- this keeps
/// the resolver's "overall highest version" rule total without panicking
/// on malformed version metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(String);

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (
            semver::Version::parse(&self.0),
            semver::Version::parse(&other.0),
        ) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Version {
    /// Wrap a version string as-is; parsing is deferred to comparison and
    /// constraint evaluation so construction never fails.
    pub fn new(v: impl AsRef<str>) -> Self {
        Self(v.as_ref().to_string())
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as a `semver::Version`, if valid.
    pub fn parse(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.0).ok()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for Version {
    fn eq(&self, other: &String) -> bool {
        self.0 == *other
    }
}

/// A dependency reference inside an [`ArtifactDescriptor`]: another
/// artifact name plus the version constraint this artifact requires of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Name of the depended-upon artifact.
    pub name: String,
    /// Constraint string, empty meaning "any version".
    #[serde(default, rename = "version_constraint")]
    pub version_constraint: String,
}

/// A single repository index entry: everything needed to decide whether
/// this artifact satisfies a request, and where to fetch it from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Artifact name.
    pub name: String,
    /// Artifact version (semver).
    pub version: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Download URL. Relative at rest in a freshly generated index;
    /// resolved to absolute by the orchestrator during sync.
    pub url: String,
    /// Lowercase hex SHA-256 checksum of the artifact archive.
    pub checksum: String,
    /// Size of the archive in bytes.
    pub size: u64,
    /// Operating system this build targets, empty or `"any"` for wildcard.
    #[serde(default)]
    pub os: String,
    /// CPU architecture this build targets, empty or `"any"` for wildcard.
    #[serde(default)]
    pub arch: String,
    /// Transitive dependencies.
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

/// Errors produced validating an [`ArtifactDescriptor`].
#[derive(thiserror::Error, Debug)]
pub enum ArtifactError {
    /// A required field was empty.
    #[error("empty field: {0}")]
    EmptyField(String),
    /// The checksum was not 64 hex characters.
    #[error("invalid checksum length: expected 64 chars, got {0}")]
    InvalidChecksumLength(usize),
    /// The version string did not parse as semver.
    #[error("invalid version: {0}")]
    InvalidVersion(String),
}

impl ArtifactDescriptor {
    /// Validate field shape. Does not verify the checksum against any
    /// file -- that happens at fetch time.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.name.is_empty() {
            return Err(ArtifactError::EmptyField("name".to_string()));
        }
        if self.url.is_empty() {
            return Err(ArtifactError::EmptyField("url".to_string()));
        }
        if semver::Version::parse(&self.version).is_err() {
            return Err(ArtifactError::InvalidVersion(self.version.clone()));
        }
        if self.checksum.len() != 64 || !self.checksum.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ArtifactError::InvalidChecksumLength(self.checksum.len()));
        }
        Ok(())
    }

    /// The checksum as a validated [`Sha256Hash`], if well formed.
    pub fn checksum_hash(&self) -> Option<Sha256Hash> {
        Sha256Hash::new(&self.checksum).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_name_is_case_insensitive() {
        let a = ArtifactName::new("Terraform");
        assert_eq!(a, "terraform");
        assert_eq!(a, "TERRAFORM".to_string());
    }

    #[test]
    fn version_orders_semver_before_garbage() {
        let a = Version::new("1.2.3");
        let b = Version::new("not-a-version");
        assert!(a < b);
    }

    #[test]
    fn version_falls_back_to_string_compare() {
        let a = Version::new("alpha");
        let b = Version::new("beta");
        assert!(a < b);
    }

    fn sample() -> ArtifactDescriptor {
        ArtifactDescriptor {
            name: "terraform".into(),
            version: "1.5.0".into(),
            description: String::new(),
            url: "https://example.com/terraform.gotya".into(),
            checksum: "a".repeat(64),
            size: 10,
            os: String::new(),
            arch: String::new(),
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn validate_accepts_well_formed_descriptor() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_version() {
        let mut d = sample();
        d.version = "not-semver".into();
        assert!(matches!(d.validate(), Err(ArtifactError::InvalidVersion(_))));
    }

    #[test]
    fn validate_rejects_short_checksum() {
        let mut d = sample();
        d.checksum = "deadbeef".into();
        assert!(matches!(
            d.validate(),
            Err(ArtifactError::InvalidChecksumLength(8))
        ));
    }
}
