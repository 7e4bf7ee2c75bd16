use serde::{Deserialize, Serialize};

/// Lifecycle point a [`HookSpec`] fires at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookEvent {
    /// Before the artifact's files are placed.
    PreInstall,
    /// After the artifact's files are placed.
    PostInstall,
    /// Before the artifact's files are removed.
    PreRemove,
    /// After the artifact's files are removed.
    PostRemove,
}

/// An inline lifecycle script embedded in `meta/artifact.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookSpec {
    /// Lifecycle point this hook fires at.
    pub event: HookEvent,
    /// Shell script text, run by the archive adapter's hook runner.
    pub script: String,
}

/// The metadata record embedded in every artifact archive at
/// `meta/artifact.json`. This is how the index generator learns an
/// artifact's name, version, platform, and dependency list without the
/// caller having to supply them out of band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Artifact name.
    pub name: String,
    /// Artifact version.
    pub version: String,
    /// Target operating system, empty or `"any"` for platform-independent.
    #[serde(default)]
    pub os: String,
    /// Target architecture, empty or `"any"` for platform-independent.
    #[serde(default)]
    pub arch: String,
    /// Maintainer contact or name.
    #[serde(default)]
    pub maintainer: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Names of other artifacts this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Lifecycle hooks packaged with the artifact.
    #[serde(default)]
    pub hooks: Vec<HookSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_metadata() {
        let json = r#"{"name":"jq","version":"1.7.1"}"#;
        let m: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(m.name, "jq");
        assert!(m.dependencies.is_empty());
        assert!(m.hooks.is_empty());
    }

    #[test]
    fn deserializes_hooks() {
        let json = r#"{
            "name": "jq",
            "version": "1.7.1",
            "hooks": [{"event": "post-install", "script": "echo done"}]
        }"#;
        let m: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(m.hooks.len(), 1);
        assert_eq!(m.hooks[0].event, HookEvent::PostInstall);
    }
}
