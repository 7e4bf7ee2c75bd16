use serde::{Deserialize, Serialize};

/// A configured index origin.
///
/// Repositories are compared by `priority` when the same artifact name and
/// version is offered by more than one of them; the comparison is a tie
/// break only -- see [`crate::index::Index`] and the resolver for the
/// actual selection rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Unique repository name, used as the local index filename stem.
    pub name: String,
    /// Absolute origin URL the index (and, by convention, its artifacts)
    /// are published under.
    pub url: String,
    /// Tie-break priority; higher wins when versions are otherwise equal.
    #[serde(default)]
    pub priority: u32,
    /// Disabled repositories are skipped everywhere: sync, resolve, search.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Repository {
    /// Local index filename for this repository, `<name>.json`.
    pub fn index_filename(&self) -> String {
        format!("{}.json", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_filename_matches_name() {
        let r = Repository {
            name: "core".into(),
            url: "https://example.com/core".into(),
            priority: 0,
            enabled: true,
        };
        assert_eq!(r.index_filename(), "core.json");
    }
}
