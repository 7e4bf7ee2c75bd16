//! Filesystem layout under `GOTYA_HOME` (defaults to `~/.gotya`).

use dirs::home_dir;
use std::path::PathBuf;

/// Returns the gotya home directory, or `None` if the user's home cannot
/// be resolved and `GOTYA_HOME` isn't set.
pub fn try_gotya_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("GOTYA_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".gotya"))
}

/// Returns the gotya home directory (`~/.gotya`).
///
/// # Panics
///
/// Panics if neither `GOTYA_HOME` is set nor the user's home directory can
/// be resolved.
pub fn gotya_home() -> PathBuf {
    try_gotya_home().expect("could not determine home directory; set GOTYA_HOME to override")
}

/// Root config file: `~/.gotya/gotya.toml`
pub fn config_path() -> PathBuf {
    gotya_home().join("gotya.toml")
}

/// Installed-artifact `SQLite` state database: `~/.gotya/state.db`
pub fn db_path() -> PathBuf {
    gotya_home().join("state.db")
}

/// Root of unpacked installed artifact contents: `~/.gotya/store`
pub fn store_path() -> PathBuf {
    gotya_home().join("store")
}

/// Downloaded `.gotya` archives, keyed by checksum: `~/.gotya/cache/archives`
pub fn archive_cache_path() -> PathBuf {
    gotya_home().join("cache").join("archives")
}

/// Cached repository indexes: `~/.gotya/cache/indexes`
pub fn index_cache_path() -> PathBuf {
    gotya_home().join("cache").join("indexes")
}

/// Cached index path for one repository.
pub fn index_cache_file(repo_name: &str) -> PathBuf {
    index_cache_path().join(format!("{repo_name}.json"))
}

/// Logs directory: `~/.gotya/logs`
pub fn log_dir() -> PathBuf {
    gotya_home().join("logs")
}

/// Scratch directory for in-progress downloads, guaranteed to share a
/// volume with the archive cache so finalization can use `rename`.
pub fn tmp_path() -> PathBuf {
    archive_cache_path().join("tmp")
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_gotya_home_honors_env_override() {
        // SAFETY: test-local env mutation, no other test in this process reads GOTYA_HOME concurrently.
        unsafe {
            std::env::set_var("GOTYA_HOME", "/tmp/gotya-test-home");
        }
        assert_eq!(
            try_gotya_home(),
            Some(PathBuf::from("/tmp/gotya-test-home"))
        );
        unsafe {
            std::env::remove_var("GOTYA_HOME");
        }
    }

    #[test]
    fn tmp_path_shares_a_root_with_archive_cache() {
        // SAFETY: test-local env mutation, no other test in this process reads GOTYA_HOME concurrently.
        unsafe {
            std::env::set_var("GOTYA_HOME", "/tmp/gotya-test-home-2");
        }
        assert!(tmp_path().starts_with(archive_cache_path()));
        unsafe {
            std::env::remove_var("GOTYA_HOME");
        }
    }

    #[test]
    fn filename_from_url_takes_the_last_segment() {
        assert_eq!(
            filename_from_url("https://example.com/repo/jq-1.7.1.gotya"),
            "jq-1.7.1.gotya"
        );
        assert_eq!(filename_from_url("no-slashes"), "no-slashes");
    }
}
