use serde::{Deserialize, Deserializer, Serialize};

/// A validated SHA-256 digest, stored as 64 lowercase hex characters.
///
/// Comparisons against plain strings normalize case and trim whitespace,
/// matching the checksum comparison rule used throughout the downloader
/// and index generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Create a validated hash from a hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is not exactly 64 ASCII hex characters once
    /// whitespace is trimmed.
    pub fn new(s: impl AsRef<str>) -> Result<Self, String> {
        let trimmed = s.as_ref().trim();
        if trimmed.len() == 64 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(trimmed.to_lowercase()))
        } else {
            Err(format!(
                "invalid sha256 hash: expected 64 hex chars, got '{trimmed}'"
            ))
        }
    }

    /// Compute the SHA-256 hash of a byte slice.
    pub fn of_bytes(data: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(data);
        Self(hex::encode(digest))
    }

    /// Return the inner hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Sha256Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Hash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Sha256Hash {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(Sha256Hash::new("deadbeef").is_err());
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        let hex = "a".repeat(64);
        let upper = hex.to_uppercase();
        let padded = format!("  {upper}\n");
        let h = Sha256Hash::new(&padded).unwrap();
        assert_eq!(h, hex.as_str());
    }

    #[test]
    fn of_bytes_is_deterministic() {
        let a = Sha256Hash::of_bytes(b"hello");
        let b = Sha256Hash::of_bytes(b"hello");
        assert_eq!(a, b);
    }
}
