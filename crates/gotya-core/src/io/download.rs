//! Concurrent, URL-deduplicating HTTP downloader with checksum
//! verification and crash-safe atomic placement.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::USER_AGENT;

/// Directories created by the downloader use this mode.
#[cfg(unix)]
const SECURE_DIR_MODE: u32 = 0o700;
/// Files written by the downloader use this mode.
#[cfg(unix)]
const SECURE_FILE_MODE: u32 = 0o600;

/// Errors from a single fetch or an aggregate [`Downloader::fetch_all`] call.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport-level error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// Filesystem error writing the temp file or finalizing it.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The server responded with a non-200 status.
    #[error("unexpected status {status} fetching {url}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// The URL that was requested.
        url: String,
    },
    /// The downloaded file's checksum did not match the one the caller
    /// expected.
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    HashMismatch {
        /// The URL that was fetched.
        url: String,
        /// Checksum the caller supplied.
        expected: String,
        /// Checksum actually computed from the downloaded bytes.
        actual: String,
    },
    /// `opts.dir` was not an absolute path.
    #[error("destination directory must be absolute: {0}")]
    RelativeDir(PathBuf),
}

/// One requested download within a batch. Items sharing a URL are fetched
/// exactly once; every sharing id's result points at the same local path.
#[derive(Debug, Clone)]
pub struct DownloadItem {
    /// Caller-assigned identifier, unique within one [`Downloader::fetch_all`] batch.
    pub id: String,
    /// Absolute URL to fetch.
    pub url: String,
    /// SHA-256 checksum the fetched bytes must match, if known.
    pub expected_checksum: Option<String>,
    /// Explicit destination filename, overriding the checksum/URL-hash
    /// derived name.
    pub filename: Option<String>,
}

/// Configuration shared by every fetch in a batch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Absolute directory fetched files are placed in.
    pub dir: PathBuf,
    /// Number of concurrent workers processing distinct URLs.
    pub concurrency: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl FetchOptions {
    /// Build options with the default concurrency (`max(2, cpus/2)`),
    /// a 300 second timeout, and the crate's user agent string.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            concurrency: default_concurrency(),
            timeout: Duration::from_secs(300),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

fn default_concurrency() -> usize {
    (num_cpus::get() / 2).max(2)
}

/// A concurrent HTTP fetcher. Holds only the HTTP client; temp files are
/// scoped to individual fetch calls.
#[derive(Debug)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    /// Build a downloader using `opts.timeout` for every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(opts: &FetchOptions) -> Result<Self, DownloadError> {
        let client = Client::builder().timeout(opts.timeout).build()?;
        Ok(Self { client })
    }

    /// Fetch every item in `items`, deduplicating by URL and running up to
    /// `opts.concurrency` fetches at once.
    ///
    /// On success, returns every item id mapped to its local file path. On
    /// the first observed failure, returns that error once all in-flight
    /// work has drained; no cancellation is propagated to the other
    /// workers.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::RelativeDir`] if `opts.dir` isn't absolute,
    /// or the first transport/IO/checksum error observed by any worker.
    pub async fn fetch_all(
        &self,
        items: &[DownloadItem],
        opts: &FetchOptions,
    ) -> Result<HashMap<String, String>, DownloadError> {
        if !opts.dir.is_absolute() {
            return Err(DownloadError::RelativeDir(opts.dir.clone()));
        }
        tokio::fs::create_dir_all(&opts.dir).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(
                &opts.dir,
                std::fs::Permissions::from_mode(SECURE_DIR_MODE),
            )
            .await
            .ok();
        }

        let mut representative: HashMap<String, DownloadItem> = HashMap::new();
        for item in items {
            representative
                .entry(item.url.clone())
                .or_insert_with(|| item.clone());
        }

        let urls: Vec<String> = representative.keys().cloned().collect();
        let queue = Arc::new(Mutex::new(urls.into_iter()));
        let url_paths: Arc<Mutex<HashMap<String, String>>> = Arc::new(Mutex::new(HashMap::new()));
        let first_error: Arc<Mutex<Option<DownloadError>>> = Arc::new(Mutex::new(None));
        let representative = Arc::new(representative);

        let worker_count = opts.concurrency.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let queue = queue.clone();
            let url_paths = url_paths.clone();
            let first_error = first_error.clone();
            let representative = representative.clone();
            let client = self.client.clone();
            let dir = opts.dir.clone();
            let user_agent = opts.user_agent.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    let next_url = queue.lock().await.next();
                    let Some(url) = next_url else { break };
                    let item = representative
                        .get(&url)
                        .expect("every queued url has a representative item");
                    match fetch_one(&client, item, &dir, &user_agent).await {
                        Ok(path) => {
                            url_paths.lock().await.insert(url, path);
                        }
                        Err(e) => {
                            let mut slot = first_error.lock().await;
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                        }
                    }
                }
            }));
        }

        for worker in workers {
            worker.await.map_err(std::io::Error::other)?;
        }

        if let Some(err) = Arc::try_unwrap(first_error)
            .map(Mutex::into_inner)
            .unwrap_or(None)
        {
            return Err(err);
        }

        let url_paths = Arc::try_unwrap(url_paths)
            .map(Mutex::into_inner)
            .unwrap_or_default();

        Ok(items
            .iter()
            .filter_map(|item| {
                url_paths
                    .get(&item.url)
                    .map(|path| (item.id.clone(), path.clone()))
            })
            .collect())
    }

    /// Fetch a single item, applying the reuse probe before issuing any
    /// network request.
    ///
    /// # Errors
    ///
    /// Returns a transport, IO, or checksum error. See [`DownloadError`].
    pub async fn fetch(
        &self,
        item: &DownloadItem,
        opts: &FetchOptions,
    ) -> Result<String, DownloadError> {
        if !opts.dir.is_absolute() {
            return Err(DownloadError::RelativeDir(opts.dir.clone()));
        }
        tokio::fs::create_dir_all(&opts.dir).await?;
        fetch_one(&self.client, item, &opts.dir, &opts.user_agent).await
    }
}

fn target_filename(item: &DownloadItem) -> String {
    if let Some(name) = &item.filename {
        return name.clone();
    }
    if let Some(checksum) = &item.expected_checksum {
        return checksum.trim().to_lowercase();
    }
    hex::encode(Sha256::digest(item.url.as_bytes()))
}

async fn reuse_if_valid(path: &Path, expected_checksum: Option<&str>) -> Option<String> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    if metadata.len() == 0 {
        return None;
    }
    match expected_checksum {
        None => Some(path.to_string_lossy().into_owned()),
        Some(expected) => {
            let actual = hash_file(path).await.ok()?;
            if checksums_equal(&actual, expected) {
                Some(path.to_string_lossy().into_owned())
            } else {
                None
            }
        }
    }
}

fn checksums_equal(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

async fn hash_file(path: &Path) -> std::io::Result<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        use std::io::Read;
        let mut file = std::fs::File::open(&path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    })
    .await
    .map_err(std::io::Error::other)?
}

async fn fetch_one(
    client: &Client,
    item: &DownloadItem,
    dir: &Path,
    user_agent: &str,
) -> Result<String, DownloadError> {
    use futures::StreamExt;

    let filename = target_filename(item);
    let target = dir.join(&filename);

    if let Some(path) = reuse_if_valid(&target, item.expected_checksum.as_deref()).await {
        tracing::debug!("reusing cached file for {}", item.url);
        return Ok(path);
    }

    tracing::debug!("fetching {}", item.url);
    let response = client
        .get(&item.url)
        .header(reqwest::header::USER_AGENT, user_agent)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(DownloadError::UnexpectedStatus {
            status: response.status().as_u16(),
            url: item.url.clone(),
        });
    }

    let mut tmp = tempfile::Builder::new()
        .prefix("dl-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    let mut hasher = Sha256::new();
    let mut stream = response.bytes_stream();
    {
        use std::io::Write;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            tmp.write_all(&chunk)?;
            hasher.update(&chunk);
        }
        tmp.flush()?;
    }

    let actual = hex::encode(hasher.finalize());
    if let Some(expected) = &item.expected_checksum {
        if !checksums_equal(&actual, expected) {
            return Err(DownloadError::HashMismatch {
                url: item.url.clone(),
                expected: expected.clone(),
                actual,
            });
        }
    }

    finalize(tmp, &target)?;
    Ok(target.to_string_lossy().into_owned())
}

fn finalize(tmp: tempfile::NamedTempFile, target: &Path) -> Result<(), DownloadError> {
    match tmp.persist(target) {
        Ok(file) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = file
                    .metadata()
                    .map(|m| m.permissions())
                    .map(|mut p| {
                        p.set_mode(SECURE_FILE_MODE);
                        p
                    })
                    .and_then(|p| std::fs::set_permissions(target, p));
            }
            #[cfg(not(unix))]
            {
                let _ = file;
            }
            Ok(())
        }
        Err(persist_err) => {
            // Cross-filesystem rename: fall back to copy + remove.
            let path = persist_err.file.path().to_path_buf();
            std::fs::copy(&path, target)?;
            std::fs::remove_file(&path)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_filename_prefers_explicit_name() {
        let item = DownloadItem {
            id: "a".into(),
            url: "https://example.com/x".into(),
            expected_checksum: Some("deadbeef".into()),
            filename: Some("explicit.gotya".into()),
        };
        assert_eq!(target_filename(&item), "explicit.gotya");
    }

    #[test]
    fn target_filename_falls_back_to_checksum_then_url_hash() {
        let with_checksum = DownloadItem {
            id: "a".into(),
            url: "https://example.com/x".into(),
            expected_checksum: Some("DEADBEEF".into()),
            filename: None,
        };
        assert_eq!(target_filename(&with_checksum), "deadbeef");

        let without = DownloadItem {
            id: "a".into(),
            url: "https://example.com/x".into(),
            expected_checksum: None,
            filename: None,
        };
        assert_eq!(target_filename(&without).len(), 64);
    }

    #[test]
    fn checksums_equal_ignores_case_and_whitespace() {
        assert!(checksums_equal(" AbCd \n", "abcd"));
        assert!(!checksums_equal("abcd", "abce"));
    }

    #[tokio::test]
    async fn fetch_all_dedups_shared_urls() {
        let mut server = mockito::Server::new_async().await;
        let body = b"hello world";
        let mock = server
            .mock("GET", "/file.bin")
            .with_status(200)
            .with_body(body)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let opts = FetchOptions::new(dir.path());
        let downloader = Downloader::new(&opts).unwrap();

        let url = format!("{}/file.bin", server.url());
        let items = vec![
            DownloadItem {
                id: "a".into(),
                url: url.clone(),
                expected_checksum: None,
                filename: None,
            },
            DownloadItem {
                id: "b".into(),
                url,
                expected_checksum: None,
                filename: None,
            },
        ];

        let results = downloader.fetch_all(&items, &opts).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results["a"], results["b"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_detects_hash_mismatch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/file.bin")
            .with_status(200)
            .with_body(b"hello world")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let opts = FetchOptions::new(dir.path());
        let downloader = Downloader::new(&opts).unwrap();

        let item = DownloadItem {
            id: "a".into(),
            url: format!("{}/file.bin", server.url()),
            expected_checksum: Some("0".repeat(64)),
            filename: None,
        };

        let err = downloader.fetch(&item, &opts).await.unwrap_err();
        assert!(matches!(err, DownloadError::HashMismatch { .. }));
    }

    #[tokio::test]
    async fn fetch_reuses_existing_file_matching_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let data = b"cached content";
        let hash = hex::encode(Sha256::digest(data));
        std::fs::write(dir.path().join(&hash), data).unwrap();

        let opts = FetchOptions::new(dir.path());
        let downloader = Downloader::new(&opts).unwrap();
        let item = DownloadItem {
            id: "a".into(),
            url: "https://example.com/never-fetched".into(),
            expected_checksum: Some(hash.clone()),
            filename: None,
        };

        let path = downloader.fetch(&item, &opts).await.unwrap();
        assert_eq!(path, dir.path().join(&hash).to_string_lossy());
    }
}
