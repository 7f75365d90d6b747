//! Release listing and asset download.
//!
//! Provides a trait-based abstraction over the release host so that the
//! install and cleanup pipelines can run against stubs in tests. The
//! production implementation talks to the GitHub releases API.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use serde::Deserialize;

use crate::release::{Asset, Release};

/// Default API root for release listings.
pub const GITHUB_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("loader-installer/", env!("CARGO_PKG_VERSION"));

/// Network timeout for release listings and downloads.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Read buffer used while streaming asset bodies.
const CHUNK_SIZE: usize = 64 * 1024;

/// Receiver for download progress notifications.
///
/// This is a notification channel only; it cannot pause or cancel a
/// download.
pub trait ProgressSink {
    /// Called after each chunk with the bytes received so far and the
    /// declared total, when the server sent one.
    fn report(&mut self, received: u64, total: Option<u64>);
}

impl<F> ProgressSink for F
where
    F: FnMut(u64, Option<u64>),
{
    fn report(&mut self, received: u64, total: Option<u64>) {
        self(received, total);
    }
}

/// A [`ProgressSink`] that discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _received: u64, _total: Option<u64>) {}
}

/// Source of releases and their asset bytes.
pub trait ReleaseSource {
    /// List the releases published for `owner/repo`, newest first.
    ///
    /// Implementations may cache listings; `force_refresh` bypasses any
    /// cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched or decoded.
    fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        force_refresh: bool,
    ) -> Result<Vec<Release>, DownloadError>;

    /// Download the bytes behind `url`.
    ///
    /// A body shorter than the size the server declared must surface as
    /// [`DownloadError::Truncated`], never as a short payload.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport failure.
    fn download(&self, url: &str, progress: &mut dyn ProgressSink)
    -> Result<Vec<u8>, DownloadError>;
}

/// Errors arising from release listing and download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested resource was not found (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The body ended before the declared content length.
    #[error("download of {url} truncated: received {received} of {expected} bytes")]
    Truncated {
        /// The URL that was requested.
        url: String,
        /// Declared content length.
        expected: u64,
        /// Bytes actually received.
        received: u64,
    },

    /// The response body could not be decoded.
    #[error("invalid response from {url}: {reason}")]
    InvalidResponse {
        /// The URL that was requested.
        url: String,
        /// Description of the decoding failure.
        reason: String,
    },

    /// I/O error while reading the body.
    #[error("I/O error during download: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
}

impl From<GithubRelease> for Release {
    fn from(release: GithubRelease) -> Self {
        Self {
            tag: release.tag_name,
            assets: release
                .assets
                .into_iter()
                .map(|asset| Asset {
                    name: asset.name,
                    download_url: asset.browser_download_url,
                })
                .collect(),
        }
    }
}

/// GitHub-backed [`ReleaseSource`] using `ureq`.
///
/// Listings are cached per `owner/repo` for the lifetime of the value.
#[derive(Debug)]
pub struct GithubReleaseSource {
    api_url: String,
    cache: Mutex<HashMap<String, Vec<Release>>>,
}

impl GithubReleaseSource {
    /// Create a source rooted at `api_url`.
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Construct the release listing URL for a repository.
    ///
    /// # Examples
    ///
    /// ```
    /// use loader_installer::artefact::download::GithubReleaseSource;
    ///
    /// let source = GithubReleaseSource::default();
    /// let url = source.releases_url("LavaGang", "MelonLoader");
    /// assert!(url.ends_with("/repos/LavaGang/MelonLoader/releases"));
    /// ```
    #[must_use]
    pub fn releases_url(&self, owner: &str, repo: &str) -> String {
        format!(
            "{}/repos/{owner}/{repo}/releases",
            self.api_url.trim_end_matches('/')
        )
    }

    fn cached(&self, key: &str) -> Option<Vec<Release>> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(key).cloned())
    }

    fn store(&self, key: String, releases: &[Release]) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, releases.to_vec());
        }
    }
}

impl Default for GithubReleaseSource {
    fn default() -> Self {
        Self::new(GITHUB_API_URL)
    }
}

impl ReleaseSource for GithubReleaseSource {
    fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        force_refresh: bool,
    ) -> Result<Vec<Release>, DownloadError> {
        let key = format!("{owner}/{repo}");
        if !force_refresh && let Some(releases) = self.cached(&key) {
            log::debug!("using cached release listing for {key}");
            return Ok(releases);
        }

        let url = self.releases_url(owner, repo);
        log::debug!("listing releases from {url}");
        let body = fetch_text(&url)?;
        let releases = parse_releases(&url, &body)?;
        self.store(key, &releases);
        Ok(releases)
    }

    fn download(
        &self,
        url: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<u8>, DownloadError> {
        log::debug!("downloading {url}");
        let response = http_agent()
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let declared = response
            .headers()
            .get("content-length")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let mut body = response.into_body();
        read_body(url, &mut body.as_reader(), declared, progress)
    }
}

/// Decode a GitHub release listing.
fn parse_releases(url: &str, body: &str) -> Result<Vec<Release>, DownloadError> {
    let releases: Vec<GithubRelease> =
        serde_json::from_str(body).map_err(|e| DownloadError::InvalidResponse {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
    Ok(releases.into_iter().map(Release::from).collect())
}

/// Stream a body into memory, reporting progress and enforcing the
/// declared length.
fn read_body(
    url: &str,
    reader: &mut dyn Read,
    declared: Option<u64>,
    progress: &mut dyn ProgressSink,
) -> Result<Vec<u8>, DownloadError> {
    let capacity = declared
        .and_then(|len| usize::try_from(len).ok())
        .unwrap_or_default();
    let mut bytes = Vec::with_capacity(capacity);
    let mut chunk = vec![0_u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DownloadError::Io(e)),
        };
        bytes.extend_from_slice(chunk.get(..read).unwrap_or_default());
        progress.report(bytes.len() as u64, declared);
    }

    let received = bytes.len() as u64;
    if let Some(expected) = declared
        && received < expected
    {
        return Err(DownloadError::Truncated {
            url: url.to_owned(),
            expected,
            received,
        });
    }
    Ok(bytes)
}

/// Download a URL and return the body as a string.
fn fetch_text(url: &str) -> Result<String, DownloadError> {
    let response = http_agent()
        .get(url)
        .header("User-Agent", USER_AGENT)
        .header("Accept", "application/vnd.github+json")
        .call()
        .map_err(|e| map_ureq_error(url, &e))?;
    response
        .into_body()
        .read_to_string()
        .map_err(|e| DownloadError::HttpError {
            url: url.to_owned(),
            reason: e.to_string(),
        })
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(DOWNLOAD_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LISTING: &str = r#"[
        {
            "tag_name": "v0.6.2",
            "name": "v0.6.2 Open-Beta",
            "assets": [
                {"name": "Loader.x64.zip", "browser_download_url": "https://example.test/x64.zip", "size": 10},
                {"name": "Loader.x86.zip", "browser_download_url": "https://example.test/x86.zip", "size": 10}
            ]
        },
        {"tag_name": "v0.6.1"}
    ]"#;

    #[test]
    fn releases_url_contains_owner_and_repo() {
        let source = GithubReleaseSource::new("https://api.example.test/");
        assert_eq!(
            source.releases_url("owner", "repo"),
            "https://api.example.test/repos/owner/repo/releases"
        );
    }

    #[test]
    fn parses_release_listing() {
        let releases = parse_releases("https://api.example.test", LISTING).expect("listing");
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].tag, "v0.6.2");
        assert_eq!(releases[0].assets[1].name, "Loader.x86.zip");
        assert_eq!(
            releases[0].assets[0].download_url,
            "https://example.test/x64.zip"
        );
        assert!(releases[1].assets.is_empty());
    }

    #[test]
    fn malformed_listing_is_invalid_response() {
        let err = parse_releases("https://api.example.test", "{not json").expect_err("bad json");
        assert!(matches!(err, DownloadError::InvalidResponse { .. }));
    }

    #[test]
    fn cached_listing_is_served_without_network() {
        let source = GithubReleaseSource::new("http://127.0.0.1:9");
        let cached = vec![Release {
            tag: "v1.0.0".to_owned(),
            assets: Vec::new(),
        }];
        source.store("owner/repo".to_owned(), &cached);

        let releases = source
            .list_releases("owner", "repo", false)
            .expect("cached listing");
        assert_eq!(releases, cached);
    }

    #[test]
    fn read_body_reports_progress() {
        let payload = vec![7_u8; CHUNK_SIZE + 10];
        let mut seen = Vec::new();
        let mut sink = |received: u64, total: Option<u64>| seen.push((received, total));
        let bytes = read_body(
            "https://example.test/a.zip",
            &mut Cursor::new(payload.clone()),
            Some(payload.len() as u64),
            &mut sink,
        )
        .expect("full body");

        assert_eq!(bytes, payload);
        let last = seen.last().copied().expect("progress reported");
        assert_eq!(last, (payload.len() as u64, Some(payload.len() as u64)));
    }

    #[test]
    fn short_body_is_truncation_error() {
        let err = read_body(
            "https://example.test/a.zip",
            &mut Cursor::new(vec![1_u8; 8]),
            Some(10),
            &mut NoProgress,
        )
        .expect_err("truncated body");
        assert!(matches!(
            err,
            DownloadError::Truncated {
                expected: 10,
                received: 8,
                ..
            }
        ));
    }

    #[test]
    fn map_ureq_error_maps_404_to_not_found() {
        let err = ureq::Error::StatusCode(404);
        let mapped = map_ureq_error("https://example.test/releases", &err);
        assert!(matches!(mapped, DownloadError::NotFound { .. }));
    }

    #[test]
    fn map_ureq_error_maps_other_status_to_http_error() {
        let err = ureq::Error::StatusCode(500);
        let mapped = map_ureq_error("https://example.test/releases", &err);
        assert!(matches!(mapped, DownloadError::HttpError { .. }));
    }
}
