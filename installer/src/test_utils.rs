//! Shared test utilities for the installer crate.
#![allow(
    clippy::expect_used,
    reason = "test fixtures abort the test when setup fails"
)]

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::artefact::download::{DownloadError, ProgressSink, ReleaseSource};
use crate::release::{Asset, Release};
use crate::settings::{SettingsError, SettingsStore};

/// Build an in-memory zip archive from `(path, contents)` pairs.
///
/// Paths ending in `/` become directory entries and their contents are
/// ignored.
#[must_use]
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, options)
                .expect("add directory entry");
        } else {
            writer.start_file(*name, options).expect("start file entry");
            writer
                .write_all(contents.as_bytes())
                .expect("write file entry");
        }
    }
    writer.finish().expect("finish archive").into_inner()
}

/// Write a zip archive built by [`zip_bytes`] to `dir/name`.
#[must_use]
pub fn write_zip(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, zip_bytes(entries)).expect("write archive");
    path
}

/// Download URL the stub assigns to an asset.
#[must_use]
pub fn asset_url(tag: &str, asset_name: &str) -> String {
    format!("https://downloads.invalid/{tag}/{asset_name}")
}

/// A [`ReleaseSource`] serving canned releases and asset bytes.
///
/// Releases are listed in the order they were added, so add the newest
/// first.
#[derive(Debug, Default)]
pub struct StubReleaseSource {
    releases: Vec<Release>,
    payloads: HashMap<String, Vec<u8>>,
    failing_urls: HashSet<String>,
    fail_listing: bool,
    downloads: Mutex<Vec<String>>,
    listings: Mutex<Vec<bool>>,
}

impl StubReleaseSource {
    /// Create a source with no releases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a release carrying a single asset served as `payload`.
    #[must_use]
    pub fn with_release(mut self, tag: &str, asset_name: &str, payload: Vec<u8>) -> Self {
        let url = asset_url(tag, asset_name);
        self.payloads.insert(url.clone(), payload);
        self.releases.push(Release {
            tag: tag.to_owned(),
            assets: vec![Asset {
                name: asset_name.to_owned(),
                download_url: url,
            }],
        });
        self
    }

    /// Make every download of the given asset fail.
    #[must_use]
    pub fn with_failing_download(mut self, tag: &str, asset_name: &str) -> Self {
        self.failing_urls.insert(asset_url(tag, asset_name));
        self
    }

    /// Make release listing fail.
    #[must_use]
    pub fn with_failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// URLs downloaded so far, in order.
    #[must_use]
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().expect("downloads lock").clone()
    }

    /// The `force_refresh` flag of every listing request so far.
    #[must_use]
    pub fn listings(&self) -> Vec<bool> {
        self.listings.lock().expect("listings lock").clone()
    }
}

impl ReleaseSource for StubReleaseSource {
    fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        force_refresh: bool,
    ) -> Result<Vec<Release>, DownloadError> {
        self.listings
            .lock()
            .expect("listings lock")
            .push(force_refresh);
        if self.fail_listing {
            return Err(DownloadError::HttpError {
                url: format!("https://api.invalid/repos/{owner}/{repo}/releases"),
                reason: "connection refused".to_owned(),
            });
        }
        Ok(self.releases.clone())
    }

    fn download(
        &self,
        url: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<u8>, DownloadError> {
        self.downloads
            .lock()
            .expect("downloads lock")
            .push(url.to_owned());
        if self.failing_urls.contains(url) {
            return Err(DownloadError::HttpError {
                url: url.to_owned(),
                reason: "connection reset".to_owned(),
            });
        }
        let bytes = self
            .payloads
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::NotFound {
                url: url.to_owned(),
            })?;
        let len = bytes.len() as u64;
        progress.report(len, Some(len));
        Ok(bytes)
    }
}

/// A [`SettingsStore`] held in memory.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    last_cleaned: Mutex<Option<String>>,
    fail_writes: bool,
}

impl MemorySettingsStore {
    /// Create a store with no marker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose marker is already `version`.
    #[must_use]
    pub fn with_marker(version: &str) -> Self {
        Self {
            last_cleaned: Mutex::new(Some(version.to_owned())),
            fail_writes: false,
        }
    }

    /// Make every write fail.
    #[must_use]
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// The current marker value.
    #[must_use]
    pub fn marker(&self) -> Option<String> {
        self.last_cleaned.lock().expect("settings lock").clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn last_cleaned_version(&self) -> Result<Option<String>, SettingsError> {
        Ok(self.marker())
    }

    fn set_last_cleaned_version(&self, version: &str) -> Result<(), SettingsError> {
        if self.fail_writes {
            return Err(SettingsError::Write {
                path: PathBuf::from("memory://settings.json"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        *self.last_cleaned.lock().expect("settings lock") = Some(version.to_owned());
        Ok(())
    }
}
