//! Archive entry listings used for version diffing.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::extraction::is_directory_entry;

/// A forward-slash normalised relative path of a file entry in an archive.
///
/// Equality and ordering are case-sensitive on the stored path; use
/// [`Self::key`] for the case-insensitive comparisons the diff performs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveEntryPath(String);

impl ArchiveEntryPath {
    /// Normalise `raw`, returning `None` for directory-only entries and for
    /// entries that would resolve outside the directory they are joined to.
    ///
    /// Backslashes become `/` and leading `/` or `./` segments are dropped.
    /// Any `..` segment or drive prefix such as `C:` rejects the entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use loader_installer::artefact::entries::ArchiveEntryPath;
    ///
    /// let entry = ArchiveEntryPath::new(r"Loader\Dependencies\core.dll").expect("file entry");
    /// assert_eq!(entry.as_str(), "Loader/Dependencies/core.dll");
    /// assert!(ArchiveEntryPath::new("Loader/Dependencies/").is_none());
    /// assert!(ArchiveEntryPath::new("../victim.txt").is_none());
    /// ```
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let slashed = raw.replace('\\', "/");
        if is_directory_entry(&slashed) {
            return None;
        }
        let segments: Vec<&str> = slashed
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        if segments
            .iter()
            .any(|segment| *segment == ".." || segment.contains(':'))
        {
            return None;
        }
        let normalised = segments.join("/");
        if normalised.is_empty() {
            return None;
        }
        Some(Self(normalised))
    }

    /// The normalised path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form used for case-insensitive comparison.
    #[must_use]
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }

    /// Resolve this entry under `root` using platform separators.
    #[must_use]
    pub fn resolve(&self, root: &Path) -> PathBuf {
        self.0
            .split('/')
            .fold(root.to_path_buf(), |path, segment| path.join(segment))
    }
}

impl fmt::Display for ArchiveEntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while reading an archive's entry listing.
#[derive(Debug, thiserror::Error)]
pub enum EntryListError {
    /// The archive file could not be opened.
    #[error("failed to open archive {path}: {source}")]
    Open {
        /// The archive file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a readable zip archive.
    #[error("invalid zip archive {path}: {source}")]
    Archive {
        /// The archive file.
        path: PathBuf,
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },
}

/// List the file entries of the zip archive at `archive_path`.
///
/// Directory entries are excluded, as are entries escaping the archive root;
/// the latter are logged. Order follows the archive.
///
/// # Errors
///
/// Returns [`EntryListError`] if the archive cannot be opened or parsed.
pub fn list_entries(archive_path: &Path) -> Result<Vec<ArchiveEntryPath>, EntryListError> {
    let file = File::open(archive_path).map_err(|source| EntryListError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let archive =
        zip::ZipArchive::new(BufReader::new(file)).map_err(|source| EntryListError::Archive {
            path: archive_path.to_path_buf(),
            source,
        })?;
    let entries: Vec<ArchiveEntryPath> = archive
        .file_names()
        .filter_map(|name| {
            let entry = ArchiveEntryPath::new(name);
            if entry.is_none() && !is_directory_entry(&name.replace('\\', "/")) {
                log::warn!("ignoring entry {name} in {}", archive_path.display());
            }
            entry
        })
        .collect();
    log::debug!(
        "{} lists {} file entries",
        archive_path.display(),
        entries.len()
    );
    Ok(entries)
}
