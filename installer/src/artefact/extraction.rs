//! Archive extraction onto a live install directory.
//!
//! Extracts `.zip` archives over an existing tree, overwriting files that
//! are already present, with path traversal protection to prevent zip-slip
//! attacks. Extraction is all-or-nothing from the caller's point of view:
//! the first failing entry aborts the run.

use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

/// Trait for extracting archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use loader_installer::artefact::extraction::ZipExtractor;
///
/// let extractor = ZipExtractor;
/// // Use extractor.extract(archive_path, game_dir) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the relative paths of the files written, in archive order.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::EmptyArchive`] if the archive has no
    /// entries, [`ExtractionError::PathTraversal`] if an entry escapes the
    /// destination, and [`ExtractionError::Entry`] when an entry cannot be
    /// written.
    fn extract(&self, archive_path: &Path, dest_dir: &Path)
    -> Result<Vec<PathBuf>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The archive file could not be opened.
    #[error("failed to open archive {path}: {source}")]
    Open {
        /// The archive file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The container is not a readable zip archive.
    #[error("invalid zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The archive contains no entries.
    #[error("archive contains no entries")]
    EmptyArchive,

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// Writing one entry failed; extraction stopped there.
    #[error("failed to extract {path}: {source}")]
    Entry {
        /// The archive entry being extracted.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Default extractor using the `zip` crate.
///
/// Directory entries are skipped; parent directories are created on demand
/// for every file entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractionError> {
        let file = File::open(archive_path).map_err(|source| ExtractionError::Open {
            path: archive_path.to_path_buf(),
            source,
        })?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
        if archive.len() == 0 {
            return Err(ExtractionError::EmptyArchive);
        }

        let mut extracted = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().replace('\\', "/");
            if is_directory_entry(&name) {
                continue;
            }

            let relative = validate_entry_path(&name)?;
            let dest_path = dest_dir.join(&relative);
            write_entry(&mut entry, &dest_path).map_err(|source| ExtractionError::Entry {
                path: name.clone(),
                source,
            })?;
            log::debug!("extracted {name}");
            extracted.push(relative);
        }

        Ok(extracted)
    }
}

/// Return true for entries without a file-name component.
pub(crate) fn is_directory_entry(name: &str) -> bool {
    name.is_empty() || name.ends_with('/')
}

/// Create parents and overwrite the destination with the entry contents.
fn write_entry(entry: &mut dyn std::io::Read, dest_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut output = File::create(dest_path)?;
    std::io::copy(entry, &mut output)?;
    Ok(())
}

/// Validate that an entry path stays inside the destination directory.
///
/// Rejects absolute paths, drive prefixes, and `..` components.
fn validate_entry_path(name: &str) -> Result<PathBuf, ExtractionError> {
    let path = Path::new(name);
    let escapes = path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes || name.starts_with('/') {
        return Err(ExtractionError::PathTraversal {
            path: name.to_owned(),
        });
    }
    Ok(path
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .collect())
}
