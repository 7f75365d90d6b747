//! Release install orchestrator.
//!
//! Implements the install pipeline: list releases, pick the requested
//! release and its archive asset, download it, validate the payload, stage
//! it in a scratch directory, extract it over the game directory, and check
//! the install markers. Failures never escape as errors; the caller receives
//! [`InstallOutcome::Failed`] with a reason it can show to the user.
//!
//! Extraction is all-or-nothing in the sense that the first failing entry
//! aborts the install. Files already written are left in place; there is no
//! rollback.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::artefact::download::{DownloadError, ProgressSink, ReleaseSource};
use crate::artefact::extraction::{ArchiveExtractor, ExtractionError};
use crate::artefact::integrity::{
    IntegrityError, stage_payload, validate_payload, verify_written_size,
};
use crate::output::write_stderr_line;
use crate::release::{AssetSelector, SelectionError, select_release};
use crate::verification::{InstallMarkers, MarkerCheck};

/// The outcome of an install attempt.
///
/// This is deliberately not a `Result`: install failures are reported to
/// the user, never propagated as process faults.
#[derive(Debug)]
pub enum InstallOutcome {
    /// The archive was extracted and the install markers were found.
    Installed {
        /// Version that was installed, prefix stripped.
        version: String,
        /// Number of files written.
        files: usize,
    },
    /// The install did not complete.
    Failed {
        /// A human-readable explanation of the failure.
        reason: String,
    },
}

impl InstallOutcome {
    /// Return true for [`InstallOutcome::Installed`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

/// Parameters for one install attempt.
#[derive(Debug)]
pub struct InstallConfig<'a> {
    /// Owner of the repository publishing the loader.
    pub owner: &'a str,
    /// Repository publishing the loader.
    pub repo: &'a str,
    /// Version to install; the newest release when `None`.
    pub version: Option<&'a str>,
    /// Rule picking the archive asset from the release.
    pub asset: &'a AssetSelector,
    /// Game installation directory receiving the loader.
    pub game_dir: &'a Path,
    /// Directory under which a private scratch directory is created.
    pub scratch_root: &'a Path,
    /// Paths expected after a successful install.
    pub markers: &'a InstallMarkers,
    /// Bypass any cached release listing.
    pub force_refresh: bool,
    /// When true, suppress progress output.
    pub quiet: bool,
}

/// Errors raised inside the install pipeline.
///
/// Mapped to [`InstallOutcome::Failed`] by [`install_release_with`].
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// Listing or downloading failed.
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    /// No release or asset matched.
    #[error("{0}")]
    Selection(#[from] SelectionError),

    /// The payload failed integrity validation.
    #[error("integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    /// The scratch directory could not be created.
    #[error("failed to create scratch directory under {path}: {source}")]
    Scratch {
        /// The scratch root.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Extraction aborted.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Every entry was extracted but the install markers are missing.
    #[error("install verification failed: {check}")]
    Verification {
        /// What the marker check found.
        check: MarkerCheck,
    },
}

/// Install the requested release using the given collaborators.
///
/// Returns [`InstallOutcome::Installed`] on success or
/// [`InstallOutcome::Failed`] with a reason on any failure.
pub fn install_release_with(
    config: &InstallConfig<'_>,
    source: &dyn ReleaseSource,
    extractor: &dyn ArchiveExtractor,
    progress: &mut dyn ProgressSink,
    stderr: &mut dyn Write,
) -> InstallOutcome {
    match run_pipeline(config, source, extractor, progress, stderr) {
        Ok((version, files)) => {
            log::info!("installed {version} into {}", config.game_dir.display());
            InstallOutcome::Installed { version, files }
        }
        Err(e) => {
            let reason = e.to_string();
            log::warn!("install failed: {reason}");
            InstallOutcome::Failed { reason }
        }
    }
}

/// The core pipeline: list → select → download → install.
fn run_pipeline(
    config: &InstallConfig<'_>,
    source: &dyn ReleaseSource,
    extractor: &dyn ArchiveExtractor,
    progress: &mut dyn ProgressSink,
    stderr: &mut dyn Write,
) -> Result<(String, usize), InstallError> {
    // Step 1: Pick the release and its archive.
    if !config.quiet {
        write_stderr_line(
            stderr,
            format!("Fetching releases of {}/{}...", config.owner, config.repo),
        );
    }
    let releases = source.list_releases(config.owner, config.repo, config.force_refresh)?;
    let release = select_release(&releases, config.version)?;
    let asset = release.require_asset(config.asset)?;
    let version = release.version().to_owned();

    // Step 2: Download.
    if !config.quiet {
        write_stderr_line(stderr, format!("Downloading {} ({version})...", asset.name));
    }
    let bytes = source.download(&asset.download_url, progress)?;

    // Step 3: Validate, stage, extract, verify.
    if !config.quiet {
        write_stderr_line(stderr, format!("Installing into {}...", config.game_dir.display()));
    }
    let file_name = format!("{version}-{}", asset.name);
    let files = install_archive(
        &bytes,
        &file_name,
        config.game_dir,
        config.scratch_root,
        extractor,
        config.markers,
    )?;
    Ok((version, files))
}

/// Install an in-memory archive into `game_dir`.
///
/// The payload is validated, written to a fresh scratch directory under
/// `scratch_root` as `file_name`, and handed to [`install_staged`]. The
/// scratch directory is removed on every exit path.
///
/// Returns the number of files extracted.
///
/// # Errors
///
/// Returns [`InstallError::Integrity`] before anything touches `game_dir`,
/// [`InstallError::Extraction`] when an entry fails, and
/// [`InstallError::Verification`] when markers are missing afterwards.
pub fn install_archive(
    bytes: &[u8],
    file_name: &str,
    game_dir: &Path,
    scratch_root: &Path,
    extractor: &dyn ArchiveExtractor,
    markers: &InstallMarkers,
) -> Result<usize, InstallError> {
    validate_payload(bytes)?;
    let scratch =
        scratch_dir(scratch_root, "loader-install-").map_err(|source| InstallError::Scratch {
            path: scratch_root.to_path_buf(),
            source,
        })?;
    let archive_path = stage_payload(bytes, scratch.path(), file_name)?;
    install_staged(
        &archive_path,
        bytes.len() as u64,
        game_dir,
        extractor,
        markers,
    )
}

/// Install an archive already staged on disk.
///
/// The staged file must be exactly `expected_len` bytes; otherwise nothing
/// is extracted.
///
/// # Errors
///
/// See [`install_archive`].
pub fn install_staged(
    archive_path: &Path,
    expected_len: u64,
    game_dir: &Path,
    extractor: &dyn ArchiveExtractor,
    markers: &InstallMarkers,
) -> Result<usize, InstallError> {
    verify_written_size(archive_path, expected_len)?;
    let extracted = extractor.extract(archive_path, game_dir)?;
    log::debug!("extracted {} files", extracted.len());

    let check = markers.check(game_dir);
    if !check.is_satisfied() {
        return Err(InstallError::Verification { check });
    }
    Ok(extracted.len())
}

/// Create a private scratch directory that is removed when dropped.
pub(crate) fn scratch_dir(root: &Path, prefix: &str) -> std::io::Result<tempfile::TempDir> {
    std::fs::create_dir_all(root)?;
    tempfile::Builder::new().prefix(prefix).tempdir_in(root)
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
