//! Post-upgrade removal of files the previous release shipped.
//!
//! A cleanup run compares the archive of the release that was just
//! installed with the archive of the release it replaced, and deletes
//! every file the older archive shipped that the newer one no longer does.
//! The run is gated by a completion marker in the settings store so it
//! happens at most once per installed version.
//!
//! A run walks the phases of [`CleanupPhase`] in order. Anything that fails
//! before [`CleanupPhase::Deleting`] abandons the run and leaves the marker
//! untouched, so the next launch retries. Individual delete failures are
//! recorded in the [`CleanupReport`] and do not stop the run; the marker is
//! written even when some files could not be removed.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::artefact::download::{DownloadError, NoProgress, ReleaseSource};
use crate::artefact::entries::{EntryListError, list_entries};
use crate::artefact::integrity::{IntegrityError, stage_payload, validate_payload};
use crate::diff::{ObsoleteFileSet, obsolete_entries};
use crate::install::scratch_dir;
use crate::output::write_stderr_line;
use crate::release::{
    Asset, AssetSelector, Release, SelectionError, preceding_release, select_release,
    version_from_tag, versions_match,
};
use crate::settings::{SettingsError, SettingsStore};

/// Return true unless cleanup already completed for `current_version`.
///
/// Versions compare with any leading `v` removed, ignoring ASCII case.
///
/// # Examples
///
/// ```
/// use loader_installer::cleanup::should_run;
///
/// assert!(should_run("0.6.2", None));
/// assert!(should_run("0.6.2", Some("0.6.1")));
/// assert!(!should_run("v0.6.2", Some("0.6.2")));
/// ```
#[must_use]
pub fn should_run(current_version: &str, last_completed: Option<&str>) -> bool {
    last_completed.is_none_or(|last| !versions_match(current_version, last))
}

/// Filesystem operations used to delete obsolete files.
#[cfg_attr(test, mockall::automock)]
pub trait FileRemover {
    /// Return true when `path` names an existing regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Delete the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the file cannot be removed.
    fn remove_file(&self, path: &Path) -> std::io::Result<()>;
}

/// [`FileRemover`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileRemover;

impl FileRemover for StdFileRemover {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// What happened to one obsolete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionStatus {
    /// The file existed and was removed.
    Deleted,
    /// Nothing was there to remove.
    Missing,
    /// The file exists but could not be removed.
    Failed(String),
}

/// Outcome for a single obsolete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOutcome {
    /// Absolute path under the install directory.
    pub path: PathBuf,
    /// What happened to it.
    pub status: DeletionStatus,
}

/// Per-path results of a deletion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// One entry per obsolete path, in diff order.
    pub outcomes: Vec<PathOutcome>,
}

impl CleanupReport {
    fn count(&self, wanted: impl Fn(&DeletionStatus) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| wanted(&outcome.status))
            .count()
    }

    /// Number of files removed.
    #[must_use]
    pub fn deleted(&self) -> usize {
        self.count(|status| matches!(status, DeletionStatus::Deleted))
    }

    /// Number of paths with nothing to remove.
    #[must_use]
    pub fn missing(&self) -> usize {
        self.count(|status| matches!(status, DeletionStatus::Missing))
    }

    /// Paths that could not be removed.
    pub fn failures(&self) -> impl Iterator<Item = &PathOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, DeletionStatus::Failed(_)))
    }
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} deleted, {} already absent, {} failed",
            self.deleted(),
            self.missing(),
            self.failures().count()
        )
    }
}

/// Delete every obsolete path that exists under `install_dir`.
///
/// A path that cannot be removed is logged and recorded; the pass always
/// visits every path.
#[must_use]
pub fn remove_obsolete(
    install_dir: &Path,
    obsolete: &ObsoleteFileSet,
    remover: &dyn FileRemover,
) -> CleanupReport {
    let outcomes = obsolete
        .iter()
        .map(|entry| {
            let path = entry.resolve(install_dir);
            let status = if !remover.is_file(&path) {
                DeletionStatus::Missing
            } else {
                match remover.remove_file(&path) {
                    Ok(()) => {
                        log::debug!("deleted {}", path.display());
                        DeletionStatus::Deleted
                    }
                    Err(e) => {
                        log::warn!("could not delete {}: {e}", path.display());
                        DeletionStatus::Failed(e.to_string())
                    }
                }
            };
            PathOutcome { path, status }
        })
        .collect();
    CleanupReport { outcomes }
}

/// Stages of a cleanup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPhase {
    /// Reading the completion marker.
    NotStarted,
    /// Listing releases and picking the current and previous one.
    FetchingReleases,
    /// Downloading both archives into scratch space.
    Downloading,
    /// Listing archive entries and computing the obsolete set.
    Diffing,
    /// Deleting obsolete files and recording completion.
    Deleting,
    /// The marker records the current version.
    MarkedComplete,
}

impl fmt::Display for CleanupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "checking completion marker",
            Self::FetchingReleases => "fetching releases",
            Self::Downloading => "downloading archives",
            Self::Diffing => "comparing archives",
            Self::Deleting => "deleting obsolete files",
            Self::MarkedComplete => "complete",
        };
        f.write_str(name)
    }
}

/// Parameters for one cleanup run.
#[derive(Debug)]
pub struct CleanupRequest<'a> {
    /// Owner of the repository publishing the loader.
    pub owner: &'a str,
    /// Repository publishing the loader.
    pub repo: &'a str,
    /// Version currently installed.
    pub current_version: &'a str,
    /// Version being replaced; the release listed after the current one
    /// when `None`.
    pub previous_version: Option<&'a str>,
    /// Rule picking the archive asset from each release.
    pub asset: &'a AssetSelector,
    /// Game installation directory to clean.
    pub game_dir: &'a Path,
    /// Directory under which a private scratch directory is created.
    pub scratch_root: &'a Path,
    /// Run even when the marker says this version is already clean.
    pub force: bool,
    /// Bypass any cached release listing.
    pub force_refresh: bool,
    /// When true, suppress progress output.
    pub quiet: bool,
}

/// The outcome of a cleanup run.
#[derive(Debug)]
pub enum CleanupOutcome {
    /// The marker already records this version; nothing was done.
    AlreadyComplete {
        /// The current version, prefix stripped.
        version: String,
    },
    /// Obsolete files were processed and the marker was written.
    Completed {
        /// The current version, prefix stripped.
        version: String,
        /// The version the diff was taken against, if any.
        previous: Option<String>,
        /// Per-path results.
        report: CleanupReport,
    },
    /// The run was abandoned; the marker is unchanged.
    Failed {
        /// Phase that was running when the failure occurred.
        phase: CleanupPhase,
        /// A human-readable explanation of the failure.
        reason: String,
    },
}

impl CleanupOutcome {
    /// Return true unless the run was abandoned.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Errors that abandon a cleanup run.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    /// Reading or writing the completion marker failed.
    #[error("settings: {0}")]
    Settings(#[from] SettingsError),

    /// Listing or downloading failed.
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    /// A release or asset could not be found.
    #[error("{0}")]
    Selection(#[from] SelectionError),

    /// A downloaded archive failed integrity validation.
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

    /// An archive could not be listed.
    #[error("{0}")]
    Entries(#[from] EntryListError),
}

#[derive(Debug)]
struct PhaseFailure {
    phase: CleanupPhase,
    error: CleanupError,
}

trait InPhase<T> {
    fn in_phase(self, phase: CleanupPhase) -> Result<T, PhaseFailure>;
}

impl<T, E: Into<CleanupError>> InPhase<T> for Result<T, E> {
    fn in_phase(self, phase: CleanupPhase) -> Result<T, PhaseFailure> {
        self.map_err(|e| PhaseFailure {
            phase,
            error: e.into(),
        })
    }
}

/// Run cleanup for the installed version using the given collaborators.
///
/// Never returns an error: failures come back as
/// [`CleanupOutcome::Failed`] naming the phase that was running.
pub fn run_cleanup_with(
    request: &CleanupRequest<'_>,
    source: &dyn ReleaseSource,
    settings: &dyn SettingsStore,
    remover: &dyn FileRemover,
    stderr: &mut dyn Write,
) -> CleanupOutcome {
    match run_phases(request, source, settings, remover, stderr) {
        Ok(outcome) => outcome,
        Err(PhaseFailure { phase, error }) => {
            let reason = error.to_string();
            log::warn!("cleanup failed while {phase}: {reason}");
            CleanupOutcome::Failed { phase, reason }
        }
    }
}

fn run_phases(
    request: &CleanupRequest<'_>,
    source: &dyn ReleaseSource,
    settings: &dyn SettingsStore,
    remover: &dyn FileRemover,
    stderr: &mut dyn Write,
) -> Result<CleanupOutcome, PhaseFailure> {
    let version = version_from_tag(request.current_version).to_owned();

    let last = settings
        .last_cleaned_version()
        .in_phase(CleanupPhase::NotStarted)?;
    if !request.force && !should_run(&version, last.as_deref()) {
        log::info!("cleanup already complete for {version}");
        return Ok(CleanupOutcome::AlreadyComplete { version });
    }

    let phase = CleanupPhase::FetchingReleases;
    progress(request, stderr, phase);
    let releases = source
        .list_releases(request.owner, request.repo, request.force_refresh)
        .in_phase(phase)?;
    let (current, previous) = pick_releases(request, &releases).in_phase(phase)?;

    let obsolete = match previous {
        None => {
            log::info!("no release precedes {version}; nothing to compare");
            ObsoleteFileSet::default()
        }
        Some((previous, previous_asset)) => {
            let phase = CleanupPhase::Downloading;
            progress(request, stderr, phase);
            let scratch = scratch_dir(request.scratch_root, "loader-cleanup-")
                .map_err(|source| CleanupError::Scratch {
                    path: request.scratch_root.to_path_buf(),
                    source,
                })
                .in_phase(phase)?;
            let current_archive =
                fetch_archive(source, current.0, current.1, scratch.path()).in_phase(phase)?;
            let previous_archive =
                fetch_archive(source, previous, previous_asset, scratch.path()).in_phase(phase)?;

            let phase = CleanupPhase::Diffing;
            progress(request, stderr, phase);
            let current_entries = list_entries(&current_archive).in_phase(phase)?;
            let previous_entries = list_entries(&previous_archive).in_phase(phase)?;
            obsolete_entries(&previous_entries, &current_entries)
        }
    };
    log::info!("{} obsolete paths", obsolete.len());

    let phase = CleanupPhase::Deleting;
    progress(request, stderr, phase);
    let report = remove_obsolete(request.game_dir, &obsolete, remover);
    for failure in report.failures() {
        if let DeletionStatus::Failed(reason) = &failure.status
            && !request.quiet
        {
            write_stderr_line(
                stderr,
                format!("  could not delete {}: {reason}", failure.path.display()),
            );
        }
    }
    settings.set_last_cleaned_version(&version).in_phase(phase)?;
    log::info!("cleanup complete for {version}: {report}");

    Ok(CleanupOutcome::Completed {
        version,
        previous: previous.map(|(release, _)| release.version().to_owned()),
        report,
    })
}

type ReleaseAsset<'a> = (&'a Release, &'a Asset);

/// Pick the current release, the release it replaced, and their assets.
fn pick_releases<'a>(
    request: &CleanupRequest<'_>,
    releases: &'a [Release],
) -> Result<(ReleaseAsset<'a>, Option<ReleaseAsset<'a>>), SelectionError> {
    let current = select_release(releases, Some(request.current_version))?;
    let previous = match request.previous_version {
        Some(version) => Some(select_release(releases, Some(version))?),
        None => preceding_release(releases, request.current_version)?,
    };
    let current = (current, current.require_asset(request.asset)?);
    let previous = previous
        .map(|release| release.require_asset(request.asset).map(|asset| (release, asset)))
        .transpose()?;
    Ok((current, previous))
}

/// Download and stage one release archive as `<version>-<asset name>`.
fn fetch_archive(
    source: &dyn ReleaseSource,
    release: &Release,
    asset: &Asset,
    scratch: &Path,
) -> Result<PathBuf, CleanupError> {
    let bytes = source.download(&asset.download_url, &mut NoProgress)?;
    validate_payload(&bytes)?;
    let file_name = format!("{}-{}", release.version(), asset.name);
    Ok(stage_payload(&bytes, scratch, &file_name)?)
}

fn progress(request: &CleanupRequest<'_>, stderr: &mut dyn Write, phase: CleanupPhase) {
    log::info!("cleanup phase: {phase}");
    if !request.quiet {
        write_stderr_line(stderr, format!("Cleanup: {phase}..."));
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
