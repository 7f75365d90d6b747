//! Output formatting for the installer CLI.
//!
//! User-facing text goes to stderr; stdout is reserved for machine-readable
//! output such as the `diff` listing.

use std::io::Write;
use std::path::Path;

use crate::cleanup::{CleanupOutcome, DeletionStatus};

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Format a success message after installation.
#[must_use]
pub fn install_success_message(version: &str, files: usize, game_dir: &Path) -> String {
    let plural = if files == 1 { "file" } else { "files" };
    format!(
        "Installed {version} ({files} {plural}) into {}",
        game_dir.display()
    )
}

/// Summarise a successful cleanup outcome.
///
/// Returns `None` for failed outcomes, which are reported as errors.
#[must_use]
pub fn cleanup_summary(outcome: &CleanupOutcome) -> Option<String> {
    match outcome {
        CleanupOutcome::AlreadyComplete { version } => {
            Some(format!("Cleanup already done for {version}"))
        }
        CleanupOutcome::Completed {
            version,
            previous: None,
            ..
        } => Some(format!(
            "No earlier release to compare with {version}; nothing to clean"
        )),
        CleanupOutcome::Completed {
            version,
            previous: Some(previous),
            report,
        } => Some(format!("Cleaned up after {previous} -> {version}: {report}")),
        CleanupOutcome::Failed { .. } => None,
    }
}

/// Lines describing each deleted or undeletable path of a cleanup.
#[must_use]
pub fn cleanup_details(outcome: &CleanupOutcome) -> Vec<String> {
    let CleanupOutcome::Completed { report, .. } = outcome else {
        return Vec::new();
    };
    report
        .outcomes
        .iter()
        .filter_map(|entry| match &entry.status {
            DeletionStatus::Deleted => Some(format!("  - deleted {}", entry.path.display())),
            DeletionStatus::Failed(reason) => Some(format!(
                "  ! kept {} ({reason})",
                entry.path.display()
            )),
            DeletionStatus::Missing => None,
        })
        .collect()
}

/// Configuration information for dry-run output.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Release repository as `owner/repo`.
    pub repository: String,
    /// Requested version; the newest release when `None`.
    pub version: Option<&'a str>,
    /// Asset selector in display form.
    pub asset: String,
    /// Target game directory.
    pub game_dir: &'a Path,
    /// Scratch root.
    pub scratch_root: &'a Path,
    /// Marker directory and files checked after extraction.
    pub markers: String,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    ///
    /// # Example
    ///
    /// ```
    /// use std::path::Path;
    /// use loader_installer::output::DryRunInfo;
    ///
    /// let info = DryRunInfo {
    ///     repository: "LavaGang/MelonLoader".to_owned(),
    ///     version: Some("0.6.1"),
    ///     asset: "*x64.zip".to_owned(),
    ///     game_dir: Path::new("/games/example"),
    ///     scratch_root: Path::new("/tmp"),
    ///     markers: "MelonLoader/ + version.dll|winmm.dll".to_owned(),
    /// };
    ///
    /// let output = info.display_text();
    /// assert!(output.contains("Dry run"));
    /// assert!(output.contains("0.6.1"));
    /// ```
    #[must_use]
    pub fn display_text(&self) -> String {
        [
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Repository: {}", self.repository),
            format!("Version: {}", self.version.unwrap_or("latest")),
            format!("Asset: {}", self.asset),
            format!("Game directory: {}", self.game_dir.display()),
            format!("Scratch root: {}", self.scratch_root.display()),
            format!("Markers: {}", self.markers),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::{CleanupPhase, CleanupReport, PathOutcome};
    use rstest::rstest;
    use std::path::PathBuf;

    fn completed(statuses: Vec<DeletionStatus>) -> CleanupOutcome {
        CleanupOutcome::Completed {
            version: "0.6.2".to_owned(),
            previous: Some("0.6.1".to_owned()),
            report: CleanupReport {
                outcomes: statuses
                    .into_iter()
                    .enumerate()
                    .map(|(index, status)| PathOutcome {
                        path: PathBuf::from(format!("/game/file{index}.dll")),
                        status,
                    })
                    .collect(),
            },
        }
    }

    #[rstest]
    #[case::singular(1, "(1 file)")]
    #[case::plural(5, "(5 files)")]
    fn install_message_pluralises_correctly(#[case] files: usize, #[case] expected: &str) {
        let msg = install_success_message("0.6.1", files, Path::new("/game"));
        assert!(msg.contains(expected), "{msg}");
        assert!(msg.contains("0.6.1"));
    }

    #[test]
    fn summary_counts_deletions() {
        let outcome = completed(vec![
            DeletionStatus::Deleted,
            DeletionStatus::Missing,
            DeletionStatus::Failed("locked".to_owned()),
        ]);
        assert_eq!(
            cleanup_summary(&outcome).as_deref(),
            Some("Cleaned up after 0.6.1 -> 0.6.2: 1 deleted, 1 already absent, 1 failed")
        );
    }

    #[test]
    fn summary_skips_failures() {
        let outcome = CleanupOutcome::Failed {
            phase: CleanupPhase::Diffing,
            reason: "bad archive".to_owned(),
        };
        assert_eq!(cleanup_summary(&outcome), None);
        assert!(cleanup_details(&outcome).is_empty());
    }

    #[test]
    fn details_list_deleted_and_kept_paths() {
        let outcome = completed(vec![
            DeletionStatus::Deleted,
            DeletionStatus::Missing,
            DeletionStatus::Failed("locked".to_owned()),
        ]);
        let details = cleanup_details(&outcome);
        assert_eq!(details.len(), 2);
        assert!(details[0].contains("deleted"));
        assert!(details[1].contains("locked"));
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }
}
