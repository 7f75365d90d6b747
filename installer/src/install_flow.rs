//! Command handlers for the installer binary.
//!
//! This module resolves command-line and configuration settings into the
//! library's pipeline inputs, wires in the production collaborators, and
//! turns pipeline outcomes into user-facing output.

use camino::Utf8Path;
use loader_installer::artefact::download::{GithubReleaseSource, ProgressSink};
use loader_installer::artefact::entries::{ArchiveEntryPath, list_entries};
use loader_installer::artefact::extraction::ZipExtractor;
use loader_installer::cleanup::{
    CleanupOutcome, CleanupRequest, StdFileRemover, run_cleanup_with,
};
use loader_installer::cli::{CleanupArgs, DiffArgs, InstallArgs, SourceArgs};
use loader_installer::config::InstallerConfig;
use loader_installer::diff::obsolete_entries;
use loader_installer::dirs::BaseDirs;
use loader_installer::error::{InstallerError, Result};
use loader_installer::install::{InstallConfig, InstallOutcome, install_release_with};
use loader_installer::output::{
    DryRunInfo, cleanup_details, cleanup_summary, install_success_message, write_stderr_line,
};
use loader_installer::settings::JsonSettingsStore;
use std::io::Write;
use std::path::PathBuf;

/// Reports download progress to stderr in ten-percent steps.
struct StepProgress {
    quiet: bool,
    last_step: Option<u64>,
}

impl StepProgress {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            last_step: None,
        }
    }
}

impl ProgressSink for StepProgress {
    fn report(&mut self, received: u64, total: Option<u64>) {
        let Some(total) = total.filter(|total| *total > 0) else {
            return;
        };
        let step = received.saturating_mul(10) / total;
        if self.quiet || self.last_step == Some(step) {
            return;
        }
        self.last_step = Some(step);
        write_stderr_line(&mut std::io::stderr(), format!("  {}%", step * 10));
    }
}

/// Pick the game directory from the command line or configuration.
pub(crate) fn resolve_game_dir(args: &SourceArgs, config: &InstallerConfig) -> Result<PathBuf> {
    let game_dir = args
        .game_dir
        .as_deref()
        .map(|dir| dir.as_std_path().to_path_buf())
        .or_else(|| config.game_dir.clone())
        .ok_or(InstallerError::MissingGameDir)?;
    if !game_dir.is_dir() {
        return Err(InstallerError::GameDirNotFound { path: game_dir });
    }
    Ok(game_dir)
}

/// Pick the scratch root from the command line or configuration.
pub(crate) fn resolve_scratch_root(args: &SourceArgs, config: &InstallerConfig) -> PathBuf {
    args.scratch_dir.as_deref().map_or_else(
        || config.scratch_root(),
        |dir| dir.as_std_path().to_path_buf(),
    )
}

/// Run the `install` command.
pub(crate) fn run_install(
    args: &InstallArgs,
    config: &InstallerConfig,
    quiet: bool,
    stderr: &mut dyn Write,
) -> Result<()> {
    let game_dir = resolve_game_dir(&args.source, config)?;
    let scratch_root = resolve_scratch_root(&args.source, config);

    if args.dry_run {
        let info = DryRunInfo {
            repository: format!("{}/{}", config.release.owner, config.release.repo),
            version: args.version.as_deref(),
            asset: config.release.asset.to_string(),
            game_dir: &game_dir,
            scratch_root: &scratch_root,
            markers: format!(
                "{}/ + {}",
                config.markers.directory,
                config.markers.files.join("|")
            ),
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(());
    }

    let install_config = InstallConfig {
        owner: &config.release.owner,
        repo: &config.release.repo,
        version: args.version.as_deref(),
        asset: &config.release.asset,
        game_dir: &game_dir,
        scratch_root: &scratch_root,
        markers: &config.markers,
        force_refresh: args.source.refresh,
        quiet,
    };
    let mut progress = StepProgress::new(quiet);
    let outcome = install_release_with(
        &install_config,
        &GithubReleaseSource::default(),
        &ZipExtractor,
        &mut progress,
        stderr,
    );

    match outcome {
        InstallOutcome::Installed { version, files } => {
            if !quiet {
                write_stderr_line(stderr, install_success_message(&version, files, &game_dir));
            }
            Ok(())
        }
        InstallOutcome::Failed { reason } => Err(InstallerError::InstallFailed { reason }),
    }
}

/// Run the `cleanup` command.
pub(crate) fn run_cleanup(
    args: &CleanupArgs,
    config: &InstallerConfig,
    dirs: &dyn BaseDirs,
    quiet: bool,
    stderr: &mut dyn Write,
) -> Result<()> {
    let game_dir = resolve_game_dir(&args.source, config)?;
    let scratch_root = resolve_scratch_root(&args.source, config);
    let settings = JsonSettingsStore::in_data_dir(dirs)?;

    let request = CleanupRequest {
        owner: &config.release.owner,
        repo: &config.release.repo,
        current_version: &args.current,
        previous_version: args.previous.as_deref(),
        asset: &config.release.asset,
        game_dir: &game_dir,
        scratch_root: &scratch_root,
        force: args.force,
        force_refresh: args.source.refresh,
        quiet,
    };
    let outcome = run_cleanup_with(
        &request,
        &GithubReleaseSource::default(),
        &settings,
        &StdFileRemover,
        stderr,
    );
    report_cleanup(&outcome, quiet, stderr);

    match outcome {
        CleanupOutcome::Failed { phase, reason } => {
            Err(InstallerError::CleanupFailed { phase, reason })
        }
        CleanupOutcome::AlreadyComplete { .. } | CleanupOutcome::Completed { .. } => Ok(()),
    }
}

fn report_cleanup(outcome: &CleanupOutcome, quiet: bool, stderr: &mut dyn Write) {
    if quiet {
        return;
    }
    for line in cleanup_details(outcome) {
        write_stderr_line(stderr, line);
    }
    if let Some(summary) = cleanup_summary(outcome) {
        write_stderr_line(stderr, summary);
    }
}

/// Run the `diff` command, printing one obsolete path per line.
pub(crate) fn run_diff(args: &DiffArgs, stdout: &mut dyn Write) -> Result<()> {
    let previous = list_archive(&args.previous)?;
    let current = list_archive(&args.current)?;
    for entry in &obsolete_entries(&previous, &current) {
        writeln!(stdout, "{entry}").map_err(|source| InstallerError::WriteFailed { source })?;
    }
    Ok(())
}

fn list_archive(path: &Utf8Path) -> Result<Vec<ArchiveEntryPath>> {
    Ok(list_entries(path.as_std_path())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use loader_installer::test_utils::write_zip;
    use rstest::rstest;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::try_from(path.to_path_buf()).expect("UTF-8 path")
    }

    #[rstest]
    fn cli_game_dir_overrides_config() {
        let temp = tempfile::tempdir().expect("temp dir");
        let args = SourceArgs {
            game_dir: Some(utf8(temp.path())),
            ..SourceArgs::default()
        };
        let config = InstallerConfig {
            game_dir: Some(PathBuf::from("/configured/game")),
            ..InstallerConfig::default()
        };

        let game_dir = resolve_game_dir(&args, &config).expect("game dir");
        assert_eq!(game_dir, temp.path());
    }

    #[rstest]
    fn config_game_dir_is_used_without_flag() {
        let temp = tempfile::tempdir().expect("temp dir");
        let config = InstallerConfig {
            game_dir: Some(temp.path().to_path_buf()),
            ..InstallerConfig::default()
        };

        let game_dir = resolve_game_dir(&SourceArgs::default(), &config).expect("game dir");
        assert_eq!(game_dir, temp.path());
    }

    #[rstest]
    fn missing_game_dir_is_reported() {
        let err = resolve_game_dir(&SourceArgs::default(), &InstallerConfig::default())
            .expect_err("expected missing game dir");
        assert!(matches!(err, InstallerError::MissingGameDir));
    }

    #[rstest]
    fn nonexistent_game_dir_is_reported() {
        let temp = tempfile::tempdir().expect("temp dir");
        let args = SourceArgs {
            game_dir: Some(utf8(&temp.path().join("absent"))),
            ..SourceArgs::default()
        };
        let err = resolve_game_dir(&args, &InstallerConfig::default())
            .expect_err("expected missing game dir");
        assert!(matches!(err, InstallerError::GameDirNotFound { .. }));
    }

    #[rstest]
    fn scratch_flag_overrides_config() {
        let args = SourceArgs {
            scratch_dir: Some(Utf8PathBuf::from("/flag/scratch")),
            ..SourceArgs::default()
        };
        let config = InstallerConfig {
            scratch_dir: Some(PathBuf::from("/config/scratch")),
            ..InstallerConfig::default()
        };
        assert_eq!(
            resolve_scratch_root(&args, &config),
            PathBuf::from("/flag/scratch")
        );
        assert_eq!(
            resolve_scratch_root(&SourceArgs::default(), &config),
            PathBuf::from("/config/scratch")
        );
    }

    #[rstest]
    fn dry_run_describes_plan_without_network() {
        let temp = tempfile::tempdir().expect("temp dir");
        let args = InstallArgs {
            source: SourceArgs {
                game_dir: Some(utf8(temp.path())),
                ..SourceArgs::default()
            },
            version: Some("0.6.1".to_owned()),
            dry_run: true,
        };
        let mut stderr = Vec::new();

        run_install(&args, &InstallerConfig::default(), false, &mut stderr).expect("dry run");

        let text = String::from_utf8(stderr).expect("utf8 stderr");
        assert!(text.contains("Dry run"));
        assert!(text.contains("LavaGang/MelonLoader"));
        assert!(text.contains("Version: 0.6.1"));
        assert!(text.contains("*x64.zip"));
    }

    #[rstest]
    fn diff_prints_obsolete_entries() {
        let temp = tempfile::tempdir().expect("temp dir");
        let previous = write_zip(
            temp.path(),
            "old.zip",
            &[("A/x.dll", "x"), ("A/y.dll", "y"), ("B/z.cfg", "z")],
        );
        let current = write_zip(temp.path(), "new.zip", &[("A/x.dll", "x"), ("B/z.cfg", "z")]);
        let args = DiffArgs {
            previous: utf8(&previous),
            current: utf8(&current),
        };
        let mut stdout = Vec::new();

        run_diff(&args, &mut stdout).expect("diff");

        assert_eq!(String::from_utf8(stdout).expect("utf8 stdout"), "A/y.dll\n");
    }

    #[rstest]
    fn diff_reports_unreadable_archive() {
        let temp = tempfile::tempdir().expect("temp dir");
        let args = DiffArgs {
            previous: utf8(&temp.path().join("missing.zip")),
            current: utf8(&temp.path().join("missing.zip")),
        };
        let mut stdout = Vec::new();

        let err = run_diff(&args, &mut stdout).expect_err("expected failure");
        assert!(matches!(err, InstallerError::Entries(_)));
    }

    #[rstest]
    #[case::unknown_total(None, false)]
    #[case::quiet(Some(100), true)]
    fn progress_ignores_unusable_reports(#[case] total: Option<u64>, #[case] quiet: bool) {
        let mut progress = StepProgress::new(quiet);
        progress.report(50, total);
        assert_eq!(progress.last_step, None);
    }

    #[rstest]
    fn progress_tracks_steps() {
        let mut progress = StepProgress::new(false);
        progress.report(55, Some(100));
        assert_eq!(progress.last_step, Some(5));
    }
}
