//! CLI argument definitions for the loader installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};

/// Install a runtime mod loader into a game directory.
#[derive(Parser, Debug)]
#[command(name = "loader-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install a runtime mod loader into a game directory.\n\n",
    "The installer downloads a release archive of the loader, checks that it is ",
    "a complete zip file, extracts it over the game directory, and confirms the ",
    "loader's marker files are in place.\n\n",
    "After an upgrade, `cleanup` removes files the previous release shipped that ",
    "the new release no longer does. It runs at most once per installed version.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install the newest release:\n",
    "    $ loader-installer install --game-dir ~/Games/Example\n\n",
    "  Install a specific release:\n",
    "    $ loader-installer install -g ~/Games/Example --version 0.6.1\n\n",
    "  Remove files left over from the previous release:\n",
    "    $ loader-installer cleanup -g ~/Games/Example --current 0.6.2\n\n",
    "  Show what an upgrade would make obsolete:\n",
    "    $ loader-installer diff old.zip new.zip\n\n",
    "ENVIRONMENT:\n",
    "  LOADER_INSTALLER_CONFIG   Path to the configuration file\n",
    "  LOADER_INSTALLER_LOG      Log filter, e.g. `debug` or `loader_installer=trace`",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file [default: platform-specific].
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet",
        global = true
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity", global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download and install a loader release.
    Install(InstallArgs),

    /// Remove files left behind by the release the current one replaced.
    Cleanup(CleanupArgs),

    /// List files one local archive ships that another no longer does.
    Diff(DiffArgs),
}

/// Options shared by commands that fetch releases.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Game installation directory [default: from config].
    #[arg(short, long, value_name = "DIR")]
    pub game_dir: Option<Utf8PathBuf>,

    /// Directory for temporary downloads [default: system temp].
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<Utf8PathBuf>,

    /// Ignore any cached release listing.
    #[arg(long)]
    pub refresh: bool,
}

/// Arguments for the install command.
#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Shared release options.
    #[command(flatten)]
    pub source: SourceArgs,

    /// Release version to install [default: newest].
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Show configuration and exit without downloading.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the cleanup command.
#[derive(Args, Debug, Clone, Default)]
pub struct CleanupArgs {
    /// Shared release options.
    #[command(flatten)]
    pub source: SourceArgs,

    /// Version currently installed.
    #[arg(long, value_name = "VERSION")]
    pub current: String,

    /// Version being replaced [default: the release before --current].
    #[arg(long, value_name = "VERSION")]
    pub previous: Option<String>,

    /// Run even if cleanup already completed for this version.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the diff command.
#[derive(Args, Debug, Clone)]
pub struct DiffArgs {
    /// Archive of the older release.
    #[arg(value_name = "PREVIOUS")]
    pub previous: Utf8PathBuf,

    /// Archive of the newer release.
    #[arg(value_name = "CURRENT")]
    pub current: Utf8PathBuf,
}

impl Cli {
    /// Returns the shared release options of the active command, if any.
    #[must_use]
    pub fn source_args(&self) -> Option<&SourceArgs> {
        match &self.command {
            Command::Install(args) => Some(&args.source),
            Command::Cleanup(args) => Some(&args.source),
            Command::Diff(_) => None,
        }
    }

    /// Returns the explicitly requested configuration file.
    #[must_use]
    pub fn config_path(&self) -> Option<&Utf8Path> {
        self.config.as_deref()
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
