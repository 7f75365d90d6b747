//! Error types for the loader installer CLI.
//!
//! Library pipelines report failures as outcome values; this module turns
//! the ones that end a command into a single error the binary prints before
//! exiting with a non-zero status. Where the user can fix the problem, the
//! message says how.

use std::path::PathBuf;

use thiserror::Error;

use crate::artefact::entries::EntryListError;
use crate::cleanup::CleanupPhase;
use crate::config::ConfigError;
use crate::settings::SettingsError;

/// Errors that end an installer command.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The settings store could not be opened.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// No game directory was given and none is configured.
    #[error("no game directory given; pass --game-dir or set game_dir in the config file")]
    MissingGameDir,

    /// The game directory does not exist.
    #[error("game directory {path} does not exist")]
    GameDirNotFound {
        /// The directory that was expected.
        path: PathBuf,
    },

    /// The install pipeline reported a failure.
    #[error("install failed: {reason}")]
    InstallFailed {
        /// Reason reported by the pipeline.
        reason: String,
    },

    /// The cleanup pipeline reported a failure.
    #[error("cleanup failed while {phase}: {reason}; it will be retried on the next run")]
    CleanupFailed {
        /// Phase that was running.
        phase: CleanupPhase,
        /// Reason reported by the pipeline.
        reason: String,
    },

    /// A local archive could not be listed.
    #[error(transparent)]
    Entries(#[from] EntryListError),

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
