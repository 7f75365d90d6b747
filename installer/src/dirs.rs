//! Directory resolution abstraction for platform-specific paths.
//!
//! Wraps `directories-next` behind a trait so configuration and settings
//! lookups can be pointed at temporary directories in tests.

use std::path::PathBuf;

/// Application name used for per-user directories.
pub const APP_NAME: &str = "loader-installer";

/// Provider of per-user base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Directory holding the configuration file.
    ///
    /// - Linux: `~/.config/loader-installer`
    /// - macOS: `~/Library/Application Support/loader-installer`
    /// - Windows: `%APPDATA%\loader-installer\config`
    fn config_dir(&self) -> Option<PathBuf>;

    /// Directory holding persisted settings such as the cleanup marker.
    fn data_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by the platform conventions.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBaseDirs;

impl SystemBaseDirs {
    fn project_dirs() -> Option<directories_next::ProjectDirs> {
        directories_next::ProjectDirs::from("", "", APP_NAME)
    }
}

impl BaseDirs for SystemBaseDirs {
    fn config_dir(&self) -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn data_dir(&self) -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }
}
