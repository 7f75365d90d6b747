//! Persisted settings holding the cleanup completion marker.
//!
//! The marker is the only durable state the installer owns: the last
//! version for which the cleanup routine ran to completion. It lives in a
//! small JSON document at `<data_dir>/settings.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dirs::BaseDirs;

const SETTINGS_FILENAME: &str = "settings.json";

/// Key-value store for the cleanup completion marker.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore {
    /// Return the last version for which cleanup completed, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn last_cleaned_version(&self) -> Result<Option<String>, SettingsError>;

    /// Record `version` as the last version for which cleanup completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn set_last_cleaned_version(&self, version: &str) -> Result<(), SettingsError>;
}

/// Settings document stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Last version for which cleanup completed.
    #[serde(default)]
    pub last_cleaned_version: Option<String>,
}

/// Errors that prevent settings persistence.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The data directory could not be resolved.
    #[error("could not determine the data directory")]
    MissingDataDirectory,

    /// Reading the settings file failed.
    #[error("failed to read settings file {path}: {source}")]
    Read {
        /// File path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serializing settings failed.
    #[error("failed to serialize settings: {source}")]
    Serialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing the settings file failed.
    #[error("failed to write settings file {path}: {source}")]
    Write {
        /// File path that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// [`SettingsStore`] persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    /// Store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/settings.json`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingDataDirectory`] when the data
    /// directory cannot be determined.
    pub fn in_data_dir(dirs: &dyn BaseDirs) -> Result<Self, SettingsError> {
        let data_dir = dirs
            .data_dir()
            .ok_or(SettingsError::MissingDataDirectory)?;
        Ok(Self::new(data_dir.join(SETTINGS_FILENAME)))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the settings document.
    ///
    /// A missing file yields defaults. A malformed file is logged and
    /// treated as defaults so the next write replaces it.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Read`] if the file exists but cannot be read.
    pub fn load(&self) -> Result<Settings, SettingsError> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|source| SettingsError::Read {
                path: self.path.clone(),
                source,
            })?;

        match serde_json::from_str::<Settings>(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                log::warn!(
                    "ignoring malformed settings file {}: {e}",
                    self.path.display()
                );
                Ok(Settings::default())
            }
        }
    }

    /// Persist the settings document atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory, temporary file, or rename fails.
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let write_error = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }

        let json = serde_json::to_string_pretty(settings)
            .map_err(|source| SettingsError::Serialize { source })?;
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, json).map_err(write_error)?;
        std::fs::rename(&temp_path, &self.path).map_err(write_error)?;
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn last_cleaned_version(&self) -> Result<Option<String>, SettingsError> {
        Ok(self.load()?.last_cleaned_version)
    }

    fn set_last_cleaned_version(&self, version: &str) -> Result<(), SettingsError> {
        let mut settings = self.load()?;
        settings.last_cleaned_version = Some(version.to_owned());
        self.save(&settings)
    }
}
