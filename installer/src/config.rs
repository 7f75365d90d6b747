//! Installer configuration loaded from TOML.
//!
//! Settings that rarely change between runs (where releases are published,
//! which asset to pick, what a finished install looks like) live in a
//! `config.toml`. Every field is optional; omitted values fall back to the
//! defaults below, and command-line flags override whatever the file says.
//!
//! ```toml
//! game_dir = "C:/Games/Example"
//!
//! [release]
//! owner = "LavaGang"
//! repo = "MelonLoader"
//! asset = { suffix = "x64.zip" }
//!
//! [markers]
//! directory = "MelonLoader"
//! files = ["version.dll", "winmm.dll"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dirs::BaseDirs;
use crate::release::AssetSelector;
use crate::verification::InstallMarkers;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "LOADER_INSTALLER_CONFIG";

const CONFIG_FILENAME: &str = "config.toml";

/// Top-level installer configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    /// Where releases are published and which asset to download.
    pub release: ReleaseConfig,
    /// Paths expected after a successful install.
    pub markers: InstallMarkers,
    /// Game directory used when none is given on the command line.
    pub game_dir: Option<PathBuf>,
    /// Root for scratch directories; the system temporary directory when
    /// omitted.
    pub scratch_dir: Option<PathBuf>,
}

/// Release publication settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Owner of the repository publishing the loader.
    pub owner: String,
    /// Repository publishing the loader.
    pub repo: String,
    /// Rule picking the archive asset from a release.
    pub asset: AssetSelector,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            owner: "LavaGang".to_owned(),
            repo: "MelonLoader".to_owned(),
            asset: AssetSelector::Suffix("x64.zip".to_owned()),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`InstallerConfig`].
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// The configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Where the configuration came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigLocation {
    /// Named on the command line or in [`CONFIG_ENV`]; must exist.
    Explicit(PathBuf),
    /// The per-user default; may be absent.
    Default(PathBuf),
    /// No configuration directory could be determined.
    None,
}

impl ConfigLocation {
    /// Resolve the configuration location.
    ///
    /// Precedence: `explicit`, then [`CONFIG_ENV`], then
    /// `<config_dir>/config.toml`.
    #[must_use]
    pub fn resolve(explicit: Option<&Path>, dirs: &dyn BaseDirs) -> Self {
        if let Some(path) = explicit {
            return Self::Explicit(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
            return Self::Explicit(PathBuf::from(path));
        }
        dirs.config_dir()
            .map_or(Self::None, |dir| Self::Default(dir.join(CONFIG_FILENAME)))
    }
}

impl InstallerConfig {
    /// Load configuration from the resolved location.
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a file exists but cannot be read or
    /// parsed, or when an explicit file is missing.
    pub fn load(location: &ConfigLocation) -> Result<Self, ConfigError> {
        match location {
            ConfigLocation::Explicit(path) => Self::from_file(path),
            ConfigLocation::Default(path) if path.exists() => Self::from_file(path),
            ConfigLocation::Default(path) => {
                log::debug!("no config file at {}; using defaults", path.display());
                Ok(Self::default())
            }
            ConfigLocation::None => Ok(Self::default()),
        }
    }

    /// Parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Root directory for scratch space.
    #[must_use]
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirs::MockBaseDirs;
    use rstest::rstest;

    fn dirs_with_config(dir: Option<&Path>) -> MockBaseDirs {
        let dir = dir.map(Path::to_path_buf);
        let mut dirs = MockBaseDirs::new();
        dirs.expect_config_dir().returning(move || dir.clone());
        dirs
    }

    #[rstest]
    fn defaults_target_melonloader() {
        let config = InstallerConfig::default();

        assert_eq!(config.release.owner, "LavaGang");
        assert_eq!(config.release.repo, "MelonLoader");
        assert!(config.release.asset.matches("MelonLoader.x64.zip"));
        assert!(!config.release.asset.matches("MelonLoader.x86.zip"));
        assert_eq!(config.markers, InstallMarkers::default());
        assert!(config.game_dir.is_none());
    }

    #[rstest]
    fn deserialises_overrides_from_toml() {
        let source = concat!(
            "game_dir = \"/games/example\"\n",
            "[release]\n",
            "owner = \"BepInEx\"\n",
            "asset = { contains = \"win_x64\" }\n",
            "[markers]\n",
            "directory = \"BepInEx\"\n",
            "files = [\"winhttp.dll\"]\n",
        );

        let config = toml::from_str::<InstallerConfig>(source)
            .expect("expected configuration to parse successfully");

        assert_eq!(config.release.owner, "BepInEx");
        assert_eq!(config.release.repo, "MelonLoader");
        assert_eq!(
            config.release.asset,
            AssetSelector::Contains("win_x64".to_owned())
        );
        assert_eq!(config.markers.directory, "BepInEx");
        assert_eq!(config.game_dir, Some(PathBuf::from("/games/example")));
    }

    #[rstest]
    #[case::top_level("unexpected = true\n")]
    #[case::release_table("[release]\nmirror = \"x\"\n")]
    #[case::asset_kind("[release]\nasset = { prefix = \"x\" }\n")]
    fn rejects_unknown_fields(#[case] source: &str) {
        let outcome: Result<InstallerConfig, _> = toml::from_str(source);

        assert!(outcome.is_err(), "expected a parse error for {source:?}");
    }

    #[rstest]
    fn explicit_path_wins_over_environment() {
        let dirs = dirs_with_config(Some(Path::new("/config")));
        temp_env::with_var(CONFIG_ENV, Some("/env/config.toml"), || {
            assert_eq!(
                ConfigLocation::resolve(Some(Path::new("/cli/config.toml")), &dirs),
                ConfigLocation::Explicit(PathBuf::from("/cli/config.toml"))
            );
        });
    }

    #[rstest]
    fn environment_wins_over_default() {
        let dirs = dirs_with_config(Some(Path::new("/config")));
        temp_env::with_var(CONFIG_ENV, Some("/env/config.toml"), || {
            assert_eq!(
                ConfigLocation::resolve(None, &dirs),
                ConfigLocation::Explicit(PathBuf::from("/env/config.toml"))
            );
        });
    }

    #[rstest]
    #[case::with_config_dir(Some("/config"), ConfigLocation::Default(PathBuf::from("/config").join(CONFIG_FILENAME)))]
    #[case::without_config_dir(None, ConfigLocation::None)]
    fn falls_back_to_config_dir(#[case] dir: Option<&str>, #[case] expected: ConfigLocation) {
        let dirs = dirs_with_config(dir.map(Path::new));
        temp_env::with_var_unset(CONFIG_ENV, || {
            assert_eq!(ConfigLocation::resolve(None, &dirs), expected);
        });
    }

    #[rstest]
    fn missing_default_file_yields_defaults() {
        let temp = tempfile::tempdir().expect("temp dir");
        let location = ConfigLocation::Default(temp.path().join(CONFIG_FILENAME));

        let config = InstallerConfig::load(&location).expect("defaults");

        assert_eq!(config, InstallerConfig::default());
    }

    #[rstest]
    fn missing_explicit_file_is_an_error() {
        let temp = tempfile::tempdir().expect("temp dir");
        let location = ConfigLocation::Explicit(temp.path().join("absent.toml"));

        assert!(matches!(
            InstallerConfig::load(&location),
            Err(ConfigError::Read { .. })
        ));
    }

    #[rstest]
    fn invalid_file_names_path() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[release]\nowner = 7\n").expect("write config");

        let err = InstallerConfig::load(&ConfigLocation::Default(path.clone()))
            .expect_err("expected a parse error");

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[rstest]
    fn scratch_root_defaults_to_temp_dir() {
        let mut config = InstallerConfig::default();
        assert_eq!(config.scratch_root(), std::env::temp_dir());

        config.scratch_dir = Some(PathBuf::from("/var/scratch"));
        assert_eq!(config.scratch_root(), PathBuf::from("/var/scratch"));
    }
}
