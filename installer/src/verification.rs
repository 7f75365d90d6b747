//! Post-install marker verification.
//!
//! A successful extraction does not prove a working install. The loader
//! payload is known to produce a marker directory and at least one of a
//! small set of proxy files in the game root; the install is only reported
//! successful when both are present.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Paths the installed payload is expected to produce.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallMarkers {
    /// Directory that must exist under the game directory.
    pub directory: String,
    /// Files of which at least one must exist under the game directory.
    pub files: Vec<String>,
}

impl Default for InstallMarkers {
    fn default() -> Self {
        Self {
            directory: "MelonLoader".to_owned(),
            files: vec!["version.dll".to_owned(), "winmm.dll".to_owned()],
        }
    }
}

impl InstallMarkers {
    /// Check the markers under `target_dir`.
    ///
    /// # Examples
    ///
    /// ```
    /// use loader_installer::verification::InstallMarkers;
    ///
    /// let game = tempfile::tempdir().expect("temp dir");
    /// let markers = InstallMarkers::default();
    /// assert!(!markers.check(game.path()).is_satisfied());
    ///
    /// std::fs::create_dir(game.path().join("MelonLoader")).expect("marker dir");
    /// std::fs::write(game.path().join("winmm.dll"), b"proxy").expect("marker file");
    /// assert!(markers.check(game.path()).is_satisfied());
    /// ```
    #[must_use]
    pub fn check(&self, target_dir: &Path) -> MarkerCheck {
        let directory_present = target_dir.join(&self.directory).is_dir();
        let file_present = self
            .files
            .iter()
            .any(|file| target_dir.join(file).is_file());
        MarkerCheck {
            directory_present,
            file_present,
        }
    }
}

/// Result of a marker check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerCheck {
    /// The marker directory exists.
    pub directory_present: bool,
    /// At least one marker file exists.
    pub file_present: bool,
}

impl MarkerCheck {
    /// Return true when every condition holds.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.directory_present && self.file_present
    }
}

impl fmt::Display for MarkerCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.directory_present, self.file_present) {
            (true, true) => write!(f, "all install markers present"),
            (false, true) => write!(f, "marker directory missing"),
            (true, false) => write!(f, "no marker file present"),
            (false, false) => write!(f, "marker directory and marker files missing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::nothing(false, None, false)]
    #[case::directory_only(true, None, false)]
    #[case::file_only(false, Some("version.dll"), false)]
    #[case::directory_and_first_file(true, Some("version.dll"), true)]
    #[case::directory_and_second_file(true, Some("winmm.dll"), true)]
    fn requires_directory_and_one_file(
        #[case] with_directory: bool,
        #[case] file: Option<&str>,
        #[case] expected: bool,
    ) {
        let game = tempfile::tempdir().expect("temp dir");
        if with_directory {
            std::fs::create_dir(game.path().join("MelonLoader")).expect("marker dir");
        }
        if let Some(name) = file {
            std::fs::write(game.path().join(name), "proxy").expect("marker file");
        }

        let check = InstallMarkers::default().check(game.path());
        assert_eq!(check.is_satisfied(), expected, "{check}");
    }

    #[test]
    fn marker_file_must_be_a_file() {
        let game = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir(game.path().join("MelonLoader")).expect("marker dir");
        std::fs::create_dir(game.path().join("version.dll")).expect("decoy dir");

        let check = InstallMarkers::default().check(game.path());
        assert!(check.directory_present);
        assert!(!check.file_present);
    }

    #[test]
    fn display_names_missing_parts() {
        let check = MarkerCheck {
            directory_present: false,
            file_present: true,
        };
        assert_eq!(check.to_string(), "marker directory missing");
    }

    #[test]
    fn markers_deserialise_from_toml() {
        let markers: InstallMarkers =
            toml::from_str("directory = \"BepInEx\"\nfiles = [\"winhttp.dll\"]").expect("toml");
        assert_eq!(markers.directory, "BepInEx");
        assert_eq!(markers.files, vec!["winhttp.dll"]);
    }
}
