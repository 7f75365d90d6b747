//! Release and asset model with version and asset selection.
//!
//! Releases are transient values produced by a
//! [`ReleaseSource`](crate::artefact::download::ReleaseSource) listing. The
//! helpers here pick the release matching a requested version, the release
//! preceding it, and the asset matching a naming pattern.

use std::fmt;

use serde::Deserialize;

/// A tagged publication with its downloadable assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Release tag as published, possibly carrying a leading `v`.
    pub tag: String,
    /// Downloadable assets in the order the source lists them.
    pub assets: Vec<Asset>,
}

/// A single named downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// File name of the asset.
    pub name: String,
    /// URL the asset bytes are served from.
    pub download_url: String,
}

impl Release {
    /// Return the release version with any leading `v`/`V` removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use loader_installer::release::Release;
    ///
    /// let release = Release { tag: "v0.6.1".to_owned(), assets: Vec::new() };
    /// assert_eq!(release.version(), "0.6.1");
    /// ```
    #[must_use]
    pub fn version(&self) -> &str {
        version_from_tag(&self.tag)
    }

    /// Find the first asset accepted by `selector`.
    #[must_use]
    pub fn find_asset(&self, selector: &AssetSelector) -> Option<&Asset> {
        self.assets.iter().find(|asset| selector.matches(&asset.name))
    }

    /// Like [`Self::find_asset`], failing with [`SelectionError::AssetNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::AssetNotFound`] when no asset matches.
    pub fn require_asset(&self, selector: &AssetSelector) -> Result<&Asset, SelectionError> {
        self.find_asset(selector)
            .ok_or_else(|| SelectionError::AssetNotFound {
                tag: self.tag.clone(),
                pattern: selector.to_string(),
            })
    }
}

/// Asset naming rule used to pick an archive from a release.
///
/// Matching is ASCII case-insensitive. In configuration files a selector is
/// written as `{ suffix = ".zip" }` or `{ contains = "x64" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetSelector {
    /// The asset name contains the pattern, e.g. a platform-specific name.
    Contains(String),
    /// The asset name ends with the suffix, e.g. `.zip`.
    Suffix(String),
}

impl AssetSelector {
    /// Return true when `name` satisfies this selector.
    ///
    /// # Examples
    ///
    /// ```
    /// use loader_installer::release::AssetSelector;
    ///
    /// assert!(AssetSelector::Suffix(".zip".to_owned()).matches("Loader.x64.ZIP"));
    /// assert!(AssetSelector::Contains("x64".to_owned()).matches("Loader.x64.zip"));
    /// assert!(!AssetSelector::Contains("x86".to_owned()).matches("Loader.x64.zip"));
    /// ```
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        match self {
            Self::Contains(pattern) => name.contains(&pattern.to_ascii_lowercase()),
            Self::Suffix(suffix) => name.ends_with(&suffix.to_ascii_lowercase()),
        }
    }
}

impl Default for AssetSelector {
    /// Any zip archive.
    fn default() -> Self {
        Self::Suffix(".zip".to_owned())
    }
}

impl fmt::Display for AssetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains(pattern) => write!(f, "*{pattern}*"),
            Self::Suffix(suffix) => write!(f, "*{suffix}"),
        }
    }
}

/// Errors raised when no release or asset matches the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// No release carries the requested version.
    #[error("release {version} not found")]
    ReleaseNotFound {
        /// The requested version, prefix stripped.
        version: String,
    },

    /// The source returned no releases at all.
    #[error("no releases published")]
    NoReleases,

    /// The release has no asset matching the naming pattern.
    #[error("release {tag} has no asset matching {pattern}")]
    AssetNotFound {
        /// Tag of the release that was searched.
        tag: String,
        /// Display form of the selector.
        pattern: String,
    },
}

/// Strip a leading `v` or `V` version prefix from a release tag.
#[must_use]
pub fn version_from_tag(tag: &str) -> &str {
    let trimmed = tag.trim();
    trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed)
}

/// Compare two versions ignoring the `v` prefix and ASCII case.
///
/// # Examples
///
/// ```
/// use loader_installer::release::versions_match;
///
/// assert!(versions_match("v0.6.1", "0.6.1"));
/// assert!(versions_match("0.6.1-RC1", "V0.6.1-rc1"));
/// assert!(!versions_match("0.6.1", "0.6.2"));
/// ```
#[must_use]
pub fn versions_match(left: &str, right: &str) -> bool {
    version_from_tag(left).eq_ignore_ascii_case(version_from_tag(right))
}

/// Pick the release for `version`, or the first listed release when `None`.
///
/// # Errors
///
/// Returns [`SelectionError::ReleaseNotFound`] when the version is absent
/// and [`SelectionError::NoReleases`] when the listing is empty.
pub fn select_release<'a>(
    releases: &'a [Release],
    version: Option<&str>,
) -> Result<&'a Release, SelectionError> {
    match version {
        Some(wanted) => releases
            .iter()
            .find(|release| versions_match(&release.tag, wanted))
            .ok_or_else(|| SelectionError::ReleaseNotFound {
                version: version_from_tag(wanted).to_owned(),
            }),
        None => releases.first().ok_or(SelectionError::NoReleases),
    }
}

/// Return the release listed immediately after `current`.
///
/// Sources list newest first, so this is the release that `current`
/// superseded. Returns `Ok(None)` when `current` is the oldest release.
///
/// # Errors
///
/// Returns [`SelectionError::ReleaseNotFound`] when `current` is not listed.
pub fn preceding_release<'a>(
    releases: &'a [Release],
    current: &str,
) -> Result<Option<&'a Release>, SelectionError> {
    let position = releases
        .iter()
        .position(|release| versions_match(&release.tag, current))
        .ok_or_else(|| SelectionError::ReleaseNotFound {
            version: version_from_tag(current).to_owned(),
        })?;
    Ok(releases.get(position + 1))
}
