//! Obsolete-file detection from two release archives.
//!
//! There is no record of what was actually placed on disk, so obsolescence
//! is inferred purely from archive listings: anything the previous release
//! shipped that the current release no longer ships. A file a user created
//! under the same path will be treated as a deletion candidate too.

use std::collections::{BTreeMap, HashSet};

use crate::artefact::entries::ArchiveEntryPath;

/// Paths shipped by the previous release but not by the current one.
///
/// Ordered by lowercased path. Computed fresh on every run; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObsoleteFileSet {
    entries: Vec<ArchiveEntryPath>,
}

impl ObsoleteFileSet {
    /// Number of obsolete paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true when nothing is obsolete.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the obsolete paths in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ArchiveEntryPath> {
        self.entries.iter()
    }

    /// Case-insensitive membership test.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        ArchiveEntryPath::new(path).is_some_and(|candidate| {
            let key = candidate.key();
            self.entries.iter().any(|entry| entry.key() == key)
        })
    }
}

impl<'a> IntoIterator for &'a ObsoleteFileSet {
    type Item = &'a ArchiveEntryPath;
    type IntoIter = std::slice::Iter<'a, ArchiveEntryPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Compute `previous − current`, comparing paths case-insensitively.
///
/// Duplicate previous entries that differ only in case collapse to the first
/// one seen.
///
/// # Examples
///
/// ```
/// use loader_installer::artefact::entries::ArchiveEntryPath;
/// use loader_installer::diff::obsolete_entries;
///
/// let paths = |names: &[&str]| -> Vec<ArchiveEntryPath> {
///     names.iter().filter_map(|name| ArchiveEntryPath::new(name)).collect()
/// };
/// let previous = paths(&["A/x.dll", "A/y.dll", "B/z.cfg"]);
/// let current = paths(&["a/X.dll", "B/z.cfg"]);
///
/// let obsolete = obsolete_entries(&previous, &current);
/// assert_eq!(obsolete.len(), 1);
/// assert!(obsolete.contains("A/y.dll"));
/// ```
#[must_use]
pub fn obsolete_entries(
    previous: &[ArchiveEntryPath],
    current: &[ArchiveEntryPath],
) -> ObsoleteFileSet {
    let retained: HashSet<String> = current.iter().map(ArchiveEntryPath::key).collect();
    let mut obsolete = BTreeMap::new();
    for entry in previous {
        let key = entry.key();
        if !retained.contains(&key) {
            obsolete.entry(key).or_insert_with(|| entry.clone());
        }
    }
    ObsoleteFileSet {
        entries: obsolete.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn paths(names: &[&str]) -> Vec<ArchiveEntryPath> {
        names
            .iter()
            .filter_map(|name| ArchiveEntryPath::new(name))
            .collect()
    }

    fn names(set: &ObsoleteFileSet) -> Vec<&str> {
        set.iter().map(ArchiveEntryPath::as_str).collect()
    }

    #[test]
    fn upgrade_scenario_flags_dropped_file() {
        let previous = paths(&["A/x.dll", "A/y.dll", "B/z.cfg"]);
        let current = paths(&["A/x.dll", "B/z.cfg"]);
        assert_eq!(names(&obsolete_entries(&previous, &current)), vec!["A/y.dll"]);
    }

    #[rstest]
    #[case::identical(&["A/x.dll", "B/z.cfg"], &["A/x.dll", "B/z.cfg"], &[])]
    #[case::empty_previous(&[], &["A/x.dll"], &[])]
    #[case::empty_current(&["B/z.cfg", "A/x.dll"], &[], &["A/x.dll", "B/z.cfg"])]
    #[case::both_empty(&[], &[], &[])]
    #[case::case_insensitive(&["Loader/Core.dll"], &["loader/core.DLL"], &[])]
    #[case::separator_insensitive(&[r"Loader\core.dll"], &["Loader/core.dll"], &[])]
    #[case::directories_ignored(&["Loader/", "Loader/old.dll"], &[], &["Loader/old.dll"])]
    #[case::case_duplicates_collapse(&["A/Y.dll", "a/y.dll"], &[], &["A/Y.dll"])]
    fn set_difference(
        #[case] previous: &[&str],
        #[case] current: &[&str],
        #[case] expected: &[&str],
    ) {
        let obsolete = obsolete_entries(&paths(previous), &paths(current));
        assert_eq!(names(&obsolete), expected);
    }

    #[test]
    fn result_is_sorted_case_insensitively() {
        let previous = paths(&["b.dll", "C.dll", "a.dll"]);
        assert_eq!(
            names(&obsolete_entries(&previous, &[])),
            vec!["a.dll", "b.dll", "C.dll"]
        );
    }

    #[test]
    fn contains_ignores_case_and_separators() {
        let obsolete = obsolete_entries(&paths(&["Loader/Old.dll"]), &[]);
        assert!(obsolete.contains(r"loader\old.DLL"));
        assert!(!obsolete.contains("Loader/New.dll"));
        assert!(!obsolete.contains("Loader/"));
    }
}
