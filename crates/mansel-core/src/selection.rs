//! Minimal selection sets.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The minimal set of root-relative paths covering the current selection.
///
/// A fully checked directory appears alone, never alongside its descendants.
/// A root selected before it was listed is written as `"."`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    paths: Vec<PathBuf>,
}

impl SelectionSet {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection from paths already in minimal tree order.
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Number of paths in the selection.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate over the root-relative paths.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Check if `path` is one of the selection roots.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.paths.iter().any(|p| p == path)
    }

    /// Paths as `/`-separated strings, the form printed on confirmation.
    pub fn to_strings(&self) -> Vec<String> {
        self.paths.iter().map(|p| display_relative(p)).collect()
    }

    /// Consume the set, returning its paths.
    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}

impl<'a> IntoIterator for &'a SelectionSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// Render a root-relative path with `/` separators regardless of platform.
fn display_relative(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_strings() {
        let set = SelectionSet::from_paths(vec![
            PathBuf::from("."),
            PathBuf::from("a").join("b"),
            PathBuf::from("c.txt"),
        ]);
        assert_eq!(set.to_strings(), vec![".", "a/b", "c.txt"]);
    }

    #[test]
    fn test_contains() {
        let set = SelectionSet::from_paths(vec![PathBuf::from("a")]);
        assert!(set.contains("a"));
        assert!(!set.contains("a/x"));
        assert_eq!(set.len(), 1);
        assert!(!SelectionSet::new().contains("a"));
    }
}
