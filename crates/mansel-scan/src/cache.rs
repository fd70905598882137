//! Sizes of fully walked directories.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Bytes and file count under one directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirSize {
    pub bytes: u64,
    pub files: u64,
}

impl DirSize {
    /// Size of a single file.
    pub fn file(bytes: u64) -> Self {
        Self { bytes, files: 1 }
    }

    fn add(&mut self, other: DirSize) {
        self.bytes += other.bytes;
        self.files += other.files;
    }
}

/// Directory totals keyed by root-relative path.
///
/// Only directories whose walk finished without cancellation or skipped
/// entries are recorded. Cloning is cheap; the map is shared until written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeCache {
    dirs: Arc<HashMap<PathBuf, DirSize>>,
}

impl SizeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached size of the directory at `path` (`"."` is the root).
    pub fn get(&self, path: impl AsRef<Path>) -> Option<DirSize> {
        self.dirs.get(&cache_key(path.as_ref())).copied()
    }

    /// Whether `path` has a cached size.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.dirs.contains_key(&cache_key(path.as_ref()))
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, size: DirSize) {
        Arc::make_mut(&mut self.dirs).insert(cache_key(path.as_ref()), size);
    }

    /// Copy every entry of `other` into this cache.
    pub fn merge(&mut self, other: &SizeCache) {
        if other.is_empty() {
            return;
        }
        let dirs = Arc::make_mut(&mut self.dirs);
        for (path, size) in other.dirs.iter() {
            dirs.insert(path.clone(), *size);
        }
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

/// Per-walk accumulator of directory totals.
#[derive(Debug, Default)]
pub(crate) struct DirSizeAccumulator {
    sizes: HashMap<PathBuf, DirSize>,
    incomplete: bool,
}

impl DirSizeAccumulator {
    /// Register a walked directory so it is recorded even when empty.
    pub fn enter(&mut self, dir: &Path) {
        self.sizes.entry(cache_key(dir)).or_default();
    }

    /// Add `size`, found at `path`, to every ancestor up to and including `top`.
    pub fn credit(&mut self, path: &Path, top: &Path, size: DirSize) {
        let top = cache_key(top);
        for ancestor in path.ancestors().skip(1) {
            self.sizes.entry(ancestor.to_path_buf()).or_default().add(size);
            if ancestor == top {
                break;
            }
        }
    }

    /// Something under the walked directory could not be read.
    pub fn mark_incomplete(&mut self) {
        self.incomplete = true;
    }

    /// Record every accumulated directory into `cache`, unless the walk
    /// was incomplete.
    pub fn commit(self, cache: &mut SizeCache) {
        if self.incomplete || self.sizes.is_empty() {
            return;
        }
        Arc::make_mut(&mut cache.dirs).extend(self.sizes);
    }
}

/// Selection paths name the root as `"."`; walked paths name it `""`.
fn cache_key(path: &Path) -> PathBuf {
    if path == Path::new(".") {
        PathBuf::new()
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_key_is_normalized() {
        let mut cache = SizeCache::new();
        cache.insert(".", DirSize::file(3));
        assert_eq!(cache.get(""), Some(DirSize::file(3)));
        assert!(cache.contains("."));
    }

    #[test]
    fn test_accumulator_credits_ancestors() {
        let mut acc = DirSizeAccumulator::default();
        acc.enter(Path::new("a"));
        acc.enter(Path::new("a/empty"));
        acc.credit(Path::new("a/n/x"), Path::new("a"), DirSize::file(10));
        acc.credit(Path::new("a/y"), Path::new("a"), DirSize::file(20));

        let mut cache = SizeCache::new();
        acc.commit(&mut cache);
        assert_eq!(cache.get("a"), Some(DirSize { bytes: 30, files: 2 }));
        assert_eq!(cache.get("a/n"), Some(DirSize::file(10)));
        assert_eq!(cache.get("a/empty"), Some(DirSize::default()));
        assert!(!cache.contains(""));
    }

    #[test]
    fn test_incomplete_walk_is_not_recorded() {
        let mut acc = DirSizeAccumulator::default();
        acc.enter(Path::new("a"));
        acc.credit(Path::new("a/x"), Path::new("a"), DirSize::file(10));
        acc.mark_incomplete();

        let mut cache = SizeCache::new();
        acc.commit(&mut cache);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_merge_leaves_source_untouched() {
        let mut first = SizeCache::new();
        first.insert("a", DirSize::file(1));
        let snapshot = first.clone();

        let mut other = SizeCache::new();
        other.insert("b", DirSize::file(2));
        first.merge(&other);

        assert_eq!(first.len(), 2);
        assert_eq!(snapshot.len(), 1);
    }
}
