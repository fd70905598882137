//! Filesystem boundary used by the selection tree.

use std::io;
use std::path::Path;

use compact_str::CompactString;

/// Kind of a listed directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry returned by [`FileSystem::list_children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: CompactString,
    pub kind: EntryKind,
}

impl DirEntryInfo {
    /// Create a new entry.
    pub fn new(name: impl Into<CompactString>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Directory listing and size lookup.
///
/// Listings are one directory level deep.
pub trait FileSystem {
    /// List the immediate children of `path`, directories first, then by name.
    fn list_children(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// Size in bytes of the file at `path`.
    fn stat_size(&self, path: &Path) -> io::Result<u64>;

    /// Whether `path` is a file or a directory.
    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem {
    follow_symlinks: bool,
}

impl LocalFileSystem {
    /// Create a filesystem that does not follow symlinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat symlinks to directories as directories.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

impl FileSystem for LocalFileSystem {
    fn list_children(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let is_dir = if file_type.is_symlink() && self.follow_symlinks {
                // Dangling links fall back to being listed as files.
                std::fs::metadata(entry.path()).is_ok_and(|m| m.is_dir())
            } else {
                file_type.is_dir()
            };
            let kind = if is_dir {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirEntryInfo::new(
                entry.file_name().to_string_lossy().as_ref(),
                kind,
            ));
        }

        entries.sort_by(|a, b| {
            let a_dir = a.kind == EntryKind::Directory;
            let b_dir = b.kind == EntryKind::Directory;
            b_dir.cmp(&a_dir).then_with(|| a.name.cmp(&b.name))
        });
        Ok(entries)
    }

    fn stat_size(&self, path: &Path) -> io::Result<u64> {
        let metadata = if self.follow_symlinks {
            std::fs::metadata(path)?
        } else {
            std::fs::symlink_metadata(path)?
        };
        Ok(metadata.len())
    }

    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        if std::fs::metadata(path)?.is_dir() {
            Ok(EntryKind::Directory)
        } else {
            Ok(EntryKind::File)
        }
    }
}
