//! Error types for selection tree operations.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::NodeId;

/// Errors that can occur while building or mutating the selection tree.
#[derive(Debug, Error)]
pub enum SelectError {
    /// A directory could not be enumerated during expansion.
    #[error("Cannot list directory {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured root path does not exist.
    #[error("Root path not found: {path}")]
    RootMissing { path: PathBuf },

    /// A path that must be a directory is not one.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A node id that does not belong to this tree.
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl SelectError {
    /// Map an I/O error raised while opening the root.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::RootMissing { path },
            _ => Self::Listing { path, source },
        }
    }

    /// Whether this error came from a failed directory listing.
    pub fn is_listing(&self) -> bool {
        matches!(self, Self::Listing { .. })
    }
}

/// Why a pre-selected path was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreselectIssue {
    /// No entry with this name exists under the root.
    NotFound,
    /// A component before the last one names a file.
    ThroughFile,
    /// The path is absolute or escapes the root.
    Invalid,
    /// An ancestor directory could not be listed.
    Unlistable,
    /// The path repeats, contains, or lies under an earlier entry.
    Conflict,
}

impl fmt::Display for PreselectIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::ThroughFile => write!(f, "parent is a file"),
            Self::Invalid => write!(f, "not a root-relative path"),
            Self::Unlistable => write!(f, "parent directory cannot be listed"),
            Self::Conflict => write!(f, "conflicts with an earlier path"),
        }
    }
}

/// Non-fatal warning for a pre-selection entry that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreselectWarning {
    /// The path as it was supplied.
    pub path: String,
    /// Why it was ignored.
    pub issue: PreselectIssue,
}

impl PreselectWarning {
    /// Create a new pre-selection warning.
    pub fn new(path: impl Into<String>, issue: PreselectIssue) -> Self {
        Self {
            path: path.into(),
            issue,
        }
    }
}

impl fmt::Display for PreselectWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ignoring pre-selected path {}: {}", self.path, self.issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_error_io() {
        let err = SelectError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, SelectError::RootMissing { .. }));

        let err = SelectError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_listing());
    }

    #[test]
    fn test_preselect_warning_display() {
        let warning = PreselectWarning::new("missing/file", PreselectIssue::NotFound);
        assert_eq!(
            warning.to_string(),
            "Ignoring pre-selected path missing/file: not found"
        );
    }
}
