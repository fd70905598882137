//! Error types for size aggregation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that end a size computation.
///
/// Failures on individual entries are not errors; they are counted as
/// skipped instead.
#[derive(Debug, Error)]
pub enum SizeError {
    /// The configured root or a selected path is gone.
    #[error("Path not found: {path}")]
    RootMissing { path: PathBuf },

    /// Generic I/O error at the start of a walk.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking worker died before reporting.
    #[error("Size worker failed: {message}")]
    Worker { message: String },
}

impl SizeError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::RootMissing { path },
            _ => Self::Io { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_error_io() {
        let err = SizeError::io("/gone", std::io::Error::new(std::io::ErrorKind::NotFound, "x"));
        assert!(matches!(err, SizeError::RootMissing { .. }));
        assert_eq!(err.to_string(), "Path not found: /gone");

        let err = SizeError::io(
            "/locked",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, SizeError::Io { .. }));
    }
}
