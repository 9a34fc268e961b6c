//! Error taxonomy for the estimator.
//!
//! Everything except [`LdaError::InternalInvariant`] is raised while loading
//! or validating inputs, before any count table is touched.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for `lentil`.
pub type Result<T> = std::result::Result<T, LdaError>;

/// Errors returned by the estimator and its loaders.
#[derive(Debug, Error)]
pub enum LdaError {
    /// Invalid hyperparameter or option value.
    #[error("config error: {0}")]
    Config(String),

    /// Missing file, malformed line, out-of-range id, or dimension mismatch.
    #[error("data error: {0}")]
    Data(String),

    /// Ambiguous or unknown cluster membership.
    #[error("constraint error: {0}")]
    Constraint(String),

    /// Count tables or sampler state became inconsistent (a bug).
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// File could not be opened, read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl LdaError {
    /// `DataError` pointing at a file and 1-based line number.
    pub fn data_at(file: &str, line: usize, msg: impl std::fmt::Display) -> Self {
        LdaError::Data(format!("{}:{}: {}", file, line, msg))
    }

    /// `ConstraintError` pointing at a file and 1-based line number.
    pub fn constraint_at(file: &str, line: usize, msg: impl std::fmt::Display) -> Self {
        LdaError::Constraint(format!("{}:{}: {}", file, line, msg))
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LdaError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, LdaError::Config(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self, LdaError::Data(_) | LdaError::Io { .. })
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, LdaError::Constraint(_))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, LdaError::InternalInvariant(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_location() {
        let e = LdaError::data_at("docs.bow", 3, "unknown word `zzz`");
        assert!(e.is_data());
        assert_eq!(e.to_string(), "data error: docs.bow:3: unknown word `zzz`");

        let e = LdaError::constraint_at("clusters.txt", 1, "word `q` is not in the vocabulary");
        assert!(e.is_constraint());
        assert!(e.to_string().contains("clusters.txt:1"));
    }

    #[test]
    fn test_io_is_data_error() {
        let e = LdaError::io(
            "missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(e.is_data());
        assert!(!e.is_internal());
        assert!(e.to_string().contains("missing.txt"));
    }
}
